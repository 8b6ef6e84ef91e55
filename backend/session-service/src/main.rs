/// Local admin bootstrap
///
/// Builds the session core from the environment and prints an admin token
/// pair as JSON on stdout. Requires `LOCAL_MODE=true`.
use anyhow::{Context, Result};
use session_service::config::Settings;
use session_service::SessionContext;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the token pair
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "session_service=info,info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Starting session service bootstrap");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!(
        revocation_backend = %settings.revocation.backend,
        local_mode = settings.bootstrap.local_mode,
        "Configuration loaded successfully"
    );

    let context = SessionContext::from_settings(&settings)
        .await
        .context("Failed to initialize session core")?;

    let pair = context
        .login
        .bootstrap_admin()
        .await
        .context("Failed to issue admin bootstrap session")?;

    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}
