/// Security module for session authentication and authorization
///
/// - **role_resolver**: identity-provider groups to internal role
/// - **tokens**: minting of access, refresh and signup tokens
/// - **guards**: role-based authorization on verified identities
pub mod guards;
pub mod role_resolver;
pub mod tokens;

pub use guards::{require_role, RoleGuard};
pub use role_resolver::RoleResolver;
pub use tokens::{MintedToken, TokenLifetimes, TokenMinter};

/// Strip the `Bearer ` scheme from an `Authorization` header value
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let token = header_value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| header_value.trim().strip_prefix("bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
