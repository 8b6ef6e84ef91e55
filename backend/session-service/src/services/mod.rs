/// Session flows built on the security primitives
pub mod gate;
pub mod identity_exchange;
pub mod issuer;
pub mod login;
pub mod refresh;

pub use gate::VerificationGate;
pub use identity_exchange::{HttpIdentityProvider, IdentityProvider, ProviderProfile};
pub use issuer::{IssuedSession, SessionIssuer};
pub use login::LoginService;
pub use refresh::RefreshFlow;
