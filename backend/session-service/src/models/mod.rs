/// Data models for the session core
pub mod claims;
pub mod identity;
pub mod role;
pub mod session;
pub mod user;

pub use claims::{
    RenewalClaims, RenewalId, SessionBinding, SessionClaims, SignupClaims, TokenClaims, TokenKind,
};
pub use identity::AuthenticatedUser;
pub use role::Role;
pub use session::{LoginOutcome, SignupRequired, TokenPair};
pub use user::{NewUser, UserRecord};
