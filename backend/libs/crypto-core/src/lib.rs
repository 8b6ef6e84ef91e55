//! Cryptographic primitives shared by the session core.
//!
//! - `jwt`: kind-agnostic JWT codec (HMAC or RSA, exclusive expiry)
pub mod jwt;

pub use jsonwebtoken::Algorithm;
pub use jwt::{parse_algorithm, CodecError, Expiring, JwtCodec};
