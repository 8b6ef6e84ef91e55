//! Shared JWT codec for the session core
//!
//! This module signs and verifies compact JWTs (`header.claims.signature`,
//! base64url segments). It is deliberately kind-agnostic: it knows nothing
//! about access, refresh or signup tokens. Callers decide which claim type to
//! decode into and enforce their own discriminating claims on top.
//!
//! ## Security Design
//!
//! - **One algorithm per codec**: the header `alg` must equal the configured
//!   algorithm, otherwise verification fails as `InvalidSignature`
//! - **Signature before claims**: a token signed with foreign key material is
//!   rejected as `InvalidSignature` whatever its claims say
//! - **Exclusive expiry**: a token is valid while `now < exp` and invalid from
//!   the `exp` second onwards, with zero leeway
//!
//! ## Usage
//!
//! ```rust
//! use crypto_core::jwt::{Expiring, JwtCodec};
//! use jsonwebtoken::Algorithm;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Claims {
//!     sub: String,
//!     exp: i64,
//! }
//!
//! impl Expiring for Claims {
//!     fn expires_at(&self) -> i64 {
//!         self.exp
//!     }
//! }
//!
//! let codec = JwtCodec::from_secret("a-long-development-secret", Algorithm::HS256).unwrap();
//! let token = codec.encode(&Claims { sub: "u1".into(), exp: 4_102_444_800 }).unwrap();
//! let claims: Claims = codec.decode(&token).unwrap();
//! assert_eq!(claims.sub, "u1");
//! ```
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failure modes of encoding or decoding a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input is not a structurally valid JWT for the expected claim type
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signature (or declared algorithm) does not match the configured key
    #[error("invalid token signature")]
    InvalidSignature,

    /// `exp` is at or before the verification instant
    #[error("token expired")]
    Expired,

    #[error("failed to encode token: {0}")]
    Encoding(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => CodecError::InvalidSignature,
            ErrorKind::ExpiredSignature => CodecError::Expired,
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidAlgorithmName => CodecError::InvalidKey(err.to_string()),
            _ => CodecError::MalformedToken(err.to_string()),
        }
    }
}

// ============================================================================
// Claims contract
// ============================================================================

/// Claim sets that carry an expiry instant (Unix seconds)
///
/// The codec uses this to apply its exclusive expiry bound itself instead of
/// relying on the underlying library's inclusive check.
pub trait Expiring {
    fn expires_at(&self) -> i64;
}

// ============================================================================
// Algorithm parsing
// ============================================================================

/// Parse a configured algorithm identifier (`HS256`, `RS256`, ...)
///
/// Only the HMAC and RSA families are accepted; these are the ones the
/// session core can be configured with.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, CodecError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        other => Err(CodecError::InvalidKey(format!(
            "unsupported signing algorithm: {other}"
        ))),
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn is_rsa(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512)
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and verifies tokens with one fixed key pair and algorithm
///
/// Construct once at startup and share; the codec holds no mutable state and
/// is safe to use from any number of tasks concurrently.
#[derive(Clone)]
pub struct JwtCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("JwtCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Build a codec for a shared-secret (HMAC) algorithm
    ///
    /// ## Errors
    ///
    /// - `InvalidKey` if the secret is empty or the algorithm is not HMAC
    pub fn from_secret(secret: &str, algorithm: Algorithm) -> Result<Self, CodecError> {
        if !is_hmac(algorithm) {
            return Err(CodecError::InvalidKey(format!(
                "{algorithm:?} requires an RSA key pair, not a shared secret"
            )));
        }
        if secret.is_empty() {
            return Err(CodecError::InvalidKey("signing secret is empty".to_string()));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Build a codec from PEM-encoded RSA keys
    ///
    /// ## Arguments
    ///
    /// * `private_key_pem` - RSA private key used for signing
    /// * `public_key_pem` - RSA public key used for verification
    pub fn from_rsa_pem(
        private_key_pem: &str,
        public_key_pem: &str,
        algorithm: Algorithm,
    ) -> Result<Self, CodecError> {
        if !is_rsa(algorithm) {
            return Err(CodecError::InvalidKey(format!(
                "{algorithm:?} is not an RSA algorithm"
            )));
        }

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("failed to parse RSA private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("failed to parse RSA public key: {e}")))?;

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign a claim set into a compact token string
    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String, CodecError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Verify and decode a token against the current wall clock
    pub fn decode<C>(&self, token: &str) -> Result<C, CodecError>
    where
        C: DeserializeOwned + Expiring,
    {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Verify and decode a token as of `now` (Unix seconds)
    ///
    /// ## Errors
    ///
    /// - `InvalidSignature` - signature or algorithm mismatch
    /// - `Expired` - `now >= exp`
    /// - `MalformedToken` - anything structurally wrong, including claims
    ///   that do not fit `C` or a missing `exp`
    pub fn decode_at<C>(&self, token: &str, now: i64) -> Result<C, CodecError>
    where
        C: DeserializeOwned + Expiring,
    {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is enforced below with an exclusive bound.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let data = decode::<C>(token, &self.decoding_key, &validation)?;

        if now >= data.claims.expires_at() {
            return Err(CodecError::Expired);
        }

        Ok(data.claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
