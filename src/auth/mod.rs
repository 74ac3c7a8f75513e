//! Credential issuing and verification.
//!
//! - `TokenService`: HS256 bearer tokens bound to a user id
//! - `CredentialHasher`: argon2id password verifier

mod claims;
mod jwt;
mod password;

pub use claims::Claims;
pub use jwt::TokenService;
pub use password::CredentialHasher;
