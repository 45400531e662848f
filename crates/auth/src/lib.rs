//! `devcamper-auth`: authentication and authorization primitives.
//!
//! This crate is decoupled from HTTP and storage: it knows how to issue and
//! validate session tokens, hash passwords, mint reset tokens and decide
//! whether a principal may touch a resource.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod reset;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize_owner, authorize_roles};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use jwt::{Hs256Jwt, JwtValidator};
pub use password::{MIN_PASSWORD_LEN, hash_password, verify_password};
pub use principal::Principal;
pub use reset::{RESET_TOKEN_TTL_MINUTES, ResetToken, digest_token};
pub use roles::Role;
pub use user::UserAccount;
