//! Authentication and authorization
//!
//! - [`JwtService`] - token issuing and validation
//! - [`CurrentUser`] - caller identity taken from the token
//! - [`require_auth`] / [`require_admin`] - middleware
//! - [`password`] - argon2 hashing
//! - [`viewer`] - per-request [`Viewer`](crate::tickets::Viewer) resolution

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod viewer;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{CurrentUserExt, require_admin, require_auth};
