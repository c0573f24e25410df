//! JWT authentication for the task list service.
//!
//! Tokens carry the numeric user id in `sub`. The storage layer never sees a
//! token; it only receives the id extracted here.

mod error;
mod jwt;

pub use error::*;
pub use jwt::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "tasklist";
