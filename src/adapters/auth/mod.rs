//! Authentication adapters.
//!
//! Implementations of the `Authenticator` port:
//!
//! - `jwt` - HS256 access tokens signed with the instance secret
//! - `mock` - Test implementation that doesn't require a token backend

mod jwt;
mod mock;

pub use jwt::{AccessClaims, JwtAuthenticator};
pub use mock::MockAuthenticator;
