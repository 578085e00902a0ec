//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, and error types that form the
//! vocabulary of the cluster domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, Identity};
pub use errors::{DomainError, ErrorCode};
pub use ids::{ClientId, LoginId, ModuleId, NodeId};
pub use timestamp::Timestamp;
