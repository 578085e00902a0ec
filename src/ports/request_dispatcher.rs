//! RequestDispatcher port - hands authenticated requests to the application.
//!
//! The request handlers behind this port (schema builder, data access, ...)
//! are not part of this crate. The transaction layer only decodes frames,
//! enforces authentication, and calls `dispatch` for each request in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Identity};

/// One request of an inbound transaction frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ClientRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            payload,
        }
    }
}

#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Execute one request on behalf of an authenticated identity.
    ///
    /// Returns the response payload. Unknown resource/action pairs should
    /// yield `ErrorCode::UnknownResource`.
    async fn dispatch(
        &self,
        identity: &Identity,
        request: &ClientRequest,
    ) -> Result<serde_json::Value, DomainError>;
}
