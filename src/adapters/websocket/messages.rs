//! WebSocket frame types.
//!
//! Client → Server:
//! `{"transactionNr": 3, "requests": [{"resource": "...", "action": "...", "payload": {...}}]}`
//!
//! Server → Client (response):
//! `{"transactionNr": 3, "responses": [{"payload": ...}], "error": null}`
//!
//! Server → Client (push, never answers a request):
//! `{"transactionNr": 0, "responses": [{"resource": "event", "result": "renew", "payload": {...}}], "error": null}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::cluster::ClusterEvent;
use crate::domain::foundation::{AuthError, DomainError, ErrorCode};
use crate::ports::ClientRequest;

/// Resource name reserved for the authentication request.
pub const AUTH_RESOURCE: &str = "auth";

/// Resource name used for unsolicited pushes.
pub const EVENT_RESOURCE: &str = "event";

/// Violations of the frame protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Binary frames are not supported")]
    BinaryFrame,

    #[error("Connection must authenticate first")]
    AuthRequired,

    #[error("Connection is already authenticated")]
    AlreadyAuthenticated,

    #[error("Authentication frame must contain exactly one request, got {0}")]
    AuthRequestCount(usize),

    #[error("Unknown authentication method: {0}")]
    UnknownAuthMethod(String),

    #[error("Invalid authentication payload: {0}")]
    InvalidAuthPayload(String),
}

impl From<ProtocolError> for DomainError {
    fn from(err: ProtocolError) -> Self {
        DomainError::new(ErrorCode::ProtocolViolation, err.to_string())
    }
}

/// Maps a failed login to the error reported to the client.
pub fn auth_error(err: &AuthError) -> DomainError {
    let code = match err {
        AuthError::ServiceUnavailable(_) => ErrorCode::InternalError,
        _ => ErrorCode::Unauthorized,
    };
    DomainError::new(code, err.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
    pub transaction_nr: i64,
    #[serde(default)]
    pub requests: Vec<ClientRequest>,
}

impl RequestFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// True if any request in the frame targets the auth resource.
    pub fn has_auth_request(&self) -> bool {
        self.requests.iter().any(|r| r.resource == AUTH_RESOURCE)
    }

    /// Extracts the login attempt from the first frame of a connection.
    pub fn auth_request(&self) -> Result<AuthRequest, ProtocolError> {
        let request = match self.requests.as_slice() {
            [request] => request,
            requests => return Err(ProtocolError::AuthRequestCount(requests.len())),
        };
        if request.resource != AUTH_RESOURCE {
            return Err(ProtocolError::AuthRequired);
        }

        let invalid = |e: serde_json::Error| ProtocolError::InvalidAuthPayload(e.to_string());
        match request.action.as_str() {
            "token" => Ok(AuthRequest::Token(
                serde_json::from_value(request.payload.clone()).map_err(invalid)?,
            )),
            "user" => Ok(AuthRequest::Credentials(
                serde_json::from_value(request.payload.clone()).map_err(invalid)?,
            )),
            other => Err(ProtocolError::UnknownAuthMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthRequest {
    Token(TokenAuth),
    Credentials(CredentialAuth),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenAuth {
    pub token: String,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct CredentialAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    pub transaction_nr: i64,
    pub responses: Vec<ResponseItem>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseFrame {
    /// Successful transaction, one payload per request.
    pub fn ok(transaction_nr: i64, payloads: Vec<Value>) -> Self {
        Self {
            transaction_nr,
            responses: payloads
                .into_iter()
                .map(|payload| ResponseItem {
                    resource: None,
                    result: None,
                    payload,
                })
                .collect(),
            error: None,
        }
    }

    pub fn error(transaction_nr: i64, err: &DomainError) -> Self {
        Self {
            transaction_nr,
            responses: Vec::new(),
            error: Some(ErrorBody {
                code: err.code.to_string(),
                message: err.message.clone(),
            }),
        }
    }

    /// Unsolicited push of a cluster event.
    pub fn push(event: &ClusterEvent) -> Self {
        Self {
            transaction_nr: 0,
            responses: vec![ResponseItem {
                resource: Some(EVENT_RESOURCE.to_string()),
                result: Some(event.content.as_str().to_string()),
                payload: event.payload.clone(),
            }],
            error: None,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize response frame");
            format!(
                r#"{{"transactionNr":{},"responses":[],"error":{{"code":"INTERNAL_ERROR","message":"Response serialization failed"}}}}"#,
                self.transaction_nr
            )
        })
    }
}
