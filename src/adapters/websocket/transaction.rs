//! Per-connection transaction handling.
//!
//! A [`Session`] owns the connection's hub handle and decides what each
//! inbound text frame means. The first frame must authenticate and is
//! processed inline, so no later frame can run before the identity is set.
//! Every later frame runs on its own task and is dropped when the client's
//! cancel signal fires.

use std::sync::Arc;

use serde_json::json;

use crate::application::hub::wait_cancelled;
use crate::application::{AppContext, ClientHandle};
use crate::domain::foundation::{DomainError, ErrorCode, Identity};
use crate::ports::{RateLimitKey, RateLimitResult};

use super::messages::{auth_error, AuthRequest, ProtocolError, RequestFrame, ResponseFrame};

/// What the read loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Close,
}

pub struct Session {
    ctx: Arc<AppContext>,
    client: ClientHandle,
}

impl Session {
    pub fn new(ctx: Arc<AppContext>, client: ClientHandle) -> Self {
        Self { ctx, client }
    }

    /// Current hub handle; carries the identity once authenticated.
    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub async fn handle_text(&mut self, text: &str) -> FrameOutcome {
        match self.client.identity {
            None => self.handle_first_frame(text).await,
            Some(identity) => self.handle_frame(identity, text).await,
        }
    }

    /// Report a frame type the protocol has no use for.
    pub async fn reject(&self, err: ProtocolError) -> FrameOutcome {
        tracing::debug!(client_id = %self.client.id, error = %err, "Protocol violation");
        self.respond(ResponseFrame::error(0, &err.into())).await;
        if self.client.is_authenticated() {
            FrameOutcome::Continue
        } else {
            FrameOutcome::Close
        }
    }

    async fn handle_first_frame(&mut self, text: &str) -> FrameOutcome {
        let frame = match RequestFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => return self.reject(e).await,
        };
        let auth = match frame.auth_request() {
            Ok(auth) => auth,
            Err(e) => {
                tracing::debug!(client_id = %self.client.id, error = %e, "Invalid first frame");
                self.respond(ResponseFrame::error(frame.transaction_nr, &e.into())).await;
                return FrameOutcome::Close;
            }
        };

        match self.authenticate(auth).await {
            Ok(identity) => {
                let authenticated = self.client.authenticated(identity);
                self.ctx.hub.register(authenticated.clone()).await;
                self.client = authenticated;

                tracing::info!(
                    client_id = %self.client.id,
                    login_id = %identity.login_id,
                    admin = identity.admin,
                    device = %self.client.device.as_str(),
                    "Client authenticated"
                );

                let payload = json!({
                    "loginId": identity.login_id.value(),
                    "admin": identity.admin,
                    "noAuth": identity.no_auth,
                });
                self.respond(ResponseFrame::ok(frame.transaction_nr, vec![payload])).await;
                FrameOutcome::Continue
            }
            Err(e) => {
                tracing::info!(
                    client_id = %self.client.id,
                    address = %self.client.address,
                    error = %e,
                    "Authentication rejected"
                );
                self.respond(ResponseFrame::error(frame.transaction_nr, &e)).await;
                FrameOutcome::Close
            }
        }
    }

    async fn authenticate(&self, auth: AuthRequest) -> Result<Identity, DomainError> {
        let key = RateLimitKey::host(&self.client.address);

        if let RateLimitResult::Denied { retry_after_secs } = self.ctx.rate_limiter.check(&key).await {
            self.ctx.rate_limiter.bad_attempt(&key).await;
            return Err(DomainError::new(
                ErrorCode::RateLimited,
                format!("Too many login attempts, retry in {} seconds", retry_after_secs),
            ));
        }

        let result = match auth {
            AuthRequest::Token(t) => self.ctx.authenticator.verify_token(&t.token).await,
            AuthRequest::Credentials(c) => {
                self.ctx
                    .authenticator
                    .verify_credentials(&c.username, &c.password)
                    .await
            }
        };

        let identity = match result {
            Ok(identity) => identity,
            Err(e) => {
                if e.is_bad_attempt() {
                    self.ctx.rate_limiter.bad_attempt(&key).await;
                }
                return Err(auth_error(&e));
            }
        };

        if self.ctx.state.in_maintenance() && !identity.admin {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Instance is in maintenance mode",
            ));
        }
        Ok(identity)
    }

    async fn handle_frame(&self, identity: Identity, text: &str) -> FrameOutcome {
        let frame = match RequestFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => return self.reject(e).await,
        };
        if frame.has_auth_request() {
            self.respond(ResponseFrame::error(
                frame.transaction_nr,
                &ProtocolError::AlreadyAuthenticated.into(),
            ))
            .await;
            return FrameOutcome::Continue;
        }

        let ctx = Arc::clone(&self.ctx);
        let client = self.client.clone();
        tokio::spawn(async move {
            let transaction_nr = frame.transaction_nr;
            tokio::select! {
                biased;
                _ = wait_cancelled(client.cancelled()) => {
                    tracing::debug!(client_id = %client.id, transaction_nr, "Transaction cancelled");
                }
                response = execute(&ctx, &identity, &frame) => {
                    if !client.respond(response.to_text()).await {
                        tracing::debug!(client_id = %client.id, transaction_nr, "Client gone before response");
                    }
                }
            }
        });
        FrameOutcome::Continue
    }

    async fn respond(&self, frame: ResponseFrame) {
        if !self.client.respond(frame.to_text()).await {
            tracing::debug!(client_id = %self.client.id, "Response dropped, writer closed");
        }
    }
}

/// Runs the requests of one frame in order; the first error aborts the frame.
pub async fn execute(ctx: &AppContext, identity: &Identity, frame: &RequestFrame) -> ResponseFrame {
    let mut payloads = Vec::with_capacity(frame.requests.len());

    for request in &frame.requests {
        match ctx.dispatcher.dispatch(identity, request).await {
            Ok(payload) => payloads.push(payload),
            Err(e) => {
                tracing::debug!(
                    login_id = %identity.login_id,
                    transaction_nr = frame.transaction_nr,
                    resource = %request.resource,
                    action = %request.action,
                    error = %e,
                    "Request failed"
                );
                return ResponseFrame::error(frame.transaction_nr, &e);
            }
        }
    }

    ResponseFrame::ok(frame.transaction_nr, payloads)
}
