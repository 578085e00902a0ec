//! WebSocket upgrade handler and connection lifecycle.
//!
//! Each connection runs:
//! 1. A writer task draining the client's outbound queue into the socket
//! 2. The read loop below, which feeds text frames to the [`Session`]
//!
//! Whichever side fails first fires the client's cancel signal; the read
//! loop then unregisters the client from the hub and waits for the writer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::application::hub::wait_cancelled;
use crate::application::{AppContext, ClientHandle, Outbound};
use crate::domain::cluster::DeviceClass;

use super::messages::{ProtocolError, ResponseFrame};
use super::transaction::{FrameOutcome, Session};

/// Query parameters of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub device: DeviceClass,
}

/// Route: `GET /websocket?device=browser|fatClient`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<ConnectParams>,
    State(ctx): State<Arc<AppContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, params.device, ctx))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, device: DeviceClass, ctx: Arc<AppContext>) {
    let (client, outbound) = ClientHandle::new(addr.to_string(), device, ctx.cluster.outbound_queue_capacity);
    ctx.hub.register(client.clone()).await;

    tracing::debug!(client_id = %client.id, address = %client.address, device = %device.as_str(), "Client connected");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound, client.clone()));

    let mut session = Session::new(Arc::clone(&ctx), client.clone());

    loop {
        let outcome = tokio::select! {
            _ = wait_cancelled(client.cancelled()) => break,
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                Some(Ok(Message::Binary(_))) => session.reject(ProtocolError::BinaryFrame).await,
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => FrameOutcome::Continue,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(client_id = %client.id, error = %e, "Read failed");
                    break;
                }
            },
        };
        if outcome == FrameOutcome::Close {
            break;
        }
    }

    client.close();
    ctx.hub.unregister(client.id).await;
    if let Err(e) = writer.await {
        tracing::warn!(client_id = %client.id, error = %e, "Writer task failed");
    }

    tracing::debug!(
        client_id = %client.id,
        login_id = %session.client().login_id(),
        "Client disconnected"
    );
}

/// Drains the outbound queue into the socket.
///
/// Queued frames are flushed before a cancellation is honoured, so an error
/// response written just before `close()` still reaches the client.
async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut outbound: mpsc::Receiver<Outbound>, client: ClientHandle) {
    loop {
        let item = tokio::select! {
            biased;
            item = outbound.recv() => item,
            _ = wait_cancelled(client.cancelled()) => None,
        };

        let text = match item {
            Some(Outbound::Text(text)) => text,
            Some(Outbound::Event(event)) => ResponseFrame::push(&event).to_text(),
            Some(Outbound::Close) | None => break,
        };

        if let Err(e) = sink.send(Message::Text(text)).await {
            tracing::debug!(client_id = %client.id, error = %e, "Write failed, closing connection");
            client.close();
            return;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

/// Router serving the cluster WebSocket endpoint.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// handler can see the remote address.
pub fn websocket_router(ctx: Arc<AppContext>) -> Router {
    Router::new().route("/websocket", get(ws_handler)).with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::NodeId;

    #[test]
    fn connect_params_default_to_browser() {
        let params: ConnectParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.device, DeviceClass::Browser);
    }

    #[test]
    fn connect_params_accept_fat_client() {
        let params: ConnectParams = serde_json::from_str(r#"{"device":"fatClient"}"#).unwrap();
        assert_eq!(params.device, DeviceClass::FatClient);
    }

    #[tokio::test]
    async fn websocket_router_builds() {
        let ctx = AppContext::builder(NodeId::new()).build();
        let _router = websocket_router(ctx);
    }
}
