//! HTTP and WebSocket handlers

use crate::error::{DisconnectReason, RelayError, TransportError};
use crate::protocol::OnlineUser;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub username: String,
}

/// WebSocket handler
///
/// The identity is validated and registered before the upgrade, so a rejected
/// client gets a plain HTTP error instead of a socket.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, RelayError> {
    let registration = state.relay().admit(&params.username)?;

    let relay = state.relay().clone();
    let on_failure = {
        let relay = relay.clone();
        let connection = registration.connection.clone();
        move |error: axum::Error| {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %error,
                "WebSocket upgrade failed"
            );
            relay.disconnect(&connection, DisconnectReason::UpgradeFailed);
        }
    };

    Ok(ws
        .on_failed_upgrade(on_failure)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = split_socket(socket);
            relay.run_session(registration, sink, stream).await;
        })
        .into_response())
}

/// Presence query: everyone registered right now
pub async fn online_users(State(state): State<GatewayState>) -> Json<Vec<OnlineUser>> {
    Json(state.relay().online_users())
}

/// Adapt an axum WebSocket into text-frame halves
///
/// Ping/pong are handled by axum and skipped here; a close frame ends the stream;
/// binary frames are a transport error.
fn split_socket(
    socket: WebSocket,
) -> (
    impl Sink<String, Error = axum::Error> + Send + Unpin,
    impl Stream<Item = Result<String, TransportError>> + Send + Unpin,
) {
    let (ws_sink, ws_stream) = socket.split();

    let sink = ws_sink.with(|frame: String| future::ready(Ok::<_, axum::Error>(Message::Text(frame))));

    let stream = ws_stream
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(_)) => Some(Err(TransportError::UnsupportedFrame("binary"))),
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
                Err(e) => Some(Err(TransportError::socket(e))),
            })
        });

    (sink, stream)
}
