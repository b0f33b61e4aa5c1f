// Connection bootstrap and per-connection read/write loop (§4.1, §4.4).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span};

use crate::domain::client::ClientRecord;
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, Frame, OutboundEvent, RawRequest};
use crate::interface_adapters::protocol::{closes_connection, encode};
use crate::interface_adapters::state::AppState;
use crate::use_cases::ulid_check::is_valid_ulid;
use crate::use_cases::{error_reply, teardown};

#[derive(Debug, serde::Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    ugi: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let connection_host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    ws.on_upgrade(move |socket| handle_socket(socket, state, query.ugi, connection_host))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, ugi: String, connection_host: String) {
    let handle = state.next_handle();
    let span = info_span!("conn", handle, ugi = %ugi);
    let _enter = span.enter();

    if !is_valid_ulid(&ugi) {
        send_violation_and_close(&mut socket, "ugi must be a ULID").await;
        return;
    }

    let Some(resolved) = state.ugi_resolver.resolve(&ugi).await else {
        send_violation_and_close(&mut socket, "unknown ugi").await;
        return;
    };

    let record = ClientRecord::new(
        handle,
        ugi.clone(),
        resolved.game_name,
        resolved.developer_name,
        connection_host,
    );
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    state.engine.registry.add(record, outbox_tx).await;
    info!("client connected");

    run_client_loop(&mut socket, &state, handle, outbox_rx).await;

    let deliveries = teardown::handle_disconnect(&state.engine, handle).await;
    state.engine.registry.deliver_all(deliveries).await;
    let _ = socket.close().await;
    info!("client disconnected");
}

/// Writes a single unsolicited `VIOLATION` frame and closes — used for
/// admission failures that occur before a Client is even registered (§6).
async fn send_violation_and_close(socket: &mut WebSocket, message: &str) {
    let frame = Frame::unsolicited(OutboundEvent::Error(OpcodeError::Violation(message.to_string())));
    let _ = socket.send(Message::Text(encode(frame).into())).await;
    let _ = socket.close().await;
}

/// Writes one outbound frame. Returns `false` if the write failed or the
/// frame's error closes the connection (§4.4: "Unsolicited VIOLATION closes
/// the socket after its frame is flushed").
async fn send_frame(socket: &mut WebSocket, frame: Frame) -> bool {
    let should_close = closes_connection(&frame);
    let text = encode(frame);
    if let Err(e) = socket.send(Message::Text(text.into())).await {
        debug!(error = ?e, "failed to write outbound frame");
        return false;
    }
    !should_close
}

async fn run_client_loop(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    handle: crate::domain::client::ClientHandle,
    mut outbox_rx: mpsc::UnboundedReceiver<Frame>,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    None => break,
                    Some(Err(e)) => {
                        debug!(error = ?e, "socket read error");
                        break;
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<RawRequest>(&text) {
                            Ok(request) => {
                                let deliveries = state.engine.handle_frame(handle, request).await;
                                state.engine.registry.deliver_all(deliveries).await;
                            }
                            Err(_) => {
                                let delivery: Delivery = error_reply(
                                    handle,
                                    OpcodeError::Violation("malformed frame".into()),
                                    None,
                                );
                                state.engine.registry.deliver(delivery).await;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let delivery = error_reply(
                            handle,
                            OpcodeError::Violation("binary frames are not supported".into()),
                            None,
                        );
                        state.engine.registry.deliver(delivery).await;
                    }
                }
            }
            frame = outbox_rx.recv() => {
                match frame {
                    None => break,
                    Some(frame) => {
                        if !send_frame(socket, frame).await {
                            break;
                        }
                    }
                }
            }
        }
    }
}
