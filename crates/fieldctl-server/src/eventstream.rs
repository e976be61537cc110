// ── Websocket transport for the event hub ──

use std::borrow::Cow;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use fieldctl_core::Subscription;
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::state::AppState;

const SLOW_REASON: &str = "connection too slow to keep up with messages";

pub async fn event_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    // Register before the upgrade completes so nothing published in
    // between is missed.
    let subscription = state.events.subscribe();
    let timeout = state.write_timeout;
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| relay(socket, subscription, timeout, shutdown))
}

async fn relay(
    socket: WebSocket,
    mut subscription: Subscription,
    write_timeout: Duration,
    shutdown: CancellationToken,
) {
    let id = subscription.id();
    let evicted = subscription.eviction_token();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                close(&mut sink, close_code::AWAY, "server shutting down", write_timeout).await;
                break;
            }
            () = evicted.cancelled() => {
                close(&mut sink, close_code::POLICY, SLOW_REASON, write_timeout).await;
                break;
            }
            // Client frames are read only to notice closes; payloads are ignored.
            incoming = stream.next() => match incoming {
                None | Some(Err(_) | Ok(Message::Close(_))) => {
                    debug!(subscriber = id, "event subscriber disconnected");
                    break;
                }
                Some(Ok(_)) => {}
            },
            msg = subscription.recv() => {
                let Some(msg) = msg else { continue };
                match tokio::time::timeout(write_timeout, sink.send(Message::Text(msg.to_string()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(subscriber = id, error = %e, "event write failed");
                        break;
                    }
                    Err(_) => {
                        warn!(subscriber = id, "event write timed out, closing connection");
                        break;
                    }
                }
            }
        }
    }
}

/// Best-effort close frame; the connection is dropped either way.
async fn close<S>(sink: &mut S, code: u16, reason: &'static str, timeout: Duration)
where
    S: futures_util::Sink<Message> + Unpin,
{
    let frame = Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }));
    let _ = tokio::time::timeout(timeout, sink.send(frame)).await;
}
