//! Event stream reader.
//!
//! Wraps the `/api/eventstream` websocket and yields decoded [`Event`]s.
//! Frames that do not decode are logged and skipped.

use fieldctl_core::Event;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::Error;

pub struct EventStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventStream {
    pub async fn connect(url: &Url) -> Result<Self, Error> {
        tracing::info!(url = %url, "connecting to event stream");
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        Ok(Self { ws })
    }

    /// Next event, or `Ok(None)` once the server ends the stream normally
    /// (including a going-away close at shutdown). Any other close code,
    /// such as the policy close sent to a subscriber that fell behind, is
    /// an [`Error::WebSocketClosed`].
    pub async fn next_event(&mut self) -> Result<Option<Event>, Error> {
        loop {
            let Some(frame) = self.ws.next().await else {
                return Ok(None);
            };
            match frame.map_err(|e| Error::WebSocketConnect(e.to_string()))? {
                Message::Text(text) => match serde_json::from_str::<Event>(text.as_str()) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => tracing::debug!(error = %e, "skipping undecodable event"),
                },
                Message::Close(frame) => return close_outcome(frame),
                // tungstenite answers pings itself
                _ => {}
            }
        }
    }

    /// Send a normal close and wait for the server to acknowledge it.
    pub async fn close(mut self) -> Result<(), Error> {
        match self.ws.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(Error::WebSocketConnect(e.to_string())),
        }
    }
}

fn close_outcome(frame: Option<tungstenite::protocol::CloseFrame>) -> Result<Option<Event>, Error> {
    match frame {
        None => Ok(None),
        Some(f) if matches!(f.code, CloseCode::Normal | CloseCode::Away) => {
            tracing::info!(code = %f.code, reason = f.reason.as_str(), "event stream closed");
            Ok(None)
        }
        Some(f) => Err(Error::WebSocketClosed {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_owned(),
        }),
    }
}
