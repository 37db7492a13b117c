//! Websocket hub transport with automatic reconnect.
//!
//! Connection lifecycle:
//! 1. Connect and exchange the handshake
//! 2. Forward invocations to the notification channel, ping periodically
//! 3. On connection loss, retry after each configured delay in turn
//! 4. Give up (closing the channel) once the delays are exhausted
//!
//! Notifications missed while disconnected are not replayed.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::protocol::{encode, parse_handshake, ping, split_messages, HandshakeRequest, HubMessage};
use super::{EventTransport, Notification};
use crate::error::TransportError;

type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Delays before each reconnect attempt.
pub const DEFAULT_RECONNECT_DELAYS: [Duration; 4] = [
    Duration::from_secs(0),
    Duration::from_secs(2),
    Duration::from_secs(10),
    Duration::from_secs(30),
];

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(30);

/// How a connected session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Socket dropped or went silent
    Lost,
    /// Server sent a close message
    Closed { allow_reconnect: bool },
    /// Nobody is listening any more
    ReceiverGone,
}

/// Transport for a hub reachable over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct HubTransport {
    url: String,
    reconnect_delays: Vec<Duration>,
    keep_alive: Duration,
    server_timeout: Duration,
    buffer: usize,
}

impl HubTransport {
    /// Create a transport with the default reconnect schedule.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delays: DEFAULT_RECONNECT_DELAYS.to_vec(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            buffer: 256,
        }
    }

    /// Replace the reconnect schedule. An empty schedule disables reconnect.
    pub fn with_reconnect_delays(mut self, delays: Vec<Duration>) -> Self {
        self.reconnect_delays = delays;
        self
    }

    /// Set the ping interval and how long the server may stay silent.
    pub fn with_keep_alive(mut self, interval: Duration, server_timeout: Duration) -> Self {
        self.keep_alive = interval;
        self.server_timeout = server_timeout;
        self
    }

    async fn supervise(
        self,
        first: (HubStream, Vec<String>),
        tx: mpsc::Sender<Notification>,
    ) {
        let mut next = Some(first);

        loop {
            let (ws, pending) = match next.take() {
                Some(session) => session,
                None => match self.reconnect(&tx).await {
                    Some(session) => session,
                    None => {
                        tracing::error!(url = %self.url, "Hub reconnect attempts exhausted");
                        return;
                    }
                },
            };

            match self.run_session(ws, pending, &tx).await {
                SessionEnd::ReceiverGone => {
                    tracing::debug!("Notification receiver dropped, closing hub connection");
                    return;
                }
                SessionEnd::Closed {
                    allow_reconnect: false,
                } => {
                    tracing::info!("Hub closed the connection");
                    return;
                }
                end => {
                    tracing::warn!(?end, "Hub connection lost, reconnecting");
                }
            }
        }
    }

    async fn reconnect(
        &self,
        tx: &mpsc::Sender<Notification>,
    ) -> Option<(HubStream, Vec<String>)> {
        for (attempt, delay) in self.reconnect_delays.iter().enumerate() {
            tokio::time::sleep(*delay).await;
            if tx.is_closed() {
                return None;
            }

            match connect(&self.url).await {
                Ok(session) => {
                    tracing::info!(attempt = attempt + 1, "Reconnected to hub");
                    return Some(session);
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Hub reconnect failed");
                }
            }
        }
        None
    }

    async fn run_session(
        &self,
        ws: HubStream,
        pending: Vec<String>,
        tx: &mpsc::Sender<Notification>,
    ) -> SessionEnd {
        for message in &pending {
            if let Some(end) = dispatch(message, tx).await {
                return end;
            }
        }

        let (mut sink, mut stream) = ws.split();
        let mut keep_alive = tokio::time::interval(self.keep_alive);
        keep_alive.tick().await;
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        for message in split_messages(&text) {
                            if let Some(end) = dispatch(message, tx).await {
                                return end;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                    Some(Ok(_)) => {
                        last_seen = Instant::now();
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Hub read error");
                        return SessionEnd::Lost;
                    }
                },
                _ = keep_alive.tick() => {
                    if last_seen.elapsed() > self.server_timeout {
                        tracing::warn!(
                            timeout_secs = self.server_timeout.as_secs(),
                            "Hub silent for too long"
                        );
                        return SessionEnd::Lost;
                    }
                    if let Err(e) = sink.send(Message::Text(ping().into())).await {
                        tracing::warn!(error = %e, "Hub ping failed");
                        return SessionEnd::Lost;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl EventTransport for HubTransport {
    async fn start(&self) -> Result<mpsc::Receiver<Notification>, TransportError> {
        let first = connect(&self.url).await?;
        tracing::info!(url = %self.url, "Connected to hub");

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(self.clone().supervise(first, tx));
        Ok(rx)
    }
}

/// Open the socket and complete the handshake.
///
/// Returns the stream plus any messages that arrived in the same frame as
/// the handshake reply.
async fn connect(url: &str) -> Result<(HubStream, Vec<String>), TransportError> {
    let (mut ws, _response) = connect_async(url).await?;
    ws.send(Message::Text(encode(&HandshakeRequest::default())?.into()))
        .await?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let mut messages = split_messages(&text);
                let reply = messages
                    .next()
                    .ok_or_else(|| TransportError::Handshake("empty handshake reply".into()))?;
                parse_handshake(reply)?;
                let pending = messages.map(str::to_string).collect();
                return Ok((ws, pending));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Handshake(
                    "connection closed during handshake".into(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Handle one hub message. Returns `Some` when the session should end.
async fn dispatch(message: &str, tx: &mpsc::Sender<Notification>) -> Option<SessionEnd> {
    match HubMessage::parse(message) {
        Ok(HubMessage::Invocation { target, arguments }) => {
            let notification = Notification { target, arguments };
            if tx.send(notification).await.is_err() {
                return Some(SessionEnd::ReceiverGone);
            }
            None
        }
        Ok(HubMessage::Ping) | Ok(HubMessage::Other(_)) => None,
        Ok(HubMessage::Close {
            error,
            allow_reconnect,
        }) => {
            if let Some(error) = error {
                tracing::warn!(%error, allow_reconnect, "Hub sent close with error");
            }
            Some(SessionEnd::Closed { allow_reconnect })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable hub message");
            None
        }
    }
}
