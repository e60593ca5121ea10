//! Socket.io real-time channel over WebSocket.
//!
//! ```text
//!  backend ──socket.io──▶ connection task (one per session)
//!                            │  decodes `42["topic",payload]` → LiveEvent
//!                            ▼
//!                   broadcast channel ──▶ Subscription (one per view)
//! ```
//!
//! The connection is opened lazily by the first `subscribe()` and only when a
//! cached auth token exists. Reconnection is bounded; events missed during a
//! gap are not replayed (the live view's periodic poll covers that).

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use url::Url;

use super::events::LiveEvent;

const CHANNEL: &str = "realtime";

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed (0.0–1.0).
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            jitter: 0.5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect `attempt` (0-based). `roll` is a uniform sample
    /// in `[0, 1)` mapped linearly onto `±jitter` around the doubled delay;
    /// 0.5 means no jitter.
    pub fn delay_for(&self, attempt: u32, roll: f64) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let raw = base * 2f64.powi(attempt.min(16) as i32);
        let jittered = raw * (1.0 + self.jitter * (2.0 * roll - 1.0));
        let capped = jittered.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// A decoded socket.io frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake, carries the server's ping interval.
    Open { ping_interval_ms: Option<u64> },
    Ping,
    Pong,
    /// Namespace connect acknowledged.
    Connected,
    ConnectError(String),
    Disconnect,
    Event { topic: String, payload: Value },
    Other,
}

/// Decode an Engine.IO v4 / Socket.IO v5 text frame.
pub fn decode_packet(frame: &str) -> Packet {
    let mut chars = frame.chars();
    match chars.next() {
        Some('0') => {
            let ping_interval_ms = serde_json::from_str::<Value>(&frame[1..])
                .ok()
                .and_then(|v| v.get("pingInterval").and_then(Value::as_u64));
            Packet::Open { ping_interval_ms }
        }
        Some('1') => Packet::Disconnect,
        Some('2') => Packet::Ping,
        Some('3') => Packet::Pong,
        Some('4') => decode_message(&frame[1..]),
        _ => Packet::Other,
    }
}

fn decode_message(body: &str) -> Packet {
    let mut chars = body.chars();
    let kind = chars.next();
    // Optional "/namespace," then optional ack id digits.
    let mut rest = &body[kind.map(char::len_utf8).unwrap_or(0)..];
    if rest.starts_with('/') {
        rest = rest.split_once(',').map(|(_, r)| r).unwrap_or("");
    }
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        Some('0') => Packet::Connected,
        Some('1') => Packet::Disconnect,
        Some('2') => {
            let Ok(Value::Array(mut parts)) = serde_json::from_str::<Value>(rest) else {
                return Packet::Other;
            };
            if parts.is_empty() {
                return Packet::Other;
            }
            let topic = match parts.remove(0) {
                Value::String(t) => t,
                _ => return Packet::Other,
            };
            let payload = if parts.is_empty() {
                Value::Null
            } else {
                parts.remove(0)
            };
            Packet::Event { topic, payload }
        }
        Some('4') => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Packet::ConnectError(message)
        }
        _ => Packet::Other,
    }
}

/// Namespace connect frame carrying the auth token.
pub fn connect_frame(token: &str) -> String {
    format!("40{}", serde_json::json!({ "token": token }))
}

/// `http(s)://host` → `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(api_url: &Url) -> Option<Url> {
    let mut url = api_url.clone();
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        _ => return None,
    };
    url.set_scheme(scheme).ok()?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Some(url)
}

/// A view's handle on the event stream. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<LiveEvent>,
}

impl Subscription {
    /// Next event; `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("[{}] Subscriber lagged, {} event(s) skipped", CHANNEL, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The session's single shared real-time connection.
pub struct RealtimeHub {
    url: Option<Url>,
    token: Option<String>,
    policy: ReconnectPolicy,
    tx: broadcast::Sender<LiveEvent>,
    connected: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeHub {
    pub fn new(api_url: &Url, token: Option<String>, policy: ReconnectPolicy) -> Self {
        let (tx, _) = broadcast::channel(256);
        RealtimeHub {
            url: socket_url(api_url),
            token,
            policy,
            tx,
            connected: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Subscribe to all events, opening the connection on first use. Returns
    /// `None` without trying to connect when there is no cached token.
    pub fn subscribe(&self) -> Option<Subscription> {
        let Some(token) = self.token.clone() else {
            debug!("[{}] No auth token cached, not connecting", CHANNEL);
            return None;
        };
        self.ensure_connected(token);
        Some(Subscription {
            rx: self.tx.subscribe(),
        })
    }

    /// Inject an event as if it came off the wire.
    #[cfg(test)]
    pub fn publish(&self, event: LiveEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscription that never opens a connection; for views driven by
    /// `publish` alone.
    #[cfg(test)]
    pub fn local_subscription(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    fn ensure_connected(&self, token: String) {
        let mut task = self.task.lock().unwrap();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let Some(url) = self.url.clone() else {
            warn!("[{}] API URL has no WebSocket equivalent", CHANNEL);
            return;
        };
        let tx = self.tx.clone();
        let connected = Arc::clone(&self.connected);
        let policy = self.policy;
        *task = Some(tokio::spawn(async move {
            connection_loop(url, token, policy, tx, connected).await;
        }));
    }

    /// Tear the connection down; used when the session ends.
    pub fn disconnect(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
            info!("[{}] Disconnected", CHANNEL);
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for RealtimeHub {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

async fn connection_loop(
    url: Url,
    token: String,
    policy: ReconnectPolicy,
    tx: broadcast::Sender<LiveEvent>,
    connected: Arc<AtomicBool>,
) {
    let mut attempt = 0u32;

    loop {
        info!("[{}] Connecting to {}", CHANNEL, url);

        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => {
                let (mut write, mut read) = ws_stream.split();
                let mut handshake_done = false;

                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => match decode_packet(&text) {
                            Packet::Open { ping_interval_ms } => {
                                debug!("[{}] Engine.IO open (ping every {:?} ms)", CHANNEL, ping_interval_ms);
                                if let Err(e) = write.send(Message::Text(connect_frame(&token))).await {
                                    error!("[{}] Failed to send connect frame: {}", CHANNEL, e);
                                    break;
                                }
                            }
                            Packet::Connected => {
                                info!("[{}] Connected", CHANNEL);
                                handshake_done = true;
                                attempt = 0;
                                connected.store(true, Ordering::SeqCst);
                            }
                            Packet::Ping => {
                                if let Err(e) = write.send(Message::Text("3".to_string())).await {
                                    error!("[{}] Pong failed: {}", CHANNEL, e);
                                    break;
                                }
                            }
                            Packet::Event { topic, payload } => {
                                match LiveEvent::from_wire(&topic, payload) {
                                    Some(ev) => {
                                        // No receivers is fine; views subscribe and leave.
                                        let _ = tx.send(ev);
                                    }
                                    None => debug!("[{}] Ignoring event '{}'", CHANNEL, topic),
                                }
                            }
                            Packet::ConnectError(message) => {
                                warn!("[{}] Connection refused: {}", CHANNEL, message);
                                break;
                            }
                            Packet::Disconnect => {
                                warn!("[{}] Server closed the session", CHANNEL);
                                break;
                            }
                            Packet::Pong | Packet::Other => {}
                        },
                        Ok(Message::Ping(data)) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Ok(Message::Close(_)) => {
                            warn!("[{}] WebSocket closed", CHANNEL);
                            break;
                        }
                        Err(e) => {
                            error!("[{}] WebSocket error: {}", CHANNEL, e);
                            break;
                        }
                        _ => {}
                    }
                }

                if !handshake_done {
                    debug!("[{}] Dropped before namespace connect", CHANNEL);
                }
            }
            Err(e) => {
                error!("[{}] Connection failed: {}", CHANNEL, e);
            }
        }

        connected.store(false, Ordering::SeqCst);

        if attempt >= policy.max_attempts {
            error!(
                "[{}] Giving up after {} reconnect attempt(s)",
                CHANNEL, policy.max_attempts
            );
            return;
        }
        let roll: f64 = rand::thread_rng().gen();
        let delay = policy.delay_for(attempt, roll);
        attempt += 1;
        warn!(
            "[{}] Reconnecting in {:.1}s (attempt {}/{})",
            CHANNEL,
            delay.as_secs_f64(),
            attempt,
            policy.max_attempts
        );
        tokio::time::sleep(delay).await;
    }
}
