//! Reconnecting client transport
//!
//! Maintains one persistent WebSocket connection, retrying forever with a
//! small random jitter on the base delay so a fleet of clients doesn't storm
//! the server after a restart. Outbound sends are fire-and-forget: while
//! disconnected only the latest attempt is kept, and it is sent exactly once
//! when connectivity returns.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::constants::{RECONNECT_BASE_DELAY_MS, RECONNECT_JITTER_MS};
use crate::protocol::Envelope;
use crate::reactive::{ReadOnly, Subscribable};

struct Inner {
    outbound: mpsc::UnboundedSender<String>,
    connected: Subscribable<bool>,
    /// Latest frame attempted while disconnected; flushed once on connect.
    pending: Mutex<Option<String>>,
}

#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl Transport {
    /// Start the connection loop. Inbound frames are delivered on `incoming`.
    pub fn spawn(url: String, incoming: mpsc::UnboundedSender<Envelope>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let transport = Self {
            inner: Arc::new(Inner {
                outbound: outbound_tx,
                connected: Subscribable::new(false),
                pending: Mutex::new(None),
            }),
        };

        let inner = transport.inner.clone();
        tokio::spawn(run(url, inner, outbound_rx, incoming));

        transport
    }

    /// Send a typed command. If the transport is down, the frame is queued as
    /// the single pending attempt rather than dropped.
    pub fn send(&self, event: &str, payload: Value) {
        let frame = Envelope::new(event, payload).encode();

        if self.inner.connected.get() {
            let _ = self.inner.outbound.send(frame);
        } else {
            *self.inner.pending.lock() = Some(frame);
        }
    }

    pub fn connected(&self) -> ReadOnly<bool> {
        self.inner.connected.read_only()
    }
}

async fn run(
    url: String,
    inner: Arc<Inner>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    incoming: mpsc::UnboundedSender<Envelope>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(%url, "connected");
                inner.connected.set(true);

                let (mut sink, mut stream) = socket.split();

                // Flush the single pending attempt; the lock must not be held
                // across the send.
                let pending = inner.pending.lock().take();
                if let Some(frame) = pending {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        inner.connected.set(false);
                        continue;
                    }
                }

                loop {
                    tokio::select! {
                        frame = outbound.recv() => {
                            match frame {
                                Some(frame) => {
                                    if sink.send(Message::Text(frame)).await.is_err() {
                                        break;
                                    }
                                }
                                None => return,
                            }
                        }
                        message = stream.next() => {
                            match message {
                                Some(Ok(Message::Text(text))) => match Envelope::decode(&text) {
                                    Ok(envelope) => {
                                        if incoming.send(envelope).is_err() {
                                            return;
                                        }
                                    }
                                    Err(err) => warn!(%err, "dropping undecodable frame"),
                                },
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    debug!(%err, "socket error");
                                    break;
                                }
                            }
                        }
                    }
                }

                inner.connected.set(false);
                warn!("connection lost, reconnecting");
            }
            Err(err) => debug!(%err, "connection attempt failed"),
        }

        let delay = RECONNECT_BASE_DELAY_MS + fastrand::u64(0..RECONNECT_JITTER_MS);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sends_while_disconnected_keep_only_the_latest() {
        let (incoming, _incoming_rx) = mpsc::unbounded_channel();
        // An address nothing listens on: the transport stays disconnected.
        let transport = Transport::spawn("ws://127.0.0.1:9/api".to_string(), incoming);

        transport.send("content:line:set-current", json!("L1"));
        transport.send("content:line:set-current", json!("L2"));

        let pending = transport.inner.pending.lock().clone().unwrap();
        let envelope = Envelope::decode(&pending).unwrap();
        assert_eq!(envelope.payload, json!("L2"));
        assert!(!transport.connected().get());
    }
}
