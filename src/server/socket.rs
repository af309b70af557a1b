//! WebSocket channel, server side
//!
//! Connections are identified by their resolved host name rather than a
//! random session id, so a device that reconnects lands back on its own
//! settings and tracking slot. Every inbound message and lifecycle event is
//! funnelled through a single dispatcher task which awaits each handler to
//! completion: handlers from different clients never interleave mid-mutation,
//! which is the only locking discipline the shared state machines need.

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::constants::SOCKET_PATH;
use crate::protocol::{lifecycle, Envelope};

/// Context for one connected client, handed to message handlers.
#[derive(Clone)]
pub struct ClientContext {
    pub host: String,
    sender: mpsc::UnboundedSender<String>,
}

impl ClientContext {
    /// Send a typed event to this client only.
    pub fn json(&self, event: &str, payload: Value) {
        let frame = Envelope::new(event, payload).encode();
        if self.sender.send(frame).is_err() {
            debug!(host = %self.host, "dropping frame for a closed connection");
        }
    }
}

type Handler = Arc<dyn Fn(Value, ClientContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Pluggable resolution of a remote address into a stable client identity.
pub type HostResolver = Arc<dyn Fn(IpAddr) -> BoxFuture<'static, String> + Send + Sync>;

enum Inbound {
    Connected(ClientContext),
    Disconnected { host: String },
    Message {
        context: ClientContext,
        event: String,
        payload: Value,
    },
}

struct Connection {
    host: String,
    sender: mpsc::UnboundedSender<String>,
}

struct Inner {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
    connections: DashMap<u64, Connection>,
    next_connection_id: AtomicU64,
    inbound: mpsc::UnboundedSender<Inbound>,
    resolver: HostResolver,
}

/// The server end of the message channel.
#[derive(Clone)]
pub struct SocketServer {
    inner: Arc<Inner>,
}

impl SocketServer {
    /// Create the channel and start its dispatcher task. Must be called from
    /// within a tokio runtime.
    pub fn new(resolver: HostResolver) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let server = Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(HashMap::new()),
                connections: DashMap::new(),
                next_connection_id: AtomicU64::new(0),
                inbound: inbound_tx,
                resolver,
            }),
        };

        server.spawn_dispatcher(inbound_rx);

        server
    }

    fn spawn_dispatcher(&self, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
        let inner = self.inner.clone();

        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                match message {
                    Inbound::Connected(context) => {
                        dispatch(&inner, lifecycle::CLIENT_CONNECTED, Value::Null, context).await;
                    }
                    Inbound::Disconnected { host } => {
                        // The connection is gone; handlers only need the host.
                        let (sender, _) = mpsc::unbounded_channel();
                        let context = ClientContext { host, sender };
                        dispatch(&inner, lifecycle::CLIENT_DISCONNECTED, Value::Null, context)
                            .await;
                    }
                    Inbound::Message {
                        context,
                        event,
                        payload,
                    } => dispatch(&inner, &event, payload, context).await,
                }
            }
        });
    }

    /// Register a handler invoked for every inbound message with this event
    /// name, from any client.
    pub fn on<F, Fut>(&self, event: &str, handler: F)
    where
        F: Fn(Value, ClientContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |payload, context| Box::pin(handler(payload, context)));

        self.inner
            .handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Curried broadcast: a sender that serializes one payload to every
    /// currently connected client. Shaped to subscribe state cells directly.
    pub fn broadcaster(&self, event: &str) -> impl Fn(Value) + Send + Sync + 'static {
        let inner = self.inner.clone();
        let event = event.to_string();

        move |payload: Value| {
            let frame = Envelope::new(&event, payload).encode();
            for connection in inner.connections.iter() {
                let _ = connection.sender.send(frame.clone());
            }
        }
    }

    /// Broadcast with a payload customized per recipient host.
    pub fn broadcast_each(&self, event: &str, payload_for: impl Fn(&str) -> Value) {
        for connection in self.inner.connections.iter() {
            let frame = Envelope::new(event, payload_for(&connection.host)).encode();
            let _ = connection.sender.send(frame);
        }
    }

    /// The axum router exposing the WebSocket endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            .route(SOCKET_PATH, get(upgrade_handler))
            .with_state(self.clone())
    }
}

async fn dispatch(inner: &Inner, event: &str, payload: Value, context: ClientContext) {
    let handlers: Vec<Handler> = inner
        .handlers
        .read()
        .get(event)
        .cloned()
        .unwrap_or_default();

    if handlers.is_empty() {
        debug!(%event, "no handlers registered for event");
    }

    for handler in handlers {
        handler(payload.clone(), context.clone()).await;
    }
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<SocketServer>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(server, socket, addr))
}

async fn handle_socket(server: SocketServer, socket: WebSocket, addr: SocketAddr) {
    let host = (server.inner.resolver)(addr.ip()).await;

    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();
    let id = server.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
    server.inner.connections.insert(
        id,
        Connection {
            host: host.clone(),
            sender: sender.clone(),
        },
    );

    info!(%host, "client connected");

    let context = ClientContext {
        host: host.clone(),
        sender,
    };
    let _ = server.inner.inbound.send(Inbound::Connected(context.clone()));

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        if sink.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match Envelope::decode(&text) {
                        Ok(envelope) => {
                            let _ = server.inner.inbound.send(Inbound::Message {
                                context: context.clone(),
                                event: envelope.event,
                                payload: envelope.payload,
                            });
                        }
                        Err(err) => warn!(%host, %err, "dropping undecodable frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pings and pongs are handled by axum
                    Some(Err(err)) => {
                        debug!(%host, %err, "socket error");
                        break;
                    }
                }
            }
        }
    }

    server.inner.connections.remove(&id);
    info!(%host, "client disconnected");
    let _ = server.inner.inbound.send(Inbound::Disconnected { host });
}
