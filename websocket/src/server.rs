//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws`. Consumers subscribe to outbound
//! event topics and receive every published [`Envelope`] as JSON. The
//! indexer uses the same endpoint to push read-model updates, which are
//! decoded and queued for the read-model consumer.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use votegate_messages::{decode_update_value, Envelope, PublishError, Topic};
use votegate_sessions::ReadModelUpdate;

use crate::error::WsError;
use crate::subscriptions::{ClientMessage, ClientSubscriptions, ServerMessage};

type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Shared state: one broadcast channel per outbound topic, plus the queue
/// of inbound read-model updates.
pub struct WsState {
    channels: HashMap<Topic, broadcast::Sender<String>>,
    updates_tx: mpsc::Sender<ReadModelUpdate>,
}

impl WsState {
    /// Create the state and the receiving end of the update queue.
    pub fn new(channel_capacity: usize) -> (Self, mpsc::Receiver<ReadModelUpdate>) {
        let channels = Topic::OUTBOUND
            .iter()
            .map(|topic| (*topic, broadcast::channel(channel_capacity).0))
            .collect();
        let (updates_tx, updates_rx) = mpsc::channel(channel_capacity);
        (
            Self {
                channels,
                updates_tx,
            },
            updates_rx,
        )
    }

    /// Get the broadcast sender for a given topic.
    pub fn sender_for(&self, topic: &Topic) -> Option<&broadcast::Sender<String>> {
        self.channels.get(topic)
    }

    /// Broadcast an envelope to the subscribers of its topic. Returns how
    /// many subscribers received it; zero subscribers is not an error.
    pub fn publish_envelope(&self, envelope: &Envelope) -> Result<usize, PublishError> {
        let sender = self
            .sender_for(&envelope.topic)
            .ok_or_else(|| PublishError::Transport(format!("{} is not an outbound topic", envelope.topic)))?;
        let json = envelope.to_json()?;
        Ok(sender.send(json).unwrap_or(0))
    }

    /// Queue a decoded read-model update for the consumer.
    pub async fn push_update(&self, update: ReadModelUpdate) -> Result<(), WsError> {
        self.updates_tx
            .send(update)
            .await
            .map_err(|_| WsError::ConsumerGone)
    }
}

/// A bound WebSocket server.
pub struct WebSocketServer {
    listener: tokio::net::TcpListener,
    state: Arc<WsState>,
}

impl WebSocketServer {
    /// Bind `addr`; port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, state: Arc<WsState>) -> Result<Self, WsError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WsError::Bind { addr, source: e })?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, WsError> {
        self.listener.local_addr().map_err(WsError::Serve)
    }

    /// Serve WebSocket connections until `shutdown_rx` fires.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), WsError> {
        info!(addr = ?self.listener.local_addr().ok(), "WebSocket server listening");
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .map_err(WsError::Serve)?;
        info!("WebSocket server stopped");
        Ok(())
    }
}

/// Router serving `/ws`.
pub fn router(state: Arc<WsState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
///
/// 1. Split the socket into sender and receiver halves.
/// 2. Listen for client messages (subscribe, unsubscribe, ping, update).
/// 3. For each active subscription, spawn a forwarder task that reads from
///    the topic broadcast channel and sends matching events to the client.
/// 4. Abort all forwarder tasks when the client disconnects.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSink = Arc::new(Mutex::new(ws_sender));

    let mut client_subs = ClientSubscriptions::new();
    let mut forwarders: HashMap<Topic, JoinHandle<()>> = HashMap::new();

    debug!("WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "WebSocket receive error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let reply =
                    handle_text_message(&text, &state, &mut client_subs, &mut forwarders, &ws_sender).await;
                if send(&ws_sender, reply.to_json()).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(data) => {
                let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (topic, handle) in forwarders.drain() {
        debug!(topic = %topic, "aborting forwarder");
        handle.abort();
    }
    debug!("WebSocket client disconnected");
}

async fn send(sink: &WsSink, text: String) -> Result<(), axum::Error> {
    sink.lock().await.send(Message::Text(text)).await
}

/// Process a text message from the client and produce the reply.
async fn handle_text_message(
    text: &str,
    state: &Arc<WsState>,
    client_subs: &mut ClientSubscriptions,
    forwarders: &mut HashMap<Topic, JoinHandle<()>>,
    ws_sender: &WsSink,
) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => return ServerMessage::error(format!("invalid message: {e}")),
    };

    match client_msg {
        ClientMessage::Subscribe { topic, filter } => {
            let Some(sender) = state.sender_for(&topic) else {
                return ServerMessage::error(format!("{topic} cannot be subscribed to"));
            };
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }
            client_subs.subscribe(topic, filter.clone());

            let rx = sender.subscribe();
            let sink = Arc::clone(ws_sender);
            let mut matcher = ClientSubscriptions::new();
            matcher.subscribe(topic, filter);
            forwarders.insert(topic, tokio::spawn(forward_events(rx, sink, topic, matcher)));

            debug!(topic = %topic, "client subscribed");
            ServerMessage::ack("subscribe", topic.as_str())
        }
        ClientMessage::Unsubscribe { topic } => {
            let was_subscribed = client_subs.unsubscribe(&topic);
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }
            if was_subscribed {
                debug!(topic = %topic, "client unsubscribed");
                ServerMessage::ack("unsubscribe", topic.as_str())
            } else {
                ServerMessage::error(format!("not subscribed to {topic}"))
            }
        }
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Update { topic, payload } => match decode_update_value(&topic, payload) {
            Ok(update) => {
                let kind = update.kind();
                match state.push_update(update).await {
                    Ok(()) => {
                        debug!(topic = %topic, kind, "read-model update queued");
                        ServerMessage::ack("update", topic)
                    }
                    Err(e) => ServerMessage::error(e.to_string()),
                }
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "rejected read-model update");
                ServerMessage::error(e.to_string())
            }
        },
    }
}

/// Forwarder task: reads events from a broadcast receiver and sends matching
/// ones to the client.
async fn forward_events(
    mut rx: broadcast::Receiver<String>,
    sink: WsSink,
    topic: Topic,
    matcher: ClientSubscriptions,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let should_send = match serde_json::from_str::<Envelope>(&event) {
                    Ok(envelope) => matcher.matches_filter(&topic, &envelope),
                    Err(_) => true,
                };
                if should_send && send(&sink, event).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(topic = %topic, skipped = n, "client lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(topic = %topic, "broadcast channel closed");
                break;
            }
        }
    }
}
