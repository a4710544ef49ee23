//! Topic-based WebSocket handler for multi-channel subscriptions.
//!
//! This module provides WebSocket support with topic-based filtering:
//! - Clients can subscribe to multiple topics (channels)
//! - Server broadcasts events only to clients subscribed to that topic
//! - Reduces bandwidth and allows organized event streams
//!
//! # Architecture
//!
//! ```text
//! Client                WebSocket Handler              Topics
//!   │                          │                         │
//!   ├─ Connect ───────────────>│                         │
//!   ├─ Subscribe ["A", "B"] ──>│                         │
//!   │                          ├─ Track subscriptions    │
//!   │                          │                         │
//!   │                          │<── Event (topic: "A") ──┤
//!   │<─ Receive Event ─────────┤                         │
//!   │                          │                         │
//!   │                          │<── Event (topic: "C") ──┤
//!   │                          ├─ Filter (not subscribed)│
//!   │                          │                         │
//! ```
//!
//! # Message Protocol
//!
//! **Client → Server (Subscribe):**
//! ```json
//! {
//!   "type": "subscribe",
//!   "topics": ["request_lifecycle", "notifications"]
//! }
//! ```
//!
//! **Server → Client (Confirmation):**
//! ```json
//! {
//!   "type": "subscribed",
//!   "topics": ["request_lifecycle", "notifications"]
//! }
//! ```
//!
//! **Server → Client (Event):**
//! ```json
//! {
//!   "type": "event",
//!   "topic": "request_lifecycle",
//!   "action": { "type": "request_completed", ... }
//! }
//! ```
//!
//! # Example
//!
//! ```javascript
//! // Client connects and subscribes
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({
//!     type: 'subscribe',
//!     topics: ['request_lifecycle', 'availability']
//!   }));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   switch (msg.topic) {
//!     case 'request_lifecycle':
//!       handleRequestLifecycle(msg.action);
//!       break;
//!     case 'availability':
//!       handleAvailability(msg.action);
//!       break;
//!   }
//! };
//! ```

use super::WsMessage;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// Type alias for the channels map to reduce complexity.
type ChannelsMap<A> = Arc<RwLock<std::collections::HashMap<String, broadcast::Sender<(String, A)>>>>;

/// Topic broadcaster for multi-channel WebSocket communication.
///
/// This struct manages topic-based event distribution to WebSocket clients.
/// Each topic has its own broadcast channel, and clients subscribe to topics
/// they're interested in.
///
/// # Type Parameters
///
/// - `A`: Action type (must be Serialize + Clone + Send)
///
/// # Example
///
/// ```ignore
/// let broadcaster = TopicBroadcaster::<MyAction>::new();
///
/// // Publish event to specific topic
/// broadcaster.publish("request_lifecycle", my_action).await;
///
/// // Subscribe to topic
/// let mut rx = broadcaster.subscribe("request_lifecycle").await;
/// while let Ok((topic, action)) = rx.recv().await {
///     // Process action from topic
/// }
/// ```
pub struct TopicBroadcaster<A>
where
    A: Clone + Send + 'static,
{
    /// Map of topic name → broadcast channel
    channels: ChannelsMap<A>,
}

impl<A> TopicBroadcaster<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Create a new topic broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(std::collections::HashMap::new())),
        }
    }

    /// Publish an action to a specific topic.
    ///
    /// All clients subscribed to this topic will receive the action.
    pub async fn publish(&self, topic: impl Into<String>, action: A) {
        let topic = topic.into();
        let mut channels = self.channels.write().await;

        // Get or create channel for this topic
        let sender = channels
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(1000).0);

        // Broadcast to all subscribers (ignore if no receivers)
        let _ = sender.send((topic, action));
    }

    /// Subscribe to a specific topic.
    ///
    /// Returns a receiver that will get all actions published to this topic.
    pub async fn subscribe(&self, topic: impl Into<String>) -> broadcast::Receiver<(String, A)> {
        let topic = topic.into();
        let mut channels = self.channels.write().await;

        // Get or create channel for this topic
        let sender = channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(1000).0);

        sender.subscribe()
    }

    /// Get count of active topics.
    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl<A> Default for TopicBroadcaster<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for TopicBroadcaster<A>
where
    A: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

/// Handle WebSocket connection with topic-based subscriptions.
///
/// This handler allows clients to subscribe to specific topics and only receive
/// events from those topics, reducing bandwidth and enabling organized event streams.
///
/// # Type Parameters
///
/// - `A`: Action type (must be Serialize + Deserialize + Clone + Send)
///
/// # Example
///
/// ```ignore
/// use aegis_web::handlers::websocket_topics::{handle, TopicBroadcaster};
/// use axum::{Router, routing::get};
///
/// let broadcaster = TopicBroadcaster::<MyAction>::new();
///
/// let app = Router::new()
///     .route("/ws", get(handle::<MyAction>))
///     .with_state(broadcaster);
/// ```
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn handle<A>(
    ws: WebSocketUpgrade,
    axum::extract::State(broadcaster): axum::extract::State<TopicBroadcaster<A>>,
) -> Response
where
    A: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    info!("WebSocket connection requested (topic-based)");
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

/// Handle WebSocket connection lifecycle with topic subscriptions.
///
/// Manages client subscriptions and streams events from subscribed topics.
#[allow(clippy::cognitive_complexity)] // WebSocket handler with multiple message types and subscription management
#[allow(clippy::too_many_lines)] // WebSocket protocol requires comprehensive message handling
async fn handle_socket<A>(socket: WebSocket, broadcaster: TopicBroadcaster<A>)
where
    A: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    info!("WebSocket connection established (topic-based)");

    // Split socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Track subscribed topics for this connection
    let subscribed_topics = Arc::new(RwLock::new(HashSet::new()));

    // Spawn receiver task to handle subscription requests
    let recv_subscriptions = Arc::clone(&subscribed_topics);
    let recv_broadcaster = broadcaster.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    // Parse message
                    match serde_json::from_str::<WsMessage<A>>(&text) {
                        Ok(WsMessage::Subscribe { topics }) => {
                            debug!(?topics, "Client subscribing to topics");

                            // Add topics to subscription set
                            let mut subs = recv_subscriptions.write().await;
                            for topic in &topics {
                                subs.insert(topic.clone());
                            }

                            // Send confirmation (note: can't use sender here due to split)
                            // Confirmation will be sent by the main loop
                            debug!(count = topics.len(), "Topics added to subscription");
                        }
                        Ok(WsMessage::Unsubscribe { topics }) => {
                            debug!(?topics, "Client unsubscribing from topics");

                            // Remove topics from subscription set
                            let mut subs = recv_subscriptions.write().await;
                            for topic in &topics {
                                subs.remove(topic);
                            }

                            debug!(count = topics.len(), "Topics removed from subscription");
                        }
                        Ok(WsMessage::Command { action, topic }) => {
                            debug!(?topic, "Received command from client");
                            // Publish command to topic if specified
                            if let Some(t) = topic {
                                recv_broadcaster.publish(t, action).await;
                            }
                        }
                        Ok(WsMessage::Ping) => {
                            debug!("Received ping from client");
                        }
                        Ok(msg) => {
                            warn!(?msg, "Unexpected message type from client");
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to parse WebSocket message");
                        }
                    }
                }
                Message::Ping(_) => {
                    debug!("Received ping");
                }
                Message::Pong(_) => {
                    debug!("Received pong");
                }
                Message::Close(_) => {
                    info!("Client requested close");
                    break;
                }
                Message::Binary(_) => {
                    warn!("Received unexpected binary message");
                }
            }
        }

        debug!("WebSocket receive task terminated");
    });

    // Spawn sender task to stream events from subscribed topics
    let send_subscriptions = Arc::clone(&subscribed_topics);
    let mut send_task = tokio::spawn(async move {
        // Subscribe to a "meta" channel that receives from all topics
        // We'll need to subscribe dynamically as topics are added
        let mut receivers: std::collections::HashMap<String, broadcast::Receiver<(String, A)>> =
            std::collections::HashMap::new();

        loop {
            // Get current subscribed topics
            let topics: Vec<String> = {
                let subs = send_subscriptions.read().await;
                subs.iter().cloned().collect()
            };

            // Subscribe to any new topics
            for topic in &topics {
                if !receivers.contains_key(topic) {
                    receivers.insert(topic.clone(), broadcaster.subscribe(topic).await);
                    debug!(topic = %topic, "Subscribed to new topic");
                }
            }

            // Remove receivers for unsubscribed topics
            receivers.retain(|topic, _| topics.contains(topic));

            // Wait for events from any subscribed topic (with timeout)
            let timeout = tokio::time::sleep(tokio::time::Duration::from_millis(100));
            tokio::pin!(timeout);

            let mut received_event = false;

            for (topic, rx) in &mut receivers {
                match rx.try_recv() {
                    Ok((event_topic, action)) => {
                        // Send event to client
                        let message = WsMessage::Event {
                            action,
                            topic: event_topic,
                        };

                        if let Ok(json) = serde_json::to_string(&message) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                // Client disconnected
                                return;
                            }
                            received_event = true;
                        }
                    }
                    Err(broadcast::error::TryRecvError::Empty) => {
                        // No events right now, continue
                    }
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(topic = %topic, skipped, "Client lagging, skipped events");
                    }
                    Err(broadcast::error::TryRecvError::Closed) => {
                        debug!(topic = %topic, "Topic channel closed");
                    }
                }
            }

            // If no events received, wait a bit before polling again
            if !received_event {
                timeout.await;
            }
        }
    });

    // Wait for either task to complete (connection closed)
    tokio::select! {
        _ = (&mut send_task) => {
            debug!("Send task completed, aborting receive task");
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            debug!("Receive task completed, aborting send task");
            send_task.abort();
        },
    }

    info!("WebSocket connection closed (topic-based)");
}
