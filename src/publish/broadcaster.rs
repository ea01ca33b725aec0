use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::RwLock;

use crate::events::types::{DomainEvent, Heartbeat, Topic};

pub type EventReceiver = mpsc::UnboundedReceiver<DomainEvent>;
pub type HeartbeatReceiver = mpsc::UnboundedReceiver<Heartbeat>;

/// Handle identifying one subscription, needed to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriberId(u64);

struct TopicSubscriber {
    id: SubscriberId,
    sender: mpsc::UnboundedSender<DomainEvent>,
}

/// Topic-keyed fan-out. Subscribers register and leave from unrelated tasks
/// while the ingestion task publishes, so membership sits behind an RwLock.
/// Delivery is fire-and-forget: sends never block the ingestion task, and a
/// subscriber whose receiver is gone is pruned on the next send.
pub struct Broadcaster {
    topics: RwLock<HashMap<Topic, Vec<TopicSubscriber>>>,
    heartbeats: RwLock<Vec<(SubscriberId, mpsc::UnboundedSender<Heartbeat>)>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: RwLock::new(HashMap::new()),
            heartbeats: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn allocate_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn subscribe(&self, topic: Topic) -> (SubscriberId, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.allocate_id();
        self.topics
            .write()
            .await
            .entry(topic)
            .or_default()
            .push(TopicSubscriber { id, sender: tx });
        log::info!("subscriber {:?} joined {}", id, topic.as_str());
        (id, rx)
    }

    pub async fn unsubscribe(&self, topic: Topic, id: SubscriberId) {
        if let Some(subscribers) = self.topics.write().await.get_mut(&topic) {
            subscribers.retain(|s| s.id != id);
        }
        log::info!("subscriber {:?} left {}", id, topic.as_str());
    }

    /// Heartbeats go to every heartbeat subscriber regardless of topic.
    pub async fn subscribe_heartbeat(&self) -> (SubscriberId, HeartbeatReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.allocate_id();
        self.heartbeats.write().await.push((id, tx));
        (id, rx)
    }

    pub async fn unsubscribe_heartbeat(&self, id: SubscriberId) {
        self.heartbeats.write().await.retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every subscriber of its topic. Never blocks;
    /// closed receivers are dropped from membership.
    pub async fn publish(&self, event: &DomainEvent) {
        let topic = event.topic();
        let mut topics = self.topics.write().await;
        if let Some(subscribers) = topics.get_mut(&topic) {
            subscribers.retain(|s| s.sender.send(event.clone()).is_ok());
        }
    }

    pub async fn publish_heartbeat(&self, heartbeat: Heartbeat) {
        let mut subscribers = self.heartbeats.write().await;
        subscribers.retain(|(_, tx)| tx.send(heartbeat.clone()).is_ok());
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics
            .read()
            .await
            .get(&topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// Shared between the supervisor (writer) and the heartbeat task (reader):
/// the latest cursor position and whether the upstream connection is live.
pub struct PipelineStatus {
    connected: std::sync::atomic::AtomicBool,
    cursor: AtomicU64,
}

impl PipelineStatus {
    pub fn new(start_block: u64) -> Arc<Self> {
        Arc::new(Self {
            connected: std::sync::atomic::AtomicBool::new(false),
            cursor: AtomicU64::new(start_block),
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn set_cursor(&self, cursor: u64) {
        self.cursor.store(cursor, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (bool, u64) {
        (
            self.connected.load(Ordering::Relaxed),
            self.cursor.load(Ordering::Relaxed),
        )
    }
}

/// Periodic liveness signal, independent of block arrival. This is how
/// consumers tell "quiet chain" apart from "ingestion is down".
pub async fn run_heartbeat(
    broadcaster: Arc<Broadcaster>,
    status: Arc<PipelineStatus>,
    period: std::time::Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (connected, cursor) = status.snapshot();
                broadcaster
                    .publish_heartbeat(Heartbeat {
                        timestamp: chrono::Utc::now().timestamp(),
                        connected,
                        cursor,
                    })
                    .await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{NetworkHealthEvent, SwapEvent};

    fn swap_event(id: &str) -> DomainEvent {
        DomainEvent::Swap(SwapEvent {
            transaction_id: id.to_string(),
            dex: "Raydium".to_string(),
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: 1.0,
            amount_out: 150.0,
            price: 150.0,
            volume_usd: 150.0,
            trader: "AAAAA...BBBBB".to_string(),
            is_estimate: true,
            timestamp: 0,
        })
    }

    #[tokio::test]
    async fn events_reach_only_their_topic() {
        let broadcaster = Broadcaster::new();
        let (_swap_id, mut swap_rx) = broadcaster.subscribe(Topic::DexSwaps).await;
        let (_health_id, mut health_rx) = broadcaster.subscribe(Topic::NetworkHealth).await;

        broadcaster.publish(&swap_event("1-1")).await;

        assert!(swap_rx.try_recv().is_ok());
        assert!(health_rx.try_recv().is_err());

        broadcaster
            .publish(&DomainEvent::NetworkHealth(NetworkHealthEvent {
                slot: 1,
                status: "online".to_string(),
                timestamp: 0,
            }))
            .await;
        assert!(health_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let broadcaster = Broadcaster::new();
        let (id, mut rx) = broadcaster.subscribe(Topic::DexSwaps).await;
        broadcaster.unsubscribe(Topic::DexSwaps, id).await;

        broadcaster.publish(&swap_event("1-2")).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(broadcaster.subscriber_count(Topic::DexSwaps).await, 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_send() {
        let broadcaster = Broadcaster::new();
        let (_id, rx) = broadcaster.subscribe(Topic::DexSwaps).await;
        drop(rx);

        broadcaster.publish(&swap_event("1-3")).await;
        assert_eq!(broadcaster.subscriber_count(Topic::DexSwaps).await, 0);
    }

    #[tokio::test]
    async fn heartbeat_carries_status_snapshot() {
        let broadcaster = Broadcaster::new();
        let status = PipelineStatus::new(500);
        status.set_connected(true);
        status.set_cursor(512);

        let (_id, mut rx) = broadcaster.subscribe_heartbeat().await;
        let (connected, cursor) = status.snapshot();
        broadcaster
            .publish_heartbeat(Heartbeat {
                timestamp: 1,
                connected,
                cursor,
            })
            .await;

        let heartbeat = rx.try_recv().unwrap();
        assert!(heartbeat.connected);
        assert_eq!(heartbeat.cursor, 512);
    }
}
