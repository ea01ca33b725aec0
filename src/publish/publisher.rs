use std::sync::Arc;

use crate::events::types::DomainEvent;
use crate::events::DedupWindow;

use super::broadcaster::Broadcaster;
use super::store::EventStore;

/// Turns surviving events into durable rows and live messages. Owns the dedup
/// window; everything behind it sees each key at most once per window
/// lifetime.
pub struct Publisher {
    store: Arc<dyn EventStore>,
    broadcaster: Arc<Broadcaster>,
    dedup: DedupWindow,
}

impl Publisher {
    pub fn new(store: Arc<dyn EventStore>, broadcaster: Arc<Broadcaster>, dedup_capacity: usize) -> Self {
        Self {
            store,
            broadcaster,
            dedup: DedupWindow::new(dedup_capacity),
        }
    }

    /// Dedup-gate, persist, broadcast. The store write runs on its own task
    /// so a slow store never holds up the read loop; a failed write is logged
    /// and the event is still broadcast so live consumers aren't starved.
    pub async fn publish(&mut self, event: DomainEvent) {
        let key = event.dedup_key();
        if !self.dedup.should_emit(&key) {
            return;
        }

        let fields = match serde_json::to_value(&event) {
            Ok(fields) => fields,
            Err(e) => {
                log::error!("unserializable event {key}: {e}");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let kind = event.kind();
        tokio::spawn(async move {
            if let Err(e) = store.upsert_if_absent(kind, &key, fields).await {
                log::warn!("persist failed for {key}: {e}");
            }
        });

        self.broadcaster.publish(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::Topic;
    use crate::events::{HealthExtractor, SwapExtractor};
    use crate::events::extract::{run_extractors, EventExtractor};
    use crate::publish::store::{MemoryStore, MockEventStore, UpsertOutcome};
    use crate::stream::decoder::decode_line;
    use std::collections::HashSet;

    fn dex_block() -> crate::stream::decoder::Block {
        decode_line(
            r#"{"header": {"number": 1000, "timestamp": 1700000000},
                "instructions": [
                    {"transactionIndex": 7, "programId": "DEX_X",
                     "accounts": ["AAAAAAAAAAAAAAAAAAAAAAAA", "BBBBBBBBBBBBBBBBBBBBBBBB", "CCCCCCCCCCCCCCCCCCCCCCCC"],
                     "data": ""}
                ]}"#,
        )
        .unwrap()
    }

    fn extractors() -> Vec<Box<dyn EventExtractor>> {
        let mut programs = HashSet::new();
        programs.insert("DEX_X".to_string());
        vec![
            Box::new(SwapExtractor::new(programs)),
            Box::new(HealthExtractor),
        ]
    }

    #[tokio::test]
    async fn redelivered_block_publishes_each_key_once() {
        let mut mock = MockEventStore::new();
        // One swap + one health event, each persisted exactly once across
        // both deliveries.
        mock.expect_upsert_if_absent()
            .times(2)
            .returning(|_, _, _| Ok(UpsertOutcome::Inserted));

        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.subscribe(Topic::DexSwaps).await;
        let mut publisher = Publisher::new(Arc::new(mock), Arc::clone(&broadcaster), 100);

        let block = dex_block();
        let extractors = extractors();
        for _ in 0..2 {
            for event in run_extractors(&extractors, &block) {
                publisher.publish(event).await;
            }
        }
        // Let the spawned store writes run before the mock is checked.
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn store_failure_still_broadcasts() {
        let mut mock = MockEventStore::new();
        mock.expect_upsert_if_absent().returning(|_, key, _| {
            Err(crate::error::PersistenceError::WriteFailed {
                key: key.to_string(),
                reason: "disk full".to_string(),
            })
        });

        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.subscribe(Topic::DexSwaps).await;
        let mut publisher = Publisher::new(Arc::new(mock), Arc::clone(&broadcaster), 100);

        let block = dex_block();
        let extractors = extractors();
        for event in run_extractors(&extractors, &block) {
            publisher.publish(event).await;
        }

        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn memory_store_ends_up_with_one_row_per_key() {
        let store = MemoryStore::new();
        let broadcaster = Broadcaster::new();
        let mut publisher =
            Publisher::new(Arc::clone(&store) as Arc<dyn EventStore>, broadcaster, 100);

        let block = dex_block();
        let extractors = extractors();
        for _ in 0..3 {
            for event in run_extractors(&extractors, &block) {
                publisher.publish(event).await;
            }
        }
        // Spawned writes; give them a tick.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(store.len().await, 2); // swap + health
    }
}
