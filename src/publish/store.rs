use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::PersistenceError;

/// Result of an idempotent insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Persistence boundary. The real storage engine lives elsewhere; ingestion
/// only needs insert-if-absent keyed by the dedup key, so redelivery and
/// dedup-window eviction never double-count a row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn upsert_if_absent(
        &self,
        kind: &str,
        dedup_key: &str,
        fields: serde_json::Value,
    ) -> Result<UpsertOutcome, PersistenceError>;
}

/// In-memory store used for wiring and tests.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn upsert_if_absent(
        &self,
        kind: &str,
        dedup_key: &str,
        fields: serde_json::Value,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let row_key = format!("{kind}:{dedup_key}");
        let mut rows = self.rows.write().await;
        if rows.contains_key(&row_key) {
            return Ok(UpsertOutcome::AlreadyExists);
        }
        rows.insert(row_key, fields);
        Ok(UpsertOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_is_idempotent_per_key() {
        let store = MemoryStore::new();
        let fields = serde_json::json!({"amount": 1});

        let first = store
            .upsert_if_absent("dex_swaps", "swap-1-1", fields.clone())
            .await
            .unwrap();
        let second = store
            .upsert_if_absent("dex_swaps", "swap-1-1", fields)
            .await
            .unwrap();

        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::AlreadyExists);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn same_key_different_kind_is_distinct() {
        let store = MemoryStore::new();
        let fields = serde_json::json!({});
        store.upsert_if_absent("dex_swaps", "k", fields.clone()).await.unwrap();
        let outcome = store.upsert_if_absent("whale_transactions", "k", fields).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
    }
}
