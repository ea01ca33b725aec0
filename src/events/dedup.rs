use std::collections::{HashSet, VecDeque};

/// Bounded set of already-emitted dedup keys.
///
/// Insertion-ordered, not an LRU: when capacity is reached the oldest half is
/// discarded in bulk, trading dedup precision for bounded memory at amortized
/// O(1) per key. A key re-arriving after eviction will be emitted again; the
/// idempotent store write absorbs that.
#[derive(Debug)]
pub struct DedupWindow {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Returns true exactly once per key per window lifetime, recording the
    /// key as a side effect.
    pub fn should_emit(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }

        if self.order.len() >= self.capacity {
            self.evict_oldest_half();
        }

        self.seen.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }

    fn evict_oldest_half(&mut self) {
        let drop_count = self.capacity / 2;
        for _ in 0..drop_count {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        log::debug!("dedup window evicted {} oldest keys", drop_count);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
