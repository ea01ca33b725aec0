use crate::error::ExtractionError;
use crate::events::types::{DomainEvent, NetworkHealthEvent};
use crate::stream::decoder::Block;

use super::extract::EventExtractor;

/// One heartbeat per observed block. The block's existence is the health
/// signal; "offline" is never emitted here, it shows up downstream as the
/// supervisor's `connected: false` heartbeat flag when blocks stop arriving.
pub struct HealthExtractor;

impl EventExtractor for HealthExtractor {
    fn name(&self) -> &'static str {
        "network-health"
    }

    fn extract(&self, block: &Block) -> Result<Vec<DomainEvent>, ExtractionError> {
        Ok(vec![DomainEvent::NetworkHealth(NetworkHealthEvent {
            slot: block.number(),
            status: "online".to_string(),
            timestamp: block.timestamp(),
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::decoder::decode_line;

    #[test]
    fn every_block_yields_one_heartbeat() {
        let block = decode_line(r#"{"number": 123}"#).unwrap();
        let events = HealthExtractor.extract(&block).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].dedup_key(), "health-123");
        let DomainEvent::NetworkHealth(health) = &events[0] else {
            panic!("expected health event");
        };
        assert_eq!(health.status, "online");
        assert_eq!(health.slot, 123);
    }
}
