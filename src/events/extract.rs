use crate::error::ExtractionError;
use crate::events::types::DomainEvent;
use crate::stream::decoder::Block;

/// Scan one block and emit zero or more typed events. Extractors are pure:
/// all state they need rides on the block or was fixed at construction.
pub trait EventExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, block: &Block) -> Result<Vec<DomainEvent>, ExtractionError>;
}

/// Run every extractor over a block. One extractor failing loses only its own
/// output for that block; the rest still run.
pub fn run_extractors(extractors: &[Box<dyn EventExtractor>], block: &Block) -> Vec<DomainEvent> {
    let mut events = Vec::new();
    for extractor in extractors {
        match extractor.extract(block) {
            Ok(mut extracted) => events.append(&mut extracted),
            Err(e) => {
                log::warn!("extractor {} skipped block {}: {}", extractor.name(), block.number(), e);
            }
        }
    }
    events
}
