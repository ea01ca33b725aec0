pub mod broadcaster;
pub mod publisher;
pub mod store;

pub use broadcaster::{run_heartbeat, Broadcaster, PipelineStatus, SubscriberId};
pub use publisher::Publisher;
pub use store::{EventStore, MemoryStore, UpsertOutcome};
