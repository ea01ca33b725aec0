pub mod config;
pub mod error;
pub mod events;
pub mod publish;
pub mod stream;

// Re-export key types
pub use config::IngestConfig;
pub use error::{ConnectError, DecodeError, ExtractionError, PersistenceError};

pub use events::{
    types::DomainEvent,
    types::Heartbeat,
    types::Topic,
    DedupWindow,
};

pub use publish::{
    Broadcaster,
    EventStore,
    MemoryStore,
    PipelineStatus,
    Publisher,
};

pub use stream::{
    FrameReader,
    StreamSupervisor,
};
