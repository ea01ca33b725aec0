pub mod dedup;
pub mod extract;
pub mod health;
pub mod swap;
pub mod types;
pub mod whale;

pub use dedup::DedupWindow;
pub use extract::{run_extractors, EventExtractor};
pub use health::HealthExtractor;
pub use swap::SwapExtractor;
pub use types::{DomainEvent, Heartbeat, Topic};
pub use whale::WhaleExtractor;

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Fixed reference price used for USD estimates. Deliberately approximate:
/// the pipeline estimates magnitude, it does not quote markets.
pub const SOL_USD_REFERENCE: f64 = 150.0;
