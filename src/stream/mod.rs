pub mod backoff;
pub mod decoder;
pub mod framing;
pub mod supervisor;

pub use backoff::Backoff;
pub use decoder::{decode_line, BalanceDelta, Block, Instruction};
pub use framing::FrameReader;
pub use supervisor::{Cursor, StreamSupervisor};
