//! Tag extraction through the external decoder process

pub mod channel;
pub mod coordinator;
pub mod process;
pub mod protocol;

pub use channel::{DecoderChannel, FifoChannel};
pub use coordinator::{BatchSettings, TagExtractionCoordinator};
pub use process::{DecoderProcess, DecoderWatch};
