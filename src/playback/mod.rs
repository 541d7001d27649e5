//! In-memory playback cursor on top of a catalog entry

pub mod format;
pub mod position;

pub use position::PlaybackPosition;
