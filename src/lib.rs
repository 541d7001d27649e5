//! Audiobook catalog built by scanning directory trees through an external
//! tag decoder, plus the playback cursor kept for each book.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod library;
pub mod media;
pub mod playback;
pub mod scan;

pub use catalog::{Audiobook, Catalog, TrackInfo};
pub use config::Config;
pub use error::{ExtractError, ScanError, StoreError};
pub use library::LibraryStore;
pub use playback::PlaybackPosition;
