//! Persistent catalog: loading, merging, writing and cover art

pub mod cover;
pub mod load;
pub mod persist;
pub mod store;

pub use store::{LibraryStore, MergeReport, PersistFailurePolicy, StoreOptions};
