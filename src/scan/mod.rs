//! Directory scanning: walk, extract, validate and assemble books

pub mod assembler;
pub mod validate;
pub mod walker;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::bounded;
use tracing::info;

use crate::catalog::{self, Catalog};
use crate::error::ScanError;
use crate::extract::{BatchSettings, DecoderChannel, DecoderProcess, TagExtractionCoordinator};
use crate::media::MediaServices;

pub use validate::{TrackValidator, UNKNOWN_NAME};
pub use walker::{DeletionMarks, FileWalker, ScannedFile, WalkSummary};

/// Tunables for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Capacity of the handle queue, which bounds open files
    pub max_open_files: usize,
    pub batch: BatchSettings,
    /// File extensions to consider; empty means every file
    pub extensions: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_open_files: 100,
            batch: BatchSettings::default(),
            extensions: Vec::new(),
        }
    }
}

/// Runs the scan pipeline over a directory tree
pub struct Scanner {
    media: Arc<dyn MediaServices>,
    settings: ScanSettings,
    cancel: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(media: Arc<dyn MediaServices>, settings: ScanSettings) -> Self {
        Self {
            media,
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the walker when set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Scan `root` into a fresh catalog.
    ///
    /// The result only holds what was found under `root`; merging it into the
    /// library is the caller's job. On error nothing is returned, so the
    /// existing library stays untouched.
    pub fn scan_directory(
        &self,
        root: &Path,
        channel: Box<dyn DecoderChannel>,
        decoder: Option<DecoderProcess>,
    ) -> Result<Catalog, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        info!("Scanning {:?}", root);

        let marks = DeletionMarks::default();
        let (tx, rx) = bounded(self.settings.max_open_files.max(1));

        let walker = FileWalker::new(
            root,
            Arc::clone(&self.media),
            marks.clone(),
            Arc::clone(&self.cancel),
        )
        .with_extensions(&self.settings.extensions)
        .spawn(tx)
        .map_err(ScanError::Spawn)?;

        let coordinator = TagExtractionCoordinator::new(
            channel,
            decoder,
            TrackValidator::new(Arc::clone(&self.media)),
            marks,
            self.settings.batch,
        );
        let result = coordinator.run(rx);

        let summary = walker.join().map_err(|_| ScanError::WalkerPanicked)?;
        let catalog = result?;

        if summary.cancelled || self.cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }

        info!(
            "Scan of {:?} found {} books in {} files ({} skipped)",
            root,
            catalog::book_count(&catalog),
            summary.queued,
            summary.skipped
        );
        Ok(catalog)
    }
}
