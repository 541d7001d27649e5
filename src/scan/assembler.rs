use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::catalog::{self, Catalog, TrackInfo};

use super::walker::DeletionMarks;

/// Groups validated tracks into books while a scan is running
pub struct Assembler {
    catalog: Catalog,
    marks: DeletionMarks,
    invalid: BTreeSet<(String, String)>,
}

impl Assembler {
    pub fn new(marks: DeletionMarks) -> Self {
        Self {
            catalog: Catalog::new(),
            marks,
            invalid: BTreeSet::new(),
        }
    }

    /// Add a validated track to its (author, title) book.
    ///
    /// When the track makes the book invalid, the book is remembered for
    /// removal and its directory is marked so the walker stops feeding it.
    pub fn insert(&mut self, track: TrackInfo) -> bool {
        let author = track.author_str().to_string();
        let title = track.title_str().to_string();
        let dir = track.containing_dir().map(|d| d.to_path_buf());

        let book = catalog::book_entry(&mut self.catalog, &author, &title);
        if book.add_track(track) {
            return true;
        }

        if self.invalid.insert((author.clone(), title.clone())) {
            warn!("Conflicting track numbers in {} / {}, dropping book", author, title);
            if let Some(dir) = dir {
                self.marks.mark(&dir);
            }
        }
        false
    }

    /// Drop invalidated books and renumber multi-disk ones
    pub fn finish(mut self) -> Catalog {
        for (author, title) in &self.invalid {
            catalog::remove_book(&mut self.catalog, author, title);
        }

        for book in self.catalog.values_mut().flat_map(|books| books.values_mut()) {
            book.sanitize();
        }

        debug!(
            "Assembled {} books ({} dropped)",
            catalog::book_count(&self.catalog),
            self.invalid.len()
        );
        self.catalog
    }
}
