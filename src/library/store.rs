use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{self, Audiobook, Catalog};
use crate::error::StoreError;
use crate::media::MediaServices;
use crate::scan::validate::clean_name;

use super::cover::resolve_cover_art;
use super::load::load_catalog;
use super::persist::{self, COVER_FILE_NAME};

pub type Result<T> = std::result::Result<T, StoreError>;

/// What happens to the library when a merge cannot be written out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistFailurePolicy {
    /// Delete the data directory and start from an empty catalog
    #[default]
    Wipe,
    /// Keep whatever is in memory and on disk
    Preserve,
}

impl fmt::Display for PersistFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistFailurePolicy::Wipe => write!(f, "wipe"),
            PersistFailurePolicy::Preserve => write!(f, "preserve"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub load_workers: usize,
    pub failure_policy: PersistFailurePolicy,
    /// Stops the startup load early when raised
    pub cancel: Arc<AtomicBool>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            load_workers: 6,
            failure_policy: PersistFailurePolicy::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Outcome of merging a scan into the library
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub replaced: usize,
    pub removed_invalid: usize,
    pub covers: usize,
}

/// The persistent author/title/audiobook catalog
pub struct LibraryStore {
    data_dir: PathBuf,
    catalog: Catalog,
    policy: PersistFailurePolicy,
    media: Arc<dyn MediaServices>,
}

impl LibraryStore {
    /// Open the library at `data_dir`, loading every stored book
    pub fn open(
        data_dir: &Path,
        options: StoreOptions,
        media: Arc<dyn MediaServices>,
    ) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;
        let catalog = load_catalog(data_dir, options.load_workers, &options.cancel);

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            catalog,
            policy: options.failure_policy,
            media,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get(&self, author: &str, title: &str) -> Option<&Audiobook> {
        self.catalog.get(author)?.get(title)
    }

    /// Every book, ordered by author then title
    pub fn audiobooks(&self) -> Vec<&Audiobook> {
        self.catalog.values().flat_map(|books| books.values()).collect()
    }

    pub fn book_dir(&self, author: &str, title: &str) -> PathBuf {
        persist::book_dir(&self.data_dir, author, title)
    }

    /// Merge freshly scanned books into the library and write it out.
    ///
    /// A scanned book replaces any stored book with the same author and
    /// title; the old directory is removed before anything new is written.
    /// On failure the configured policy is applied before the error is
    /// returned.
    pub fn merge(&mut self, scanned: Catalog) -> Result<MergeReport> {
        match self.try_merge(scanned) {
            Ok(report) => Ok(report),
            Err(e) => Err(self.apply_policy(e)),
        }
    }

    fn try_merge(&mut self, scanned: Catalog) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        for (author, books) in scanned {
            for (title, book) in books {
                if self.get(&author, &title).is_some() {
                    info!("Replacing {} / {}", author, title);
                    self.delete_audiobook(&author, &title)?;
                    report.replaced += 1;
                } else {
                    info!("Adding {} / {}", author, title);
                    report.added += 1;
                }
                *catalog::book_entry(&mut self.catalog, &author, &title) = book;
            }
        }

        let mut invalid = Vec::new();
        for book in self.books_mut() {
            book.sanitize();
            if !book.is_valid() {
                invalid.push((book.author().to_string(), book.title().to_string()));
            }
        }
        for (author, title) in invalid {
            warn!("Removing invalid book {} / {}", author, title);
            self.delete_audiobook(&author, &title)?;
            report.removed_invalid += 1;
        }

        self.persist_all()?;
        report.covers = self.resolve_covers()?;
        Ok(report)
    }

    fn books_mut(&mut self) -> impl Iterator<Item = &mut Audiobook> {
        self.catalog.values_mut().flat_map(|books| books.values_mut())
    }

    fn persist_all(&self) -> Result<()> {
        for book in self.audiobooks() {
            persist::write_book(&self.data_dir, book)?;
        }
        debug!("Persisted {} books", catalog::book_count(&self.catalog));
        Ok(())
    }

    fn resolve_covers(&mut self) -> Result<usize> {
        let mut found = 0;
        let data_dir = &self.data_dir;
        let media = self.media.as_ref();
        for book in self.catalog.values_mut().flat_map(|books| books.values_mut()) {
            let dir = persist::book_dir(data_dir, book.author(), book.title());
            let cover = resolve_cover_art(book, &dir, media)?;
            if cover.is_some() {
                found += 1;
            }
            book.set_cover_art(cover);
        }
        Ok(found)
    }

    fn apply_policy(&mut self, source: StoreError) -> StoreError {
        error!("Library write failed: {}", source);
        match self.policy {
            PersistFailurePolicy::Wipe => {
                if let Err(e) = self.wipe() {
                    error!("Failed to wipe library: {}", e);
                }
            }
            PersistFailurePolicy::Preserve => {}
        }
        StoreError::PersistFailed {
            policy: self.policy,
            source: Box::new(source),
        }
    }

    /// Remove a book from disk and memory
    pub fn delete_audiobook(&mut self, author: &str, title: &str) -> Result<Audiobook> {
        if self.get(author, title).is_none() {
            return Err(StoreError::NotFound {
                author: author.to_string(),
                title: title.to_string(),
            });
        }

        persist::remove_book_dir(&self.data_dir, author, title)?;
        info!("Deleted {} / {}", author, title);
        catalog::remove_book(&mut self.catalog, author, title).ok_or_else(|| {
            StoreError::NotFound {
                author: author.to_string(),
                title: title.to_string(),
            }
        })
    }

    /// Move a book to a new author and title, renaming its directory
    pub fn rename_audiobook(
        &mut self,
        author: &str,
        title: &str,
        new_author: &str,
        new_title: &str,
    ) -> Result<()> {
        if new_author.trim().is_empty() || new_title.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        let (new_author, new_title) = (clean_name(new_author), clean_name(new_title));
        let (new_author, new_title) = (new_author.as_str(), new_title.as_str());
        if self.get(author, title).is_none() {
            return Err(StoreError::NotFound {
                author: author.to_string(),
                title: title.to_string(),
            });
        }
        if author == new_author && title == new_title {
            return Ok(());
        }
        if self.get(new_author, new_title).is_some() {
            return Err(StoreError::AlreadyExists {
                author: new_author.to_string(),
                title: new_title.to_string(),
            });
        }

        let old_dir = self.book_dir(author, title);
        let new_dir = self.book_dir(new_author, new_title);
        let new_parent = self.data_dir.join(new_author);
        fs::create_dir_all(&new_parent).map_err(|e| StoreError::io(&new_parent, e))?;
        match fs::rename(&old_dir, &new_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&old_dir, e)),
        }
        persist::remove_dir_if_empty(&self.data_dir.join(author))?;

        let Some(book) = catalog::remove_book(&mut self.catalog, author, title) else {
            return Ok(());
        };
        let cover = new_dir.join(COVER_FILE_NAME);
        let mut book = book.renamed(new_author, new_title);
        book.set_cover_art(cover.is_file().then_some(cover));

        // The directory may not have existed on disk yet
        persist::write_book(&self.data_dir, &book)?;
        *catalog::book_entry(&mut self.catalog, new_author, new_title) = book;
        info!("Renamed {} / {} to {} / {}", author, title, new_author, new_title);
        Ok(())
    }

    /// Save a book's playback cursor; returns `false` when nothing changed
    pub fn update_position(
        &mut self,
        author: &str,
        title: &str,
        track: usize,
        position_ms: i64,
    ) -> Result<bool> {
        let dir = self.book_dir(author, title);
        let book = self
            .catalog
            .get_mut(author)
            .and_then(|books| books.get_mut(title))
            .ok_or_else(|| StoreError::NotFound {
                author: author.to_string(),
                title: title.to_string(),
            })?;

        if book.current_track() == track && book.current_position_ms() == position_ms {
            return Ok(false);
        }

        book.set_current_track(track);
        book.set_current_position_ms(position_ms);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        persist::write_position(&dir, track, position_ms)?;
        debug!("Saved position {}:{} for {} / {}", track, position_ms, author, title);
        Ok(true)
    }

    /// Delete the whole data directory and forget every book
    pub fn wipe(&mut self) -> Result<()> {
        self.catalog.clear();
        match fs::remove_dir_all(&self.data_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        }
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))?;
        warn!("Wiped library at {:?}", self.data_dir);
        Ok(())
    }
}
