use std::collections::HashSet;
use std::fs::File;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{SendTimeoutError, Sender};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::media::MediaServices;

/// How long a blocked send waits before re-checking cancellation
const SEND_RETRY: Duration = Duration::from_millis(100);

/// An opened file waiting for tag extraction
#[derive(Debug)]
pub struct ScannedFile {
    /// Open handle; closed when this value is dropped
    pub file: File,
    /// Descriptor number sent to the tag decoder
    pub fd: RawFd,
    pub locator: PathBuf,
    /// Directory the file was found in
    pub dir: PathBuf,
}

/// Directories whose books were found invalid mid-scan; the walker skips them
#[derive(Debug, Clone, Default)]
pub struct DeletionMarks {
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DeletionMarks {
    pub fn mark(&self, dir: &Path) {
        self.dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dir.to_path_buf());
    }

    pub fn is_marked(&self, dir: &Path) -> bool {
        self.dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(dir)
    }
}

/// Counts reported when the walker finishes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub queued: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Recursively opens every file under a root and feeds them into a bounded queue
pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    marks: DeletionMarks,
    cancel: Arc<AtomicBool>,
    media: Arc<dyn MediaServices>,
}

impl FileWalker {
    pub fn new(
        root: &Path,
        media: Arc<dyn MediaServices>,
        marks: DeletionMarks,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            extensions: Vec::new(),
            marks,
            cancel,
            media,
        }
    }

    /// Only queue files with one of these extensions; empty means everything
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Start walking on a dedicated thread.
    ///
    /// The queue is never closed explicitly: the sender is dropped when the
    /// thread exits, which the consumer sees as disconnection.
    pub fn spawn(self, queue: Sender<ScannedFile>) -> std::io::Result<JoinHandle<WalkSummary>> {
        thread::Builder::new()
            .name("file-walker".to_string())
            .spawn(move || self.walk(&queue))
    }

    /// Walk on the current thread
    pub fn walk(&self, queue: &Sender<ScannedFile>) -> WalkSummary {
        let mut summary = WalkSummary::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && self.marks.is_marked(e.path())));

        for entry in walker {
            if self.cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !self.wants(path) {
                continue;
            }

            let dir = path.parent().unwrap_or(&self.root).to_path_buf();
            if self.marks.is_marked(&dir) {
                continue;
            }

            let file = match self.media.open(path) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let scanned = ScannedFile {
                fd: file.as_raw_fd(),
                file,
                locator: path.to_path_buf(),
                dir,
            };

            if !self.push(queue, scanned) {
                summary.cancelled = true;
                break;
            }
            summary.queued += 1;
        }

        debug!(
            "Walker finished under {:?}: {} queued, {} skipped",
            self.root, summary.queued, summary.skipped
        );
        summary
    }

    fn wants(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Blocking send that gives up on cancellation or a vanished consumer
    fn push(&self, queue: &Sender<ScannedFile>, mut item: ScannedFile) -> bool {
        loop {
            match queue.send_timeout(item, SEND_RETRY) {
                Ok(()) => return true,
                Err(SendTimeoutError::Disconnected(_)) => return false,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.cancel.load(Ordering::Relaxed) {
                        return false;
                    }
                    item = returned;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::LoftyMedia;
    use crossbeam_channel::bounded;
    use std::fs;

    fn walker(root: &Path) -> (FileWalker, DeletionMarks, Arc<AtomicBool>) {
        let marks = DeletionMarks::default();
        let cancel = Arc::new(AtomicBool::new(false));
        let walker = FileWalker::new(root, Arc::new(LoftyMedia), marks.clone(), cancel.clone());
        (walker, marks, cancel)
    }

    fn names(rx: &crossbeam_channel::Receiver<ScannedFile>) -> Vec<String> {
        rx.try_iter()
            .map(|f| f.locator.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_walks_recursively_with_parent_dir() {
        let temp = tempfile::tempdir().unwrap();
        let book = temp.path().join("Author").join("Book");
        fs::create_dir_all(&book).unwrap();
        fs::write(book.join("01.mp3"), b"x").unwrap();
        fs::write(book.join("02.mp3"), b"x").unwrap();
        fs::write(temp.path().join("loose.mp3"), b"x").unwrap();

        let (walker, _, _) = walker(temp.path());
        let (tx, rx) = bounded(10);
        let summary = walker.walk(&tx);

        assert_eq!(summary.queued, 3);
        let files: Vec<ScannedFile> = rx.try_iter().collect();
        let in_book: Vec<_> = files.iter().filter(|f| f.dir == book).collect();
        assert_eq!(in_book.len(), 2);
        assert!(files.iter().all(|f| f.fd >= 0));
    }

    #[test]
    fn test_extension_filter() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.MP3"), b"x").unwrap();
        fs::write(temp.path().join("b.m4b"), b"x").unwrap();
        fs::write(temp.path().join("c.txt"), b"x").unwrap();

        let (walker, _, _) = walker(temp.path());
        let walker = walker.with_extensions(&[".mp3".to_string(), "M4B".to_string()]);
        let (tx, rx) = bounded(10);
        walker.walk(&tx);

        assert_eq!(names(&rx), vec!["a.MP3", "b.m4b"]);
    }

    #[test]
    fn test_skips_marked_directories() {
        let temp = tempfile::tempdir().unwrap();
        let bad = temp.path().join("Bad");
        let good = temp.path().join("Good");
        fs::create_dir_all(&bad).unwrap();
        fs::create_dir_all(&good).unwrap();
        fs::write(bad.join("1.mp3"), b"x").unwrap();
        fs::write(good.join("2.mp3"), b"x").unwrap();

        let (walker, marks, _) = walker(temp.path());
        marks.mark(&bad);
        let (tx, rx) = bounded(10);
        walker.walk(&tx);

        assert_eq!(names(&rx), vec!["2.mp3"]);
    }

    #[test]
    fn test_cancel_unblocks_full_queue() {
        let temp = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(temp.path().join(format!("{}.mp3", i)), b"x").unwrap();
        }

        let (walker, _, cancel) = walker(temp.path());
        let (tx, rx) = bounded(1);
        let handle = walker.spawn(tx).unwrap();

        // Let the walker fill the queue, then cancel without draining
        std::thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
        let summary = handle.join().unwrap();

        assert!(summary.cancelled);
        assert!(summary.queued <= 1);
        drop(rx);
    }

    #[test]
    fn test_consumer_gone_stops_walker() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.mp3"), b"x").unwrap();

        let (walker, _, _) = walker(temp.path());
        let (tx, rx) = bounded(1);
        drop(rx);
        let summary = walker.walk(&tx);
        assert!(summary.cancelled);
        assert_eq!(summary.queued, 0);
    }
}
