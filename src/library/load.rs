use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info, warn};

use crate::catalog::{self, Catalog};

use super::persist;

/// One `<author>/<title>` directory to read
#[derive(Debug)]
struct LoadJob {
    author: String,
    title: String,
    dir: PathBuf,
}

/// State shared by the loader workers
#[derive(Default)]
struct Shared {
    catalog: Mutex<Catalog>,
    doomed: Mutex<Vec<(String, String)>>,
}

/// Read every book under `data_dir` with a pool of `workers` threads.
///
/// Books that fail to load are deleted once every worker has finished. When
/// `cancel` is raised, workers stop taking jobs and whatever was loaded so
/// far is returned.
pub fn load_catalog(data_dir: &Path, workers: usize, cancel: &AtomicBool) -> Catalog {
    let jobs = collect_jobs(data_dir);
    let total = jobs.len();
    if total == 0 {
        return Catalog::new();
    }

    let (tx, rx) = unbounded();
    for job in jobs {
        // The receiver is alive, so this can't fail
        let _ = tx.send(job);
    }
    drop(tx);

    let shared = Shared::default();
    let workers = workers.clamp(1, total);

    thread::scope(|s| {
        let mut started = 0;
        for i in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("library-loader-{}", i))
                .spawn_scoped(s, || load_worker(&rx, &shared, cancel));
            match spawned {
                Ok(_) => started += 1,
                Err(e) => warn!("Failed to start loader thread: {}", e),
            }
        }
        if started == 0 {
            load_worker(&rx, &shared, cancel);
        }
    });

    let catalog = shared
        .catalog
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    let doomed = shared
        .doomed
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);

    for (author, title) in &doomed {
        warn!("Deleting unreadable book {} / {}", author, title);
        if let Err(e) = persist::remove_book_dir(data_dir, author, title) {
            warn!("{}", e);
        }
    }

    info!(
        "Loaded {} books from {:?} ({} removed)",
        catalog::book_count(&catalog),
        data_dir,
        doomed.len()
    );
    catalog
}

fn load_worker(jobs: &Receiver<LoadJob>, shared: &Shared, cancel: &AtomicBool) {
    for job in jobs.iter() {
        if cancel.load(Ordering::Relaxed) {
            debug!("Library load cancelled");
            return;
        }

        match persist::read_book(&job.dir, &job.author, &job.title) {
            Ok(Some(book)) => {
                let mut catalog = shared
                    .catalog
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                *catalog::book_entry(&mut catalog, &job.author, &job.title) = book;
            }
            Ok(None) => push_doomed(shared, job),
            Err(e) => {
                warn!("Failed to load {:?}: {}", job.dir, e);
                push_doomed(shared, job);
            }
        }
    }
}

fn push_doomed(shared: &Shared, job: LoadJob) {
    shared
        .doomed
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((job.author, job.title));
}

/// Every `<author>/<title>` directory directly under `data_dir`
fn collect_jobs(data_dir: &Path) -> Vec<LoadJob> {
    let mut jobs = Vec::new();
    for author_dir in sub_dirs(data_dir) {
        let Some(author) = dir_name(&author_dir) else {
            continue;
        };
        for dir in sub_dirs(&author_dir) {
            if let Some(title) = dir_name(&dir) {
                jobs.push(LoadJob {
                    author: author.clone(),
                    title,
                    dir,
                });
            }
        }
    }
    jobs
}

fn sub_dirs(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Nothing to load from {:?}: {}", dir, e);
            return Vec::new();
        }
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Audiobook, TrackInfo};

    fn write_book(data: &Path, media: &Path, author: &str, title: &str, tracks: usize) {
        let mut book = Audiobook::new(author, title);
        for n in 1..=tracks {
            let uri = media.join(format!("{}-{}-{}.mp3", author, title, n));
            fs::write(&uri, b"x").unwrap();
            let mut track = TrackInfo::new(uri, None);
            track.num = n as i32;
            track.length_ms = 100;
            track.chapter = Some(format!("Chapter {}", n));
            book.add_track(track);
        }
        persist::write_book(data, &book).unwrap();
    }

    #[test]
    fn test_loads_all_books_concurrently() {
        let temp = tempfile::tempdir().unwrap();
        let data = temp.path().join("data");
        for a in 0..3 {
            for t in 0..4 {
                write_book(&data, temp.path(), &format!("A{}", a), &format!("T{}", t), 2);
            }
        }

        let catalog = load_catalog(&data, 6, &AtomicBool::new(false));
        assert_eq!(catalog::book_count(&catalog), 12);
        assert_eq!(catalog["A1"]["T3"].tracks().len(), 2);
        assert_eq!(catalog["A1"]["T3"].author(), "A1");
    }

    #[test]
    fn test_corrupt_books_are_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let data = temp.path().join("data");
        write_book(&data, temp.path(), "Good", "Book", 1);
        write_book(&data, temp.path(), "Bad", "Json", 1);
        write_book(&data, temp.path(), "Gone", "Tracks", 1);

        fs::write(data.join("Bad/Json").join(persist::TRACKS_FILE_NAME), "[").unwrap();
        fs::remove_file(temp.path().join("Gone-Tracks-1.mp3")).unwrap();
        fs::create_dir_all(data.join("Empty/Dir")).unwrap();

        let catalog = load_catalog(&data, 2, &AtomicBool::new(false));
        assert_eq!(catalog::book_count(&catalog), 1);
        assert!(catalog["Good"].contains_key("Book"));
        assert!(!data.join("Bad").exists());
        assert!(!data.join("Gone").exists());
        assert!(!data.join("Empty").exists());
        assert!(data.join("Good/Book").exists());
    }

    #[test]
    fn test_cancelled_load_returns_partial_catalog() {
        let temp = tempfile::tempdir().unwrap();
        let data = temp.path().join("data");
        write_book(&data, temp.path(), "A", "B", 1);

        let catalog = load_catalog(&data, 1, &AtomicBool::new(true));
        assert!(catalog.is_empty());
        assert!(data.join("A/B").exists());
    }

    #[test]
    fn test_missing_data_dir_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = load_catalog(&temp.path().join("nope"), 6, &AtomicBool::new(false));
        assert!(catalog.is_empty());
    }
}
