//! On-disk format of a book directory:
//!
//! ```text
//! <data_dir>/<author>/<title>/trackinfo.json
//! <data_dir>/<author>/<title>/position
//! <data_dir>/<author>/<title>/cover.jpg
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{Audiobook, TrackInfo};
use crate::error::StoreError;

pub const TRACKS_FILE_NAME: &str = "trackinfo.json";
pub const POSITION_FILE_NAME: &str = "position";
pub const COVER_FILE_NAME: &str = "cover.jpg";

/// Contents of `trackinfo.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFile {
    pub tracks: Vec<TrackRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub num: i32,
    pub length: i64,
    pub chapter: String,
    pub uri: String,
}

impl TrackRecord {
    fn from_track(track: &TrackInfo) -> Self {
        Self {
            num: track.num,
            length: track.length_ms,
            chapter: track.chapter_str().to_string(),
            uri: track
                .uri
                .as_deref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    /// Rebuild the track; author and title come from the book directory
    pub fn into_track(self, author: &str, title: &str) -> TrackInfo {
        let uri = PathBuf::from(self.uri);
        let dir = uri.parent().map(Path::to_path_buf);
        TrackInfo {
            num: self.num,
            length_ms: self.length,
            author: Some(author.to_string()),
            title: Some(title.to_string()),
            chapter: Some(self.chapter),
            uri: Some(uri),
            dir,
        }
    }
}

pub fn book_dir(data_dir: &Path, author: &str, title: &str) -> PathBuf {
    data_dir.join(author).join(title)
}

pub fn write_tracks(dir: &Path, book: &Audiobook) -> Result<(), StoreError> {
    let file = TrackFile {
        tracks: book.tracks().iter().map(TrackRecord::from_track).collect(),
    };
    let path = dir.join(TRACKS_FILE_NAME);
    let content = serde_json::to_string(&file)?;
    fs::write(&path, content).map_err(|e| StoreError::io(&path, e))
}

pub fn read_tracks(dir: &Path) -> Result<TrackFile, StoreError> {
    let path = dir.join(TRACKS_FILE_NAME);
    let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_position(dir: &Path, track: usize, position_ms: i64) -> Result<(), StoreError> {
    let path = dir.join(POSITION_FILE_NAME);
    let content = format!("track={}\nposition={}\n", track, position_ms);
    fs::write(&path, content).map_err(|e| StoreError::io(&path, e))
}

/// Saved (track, offset); a missing file means the book was never played
pub fn read_position(dir: &Path) -> Result<(usize, i64), StoreError> {
    let path = dir.join(POSITION_FILE_NAME);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((0, 0)),
        Err(e) => return Err(StoreError::io(&path, e)),
    };

    let mut track = 0;
    let mut position = 0;
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match (key.trim(), value.trim().parse::<i64>()) {
            ("track", Ok(v)) => track = v.max(0) as usize,
            ("position", Ok(v)) => position = v.max(0),
            (key, Err(_)) => warn!("Ignoring bad {} value in {:?}", key, path),
            _ => {}
        }
    }
    Ok((track, position))
}

/// Write a book's directory with its track list and position
pub fn write_book(data_dir: &Path, book: &Audiobook) -> Result<PathBuf, StoreError> {
    let dir = book_dir(data_dir, book.author(), book.title());
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
    write_tracks(&dir, book)?;
    write_position(&dir, book.current_track(), book.current_position_ms())?;
    Ok(dir)
}

/// Read a book directory back; `None` when the stored tracks are unusable
pub fn read_book(dir: &Path, author: &str, title: &str) -> Result<Option<Audiobook>, StoreError> {
    let file = read_tracks(dir)?;
    let mut book = Audiobook::new(author, title);

    for record in file.tracks {
        let track = record.into_track(author, title);
        if !track.is_resolvable() {
            warn!("Track {:?} of {} / {} is gone", track.uri, author, title);
            return Ok(None);
        }
        if !book.add_track(track) {
            return Ok(None);
        }
    }
    if !book.is_valid() {
        return Ok(None);
    }

    let (track, position) = read_position(dir)?;
    let track = track.min(book.tracks().len() - 1);
    book.set_current_track(track);
    book.set_current_position_ms(position.clamp(0, book.tracks()[track].length_ms.max(0)));

    let cover = dir.join(COVER_FILE_NAME);
    if cover.is_file() {
        book.set_cover_art(Some(cover));
    }
    Ok(Some(book))
}

/// Remove a book directory and its author directory if that is now empty
pub fn remove_book_dir(data_dir: &Path, author: &str, title: &str) -> Result<(), StoreError> {
    let dir = book_dir(data_dir, author, title);
    match fs::remove_dir_all(&dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::io(&dir, e)),
    }
    remove_dir_if_empty(&data_dir.join(author))
}

pub fn remove_dir_if_empty(dir: &Path) -> Result<(), StoreError> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    if entries.next().is_none() {
        fs::remove_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    }
    Ok(())
}
