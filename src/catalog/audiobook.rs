use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::track::TrackInfo;

/// Key the track list is currently sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackOrder {
    Number,
    /// Used once track numbers collide, e.g. two disks both starting at 1
    Chapter,
}

impl TrackOrder {
    fn compare(self, a: &TrackInfo, b: &TrackInfo) -> Ordering {
        match self {
            TrackOrder::Number => a.num.cmp(&b.num),
            TrackOrder::Chapter => a.chapter_str().cmp(b.chapter_str()),
        }
    }
}

/// All tracks of one (author, title) pair plus its saved playback cursor
#[derive(Debug, Clone)]
pub struct Audiobook {
    author: String,
    title: String,
    tracks: Vec<TrackInfo>,
    order: TrackOrder,
    invalid: bool,
    current_track: usize,
    current_position_ms: i64,
    cover_art: Option<PathBuf>,
}

impl Audiobook {
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            tracks: Vec::new(),
            order: TrackOrder::Number,
            invalid: false,
            current_track: 0,
            current_position_ms: 0,
            cover_art: None,
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    pub fn first_track(&self) -> Option<&TrackInfo> {
        self.tracks.first()
    }

    pub fn multiple_disks(&self) -> bool {
        self.order == TrackOrder::Chapter
    }

    /// Insert a track, keeping the set ordered and unique on the active key.
    ///
    /// The first duplicate track number switches ordering to chapter titles;
    /// any duplicate after that invalidates the book for good. Returns whether
    /// the book is still usable.
    pub fn add_track(&mut self, track: TrackInfo) -> bool {
        if self.invalid {
            return false;
        }

        if self.insert_unique(track.clone()) {
            return true;
        }

        if self.multiple_disks() {
            self.invalid = true;
            return false;
        }

        self.order = TrackOrder::Chapter;
        let existing = std::mem::take(&mut self.tracks);
        for t in existing {
            if !self.insert_unique(t) {
                self.invalid = true;
            }
        }
        if !self.insert_unique(track) {
            self.invalid = true;
        }
        !self.invalid
    }

    fn insert_unique(&mut self, track: TrackInfo) -> bool {
        let order = self.order;
        match self
            .tracks
            .binary_search_by(|probe| order.compare(probe, &track))
        {
            Ok(_) => false,
            Err(idx) => {
                self.tracks.insert(idx, track);
                true
            }
        }
    }

    /// Renumber chapter-ordered tracks 1..=n so persisted numbers are unique
    pub fn sanitize(&mut self) {
        if self.multiple_disks() {
            for (i, track) in self.tracks.iter_mut().enumerate() {
                track.num = i as i32 + 1;
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid && !self.tracks.is_empty()
    }

    pub fn current_track(&self) -> usize {
        self.current_track
    }

    pub fn set_current_track(&mut self, track: usize) {
        self.current_track = track;
    }

    pub fn current_position_ms(&self) -> i64 {
        self.current_position_ms
    }

    pub fn set_current_position_ms(&mut self, position_ms: i64) {
        self.current_position_ms = position_ms;
    }

    /// Cover art file, only if it is still on disk
    pub fn cover_art(&self) -> Option<&Path> {
        self.cover_art.as_deref().filter(|p| p.exists())
    }

    pub fn set_cover_art(&mut self, path: Option<PathBuf>) {
        self.cover_art = path;
    }

    /// Sum of all track lengths in milliseconds
    pub fn total_length_ms(&self) -> i64 {
        self.tracks.iter().map(|t| t.length_ms.max(0)).sum()
    }

    /// Same book under a different author and title
    pub fn renamed(mut self, author: impl Into<String>, title: impl Into<String>) -> Self {
        self.author = author.into();
        self.title = title.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(num: i32, chapter: &str) -> TrackInfo {
        TrackInfo {
            num,
            length_ms: 1000,
            author: Some("Author".to_string()),
            title: Some("Book".to_string()),
            chapter: Some(chapter.to_string()),
            ..TrackInfo::new(PathBuf::from(format!("/books/{}.mp3", chapter)), None)
        }
    }

    fn nums(book: &Audiobook) -> Vec<i32> {
        book.tracks().iter().map(|t| t.num).collect()
    }

    fn chapters(book: &Audiobook) -> Vec<&str> {
        book.tracks().iter().map(|t| t.chapter_str()).collect()
    }

    #[test]
    fn test_tracks_sorted_by_number() {
        let mut book = Audiobook::new("Author", "Book");
        assert!(book.add_track(track(3, "c")));
        assert!(book.add_track(track(1, "z")));
        assert!(book.add_track(track(2, "a")));

        assert_eq!(nums(&book), vec![1, 2, 3]);
        assert!(!book.multiple_disks());
        assert!(book.is_valid());
    }

    #[test]
    fn test_duplicate_number_switches_to_chapter_order() {
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track(1, "Disc 1 - 01"));
        book.add_track(track(2, "Disc 1 - 02"));
        assert!(!book.multiple_disks());

        assert!(book.add_track(track(1, "Disc 2 - 01")));
        assert!(book.multiple_disks());
        assert!(book.is_valid());
        assert_eq!(
            chapters(&book),
            vec!["Disc 1 - 01", "Disc 1 - 02", "Disc 2 - 01"]
        );
    }

    #[test]
    fn test_second_collision_invalidates() {
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track(1, "a"));
        book.add_track(track(2, "b"));
        book.add_track(track(1, "c"));
        assert!(book.is_valid());

        assert!(!book.add_track(track(2, "b")));
        assert!(!book.is_valid());

        // Stays invalid no matter what comes next
        assert!(!book.add_track(track(9, "z")));
        assert_eq!(book.tracks().len(), 3);
    }

    #[test]
    fn test_fallback_with_duplicate_chapters_is_invalid() {
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track(1, "same"));
        book.add_track(track(2, "same"));
        assert!(book.is_valid());

        assert!(!book.add_track(track(1, "other")));
        assert!(!book.is_valid());
    }

    #[test]
    fn test_sanitize_renumbers_only_multi_disk() {
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track(5, "b"));
        book.add_track(track(9, "a"));
        book.sanitize();
        assert_eq!(nums(&book), vec![5, 9]);

        book.add_track(track(5, "c"));
        book.sanitize();
        assert_eq!(chapters(&book), vec!["a", "b", "c"]);
        assert_eq!(nums(&book), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_book_is_invalid() {
        let book = Audiobook::new("Author", "Book");
        assert!(!book.is_valid());
        assert!(book.first_track().is_none());
    }

    #[test]
    fn test_total_length_ignores_unknown() {
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track(1, "a"));
        let mut unknown = track(2, "b");
        unknown.length_ms = -1;
        book.add_track(unknown);
        assert_eq!(book.total_length_ms(), 1000);
    }

    #[test]
    fn test_cover_art_hidden_when_missing() {
        let mut book = Audiobook::new("Author", "Book");
        book.set_cover_art(Some(PathBuf::from("/nonexistent/cover.jpg")));
        assert!(book.cover_art().is_none());
    }
}
