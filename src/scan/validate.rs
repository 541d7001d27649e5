use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::TrackInfo;
use crate::media::MediaServices;

/// Placeholder for an author or title that can't be determined
pub const UNKNOWN_NAME: &str = "unknown";

/// Accepts, repairs or rejects tracks coming out of tag extraction
#[derive(Clone)]
pub struct TrackValidator {
    media: Arc<dyn MediaServices>,
}

impl TrackValidator {
    pub fn new(media: Arc<dyn MediaServices>) -> Self {
        Self { media }
    }

    /// Fill gaps from the file layout, then accept the track only if it is complete
    pub fn validate(&self, mut track: TrackInfo) -> Option<TrackInfo> {
        if track.needs_guess() {
            guess_track_info(&mut track);
        }
        track.author = track.author.as_deref().map(clean_name);
        track.title = track.title.as_deref().map(clean_name);

        if !track.has_required_fields() || !track.is_resolvable() {
            debug!("Rejecting incomplete track {:?}", track.uri);
            return None;
        }

        if !track.has_length() {
            let uri = track.uri.as_deref()?;
            match self.media.probe_duration_ms(uri) {
                Some(length) if length >= 0 => track.length_ms = length,
                _ => {
                    debug!("Rejecting undecodable track {:?}", uri);
                    return None;
                }
            }
        }

        Some(track)
    }
}

/// Infer missing fields from `<author>/<title>/<NN chapter>.<ext>`.
///
/// Without a usable track number the rest is left alone and the track will
/// fail validation.
pub fn guess_track_info(track: &mut TrackInfo) {
    let Some(uri) = track.uri.clone() else {
        return;
    };

    if track.num < 0 {
        let file_name = uri
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match first_number(&file_name) {
            Some(num) => track.num = num,
            None => return,
        }
    }

    if track.chapter.as_deref().map_or(true, str::is_empty) {
        track.chapter = uri
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty());
    }

    let title_dir = uri.parent();
    let author_dir = title_dir.and_then(Path::parent);

    if track.title.as_deref().map_or(true, str::is_empty) {
        track.title = Some(dir_name(title_dir));
    }
    if track.author.as_deref().map_or(true, str::is_empty) {
        track.author = Some(dir_name(author_dir));
    }
}

/// First run of ASCII digits in `name`, if it fits a track number
fn first_number(name: &str) -> Option<i32> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: String = name[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn dir_name(dir: Option<&Path>) -> String {
    dir.and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

/// Author and title become directory names, so they must be single path components
pub fn clean_name(name: &str) -> String {
    let cleaned = name.replace(['/', '\\', '\0'], "-").trim().to_string();
    match cleaned.as_str() {
        "" | "." | ".." => UNKNOWN_NAME.to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct FixedLength(Option<i64>);

    impl MediaServices for FixedLength {
        fn probe_duration_ms(&self, _: &Path) -> Option<i64> {
            self.0
        }

        fn embedded_cover_art(&self, _: &Path) -> Option<Vec<u8>> {
            None
        }
    }

    fn validator(length: Option<i64>) -> TrackValidator {
        TrackValidator::new(Arc::new(FixedLength(length)))
    }

    #[test]
    fn test_guess_from_layout() {
        let mut track = TrackInfo::new(PathBuf::from("/lib/Author/Book/01 - Intro.mp3"), None);
        guess_track_info(&mut track);

        assert_eq!(track.num, 1);
        assert_eq!(track.chapter.as_deref(), Some("01 - Intro"));
        assert_eq!(track.title.as_deref(), Some("Book"));
        assert_eq!(track.author.as_deref(), Some("Author"));
    }

    #[test]
    fn test_guess_keeps_existing_tags() {
        let mut track = TrackInfo::new(PathBuf::from("/lib/Author/Book/07.mp3"), None);
        track.author = Some("Real Author".to_string());
        track.chapter = Some("Seven".to_string());
        guess_track_info(&mut track);

        assert_eq!(track.num, 7);
        assert_eq!(track.author.as_deref(), Some("Real Author"));
        assert_eq!(track.chapter.as_deref(), Some("Seven"));
        assert_eq!(track.title.as_deref(), Some("Book"));
    }

    #[test]
    fn test_guess_without_number_leaves_track_incomplete() {
        let mut track = TrackInfo::new(PathBuf::from("/lib/Author/Book/intro.mp3"), None);
        guess_track_info(&mut track);
        assert_eq!(track.num, -1);
        assert!(track.chapter.is_none());
        assert!(!track.has_required_fields());
    }

    #[test]
    fn test_guess_zero_number_kept() {
        let mut track = TrackInfo::new(PathBuf::from("/lib/Author/Book/05.mp3"), None);
        track.num = 0;
        guess_track_info(&mut track);
        assert_eq!(track.num, 0);
    }

    #[test]
    fn test_guess_falls_back_to_unknown_at_root() {
        let mut track = TrackInfo::new(PathBuf::from("/3.mp3"), None);
        guess_track_info(&mut track);
        assert_eq!(track.num, 3);
        assert_eq!(track.title.as_deref(), Some(UNKNOWN_NAME));
        assert_eq!(track.author.as_deref(), Some(UNKNOWN_NAME));
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("Chapter 12 part 3.mp3"), Some(12));
        assert_eq!(first_number("007.ogg"), Some(7));
        assert_eq!(first_number("intro.mp3"), None);
        assert_eq!(first_number("99999999999999.mp3"), None);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("AC/DC"), "AC-DC");
        assert_eq!(clean_name("  Book  "), "Book");
        assert_eq!(clean_name(".."), UNKNOWN_NAME);
    }

    #[test]
    fn test_validate_probes_missing_length() {
        let temp = tempfile::tempdir().unwrap();
        let book = temp.path().join("Author").join("Book");
        fs::create_dir_all(&book).unwrap();
        let file = book.join("01 - Intro.mp3");
        fs::write(&file, b"x").unwrap();

        let track = validator(Some(4200))
            .validate(TrackInfo::new(file.clone(), Some(book.clone())))
            .unwrap();
        assert_eq!(track.length_ms, 4200);
        assert_eq!(track.num, 1);

        assert!(validator(None)
            .validate(TrackInfo::new(file, Some(book)))
            .is_none());
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        let track = TrackInfo::new(PathBuf::from("/nonexistent/Author/Book/01.mp3"), None);
        assert!(validator(Some(1)).validate(track).is_none());
    }

    #[test]
    fn test_validate_keeps_tagged_length() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("track.mp3");
        fs::write(&file, b"x").unwrap();

        let mut track = TrackInfo::new(file, None);
        track.num = 2;
        track.length_ms = 900;
        track.author = Some("A".to_string());
        track.title = Some("T".to_string());
        track.chapter = Some("C".to_string());

        let accepted = validator(None).validate(track).unwrap();
        assert_eq!(accepted.length_ms, 900);
    }
}
