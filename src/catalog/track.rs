use std::path::{Path, PathBuf};

/// Track number or length that has not been determined yet
pub const UNKNOWN: i32 = -1;

/// One physical audio file of an audiobook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track number, `UNKNOWN` until a tag or the file name supplies one
    pub num: i32,
    /// Decoded length in milliseconds, negative when unknown
    pub length_ms: i64,
    pub author: Option<String>,
    /// Album title, which is the audiobook title
    pub title: Option<String>,
    /// Title of this single track
    pub chapter: Option<String>,
    /// Source locator, stored verbatim in `trackinfo.json`
    pub uri: Option<PathBuf>,
    /// Directory the file was found in
    pub dir: Option<PathBuf>,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            num: UNKNOWN,
            length_ms: UNKNOWN as i64,
            author: None,
            title: None,
            chapter: None,
            uri: None,
            dir: None,
        }
    }
}

impl TrackInfo {
    pub fn new(uri: PathBuf, dir: Option<PathBuf>) -> Self {
        Self {
            uri: Some(uri),
            dir,
            ..Self::default()
        }
    }

    /// True when any tag the catalog is keyed on is missing
    pub fn needs_guess(&self) -> bool {
        self.num <= 0
            || is_blank(self.chapter.as_deref())
            || is_blank(self.title.as_deref())
            || is_blank(self.author.as_deref())
    }

    /// All string fields present and the track number known
    pub fn has_required_fields(&self) -> bool {
        self.num >= 0
            && !is_blank(self.chapter.as_deref())
            && !is_blank(self.title.as_deref())
            && !is_blank(self.author.as_deref())
    }

    pub fn has_length(&self) -> bool {
        self.length_ms >= 0
    }

    /// Locator still points at something on disk
    pub fn is_resolvable(&self) -> bool {
        self.uri.as_deref().is_some_and(Path::exists)
    }

    pub fn author_str(&self) -> &str {
        self.author.as_deref().unwrap_or_default()
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn chapter_str(&self) -> &str {
        self.chapter.as_deref().unwrap_or_default()
    }

    /// Directory the track lives in, falling back to the locator's parent
    pub fn containing_dir(&self) -> Option<&Path> {
        self.dir
            .as_deref()
            .or_else(|| self.uri.as_deref().and_then(Path::parent))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}
