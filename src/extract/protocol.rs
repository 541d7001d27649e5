//! Line framing for the tag decoder pipe.
//!
//! Requests are comma-separated descriptor numbers, with `~` appended to the
//! final one. Each response line carries `KEY=VALUE` fields joined by `|*|`,
//! and a bare `~` line ends the responses for a request.

use std::os::unix::io::RawFd;
use std::path::PathBuf;

use tracing::warn;

use crate::catalog::TrackInfo;

/// End-of-stream marker in both directions
pub const SENTINEL: &str = "~";

/// Separator between fields of a response line
pub const FIELD_SEPARATOR: &str = "|*|";

/// Build a request line (without the trailing newline)
pub fn encode_request(fds: &[RawFd], last: bool) -> String {
    let mut line = fds
        .iter()
        .map(|fd| fd.to_string())
        .collect::<Vec<_>>()
        .join(",");
    if last {
        line.push_str(SENTINEL);
    }
    line
}

/// Parse a request line back into descriptors and the final-batch flag
pub fn decode_request(line: &str) -> (Vec<RawFd>, bool) {
    let line = line.trim_end_matches(['\r', '\n']);
    let (body, last) = match line.strip_suffix(SENTINEL) {
        Some(body) => (body, true),
        None => (line, false),
    };
    let fds = body
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    (fds, last)
}

/// Tags reported by the decoder for one descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRecord {
    pub fd: Option<RawFd>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track: Option<i32>,
    pub length_ms: Option<i64>,
}

/// One line read from the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine {
    Record(TagRecord),
    Sentinel,
}

pub fn parse_response_line(line: &str) -> ResponseLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == SENTINEL {
        return ResponseLine::Sentinel;
    }

    let mut record = TagRecord::default();
    for field in line.split(FIELD_SEPARATOR) {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "FD" => record.fd = parse_number(key, value),
            "ARTIST" => record.artist = non_empty(value),
            "ALBUM" => record.album = non_empty(value),
            "TITLE" => record.title = non_empty(value),
            "TRACK" => record.track = parse_track_number(value),
            "LENGTH" => record.length_ms = parse_number(key, value),
            _ => {}
        }
    }
    ResponseLine::Record(record)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring malformed {} value from tag decoder: {:?}", key, value);
            None
        }
    }
}

/// Track tags are often written as `3/12`; only the part before `/` counts
fn parse_track_number(value: &str) -> Option<i32> {
    let number = value.split('/').next().unwrap_or(value);
    parse_number("TRACK", number)
}

impl TagRecord {
    /// Encode as a response line, the way the decoder writes it
    pub fn to_line(&self) -> String {
        let mut fields = Vec::new();
        if let Some(fd) = self.fd {
            fields.push(format!("FD={}", fd));
        }
        if let Some(artist) = &self.artist {
            fields.push(format!("ARTIST={}", artist));
        }
        if let Some(album) = &self.album {
            fields.push(format!("ALBUM={}", album));
        }
        if let Some(title) = &self.title {
            fields.push(format!("TITLE={}", title));
        }
        if let Some(track) = self.track {
            fields.push(format!("TRACK={}", track));
        }
        if let Some(length) = self.length_ms {
            fields.push(format!("LENGTH={}", length));
        }
        fields.join(FIELD_SEPARATOR)
    }

    /// Turn the tags into a track for the file the descriptor belongs to
    pub fn into_track(self, locator: PathBuf, dir: PathBuf) -> TrackInfo {
        let mut track = TrackInfo::new(locator, Some(dir));
        track.author = self.artist;
        track.title = self.album;
        track.chapter = self.title;
        if let Some(num) = self.track {
            track.num = num;
        }
        if let Some(length) = self.length_ms {
            track.length_ms = length;
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request() {
        assert_eq!(encode_request(&[3, 4, 5], false), "3,4,5");
        assert_eq!(encode_request(&[3, 4, 5], true), "3,4,5~");
        assert_eq!(encode_request(&[], true), "~");
        assert_eq!(encode_request(&[], false), "");
    }

    #[test]
    fn test_decode_request() {
        assert_eq!(decode_request("3,4,5\n"), (vec![3, 4, 5], false));
        assert_eq!(decode_request("7~"), (vec![7], true));
        assert_eq!(decode_request("~"), (vec![], true));
    }

    #[test]
    fn test_parse_full_record_any_order() {
        let line = "TITLE=Chapter One|*|FD=12|*|ALBUM=The Book|*|ARTIST=Jane Doe|*|LENGTH=61000|*|TRACK=1";
        let ResponseLine::Record(record) = parse_response_line(line) else {
            panic!("expected record");
        };
        assert_eq!(record.fd, Some(12));
        assert_eq!(record.artist.as_deref(), Some("Jane Doe"));
        assert_eq!(record.album.as_deref(), Some("The Book"));
        assert_eq!(record.title.as_deref(), Some("Chapter One"));
        assert_eq!(record.track, Some(1));
        assert_eq!(record.length_ms, Some(61000));
    }

    #[test]
    fn test_parse_partial_and_malformed() {
        let ResponseLine::Record(record) =
            parse_response_line("FD=4|*|ARTIST=|*|TRACK=3/12|*|LENGTH=abc")
        else {
            panic!("expected record");
        };
        assert_eq!(record.fd, Some(4));
        assert_eq!(record.artist, None);
        assert_eq!(record.track, Some(3));
        assert_eq!(record.length_ms, None);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let ResponseLine::Record(record) = parse_response_line("FD=1|*|TITLE=a=b") else {
            panic!("expected record");
        };
        assert_eq!(record.title.as_deref(), Some("a=b"));
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(parse_response_line("~"), ResponseLine::Sentinel);
        assert_eq!(parse_response_line("~\n"), ResponseLine::Sentinel);
    }

    #[test]
    fn test_record_line_parses_back() {
        let record = TagRecord {
            fd: Some(9),
            artist: Some("A".to_string()),
            album: None,
            title: Some("T".to_string()),
            track: Some(2),
            length_ms: Some(5),
        };
        assert_eq!(
            parse_response_line(&record.to_line()),
            ResponseLine::Record(record)
        );
    }

    #[test]
    fn test_into_track_maps_fields() {
        let record = TagRecord {
            fd: Some(9),
            artist: Some("Author".to_string()),
            album: Some("Book".to_string()),
            title: Some("Intro".to_string()),
            track: Some(1),
            length_ms: None,
        };
        let track = record.into_track(PathBuf::from("/b/1.mp3"), PathBuf::from("/b"));
        assert_eq!(track.author.as_deref(), Some("Author"));
        assert_eq!(track.title.as_deref(), Some("Book"));
        assert_eq!(track.chapter.as_deref(), Some("Intro"));
        assert_eq!(track.num, 1);
        assert!(!track.has_length());
    }
}
