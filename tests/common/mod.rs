#![allow(dead_code)]

use std::fs;
use std::io::{BufRead, Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use audioshelf::error::ExtractError;
use audioshelf::extract::protocol::{decode_request, SENTINEL};
use audioshelf::extract::{BatchSettings, DecoderChannel};
use audioshelf::media::MediaServices;
use audioshelf::scan::ScanSettings;

/// Length reported for files without a LENGTH tag
pub const PROBED_LENGTH_MS: i64 = 60_000;

/// In-process decoder: the "tags" of each file are its text content,
/// already in response-line form (`ARTIST=..|*|TRACK=..`)
#[derive(Clone, Default)]
pub struct FileTagDecoder {
    pub requests: Arc<Mutex<Vec<String>>>,
    last: Option<String>,
    /// Fail every request once this many have been sent
    pub fail_after: Option<usize>,
}

impl FileTagDecoder {
    pub fn failing_after(requests: usize) -> Self {
        Self {
            fail_after: Some(requests),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl DecoderChannel for FileTagDecoder {
    fn send_request(&mut self, line: &str) -> Result<(), ExtractError> {
        let mut requests = self.requests.lock().unwrap();
        if self.fail_after.is_some_and(|n| requests.len() >= n) {
            return Err(ExtractError::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "decoder went away",
            )));
        }
        requests.push(line.to_string());
        self.last = Some(line.to_string());
        Ok(())
    }

    fn open_responses(&mut self) -> Result<Box<dyn BufRead + Send>, ExtractError> {
        let (fds, _) = decode_request(self.last.as_deref().unwrap_or(SENTINEL));
        let mut out = String::new();
        for fd in fds {
            let path = fs::read_link(format!("/proc/self/fd/{}", fd))?;
            let tags = fs::read_to_string(&path).unwrap_or_default();
            out.push_str(&format!("FD={}|*|{}\n", fd, tags.trim()));
        }
        out.push_str(SENTINEL);
        out.push('\n');
        Ok(Box::new(Cursor::new(out)))
    }
}

/// Media services that never touch real audio
pub struct FakeMedia;

impl MediaServices for FakeMedia {
    fn probe_duration_ms(&self, _: &Path) -> Option<i64> {
        Some(PROBED_LENGTH_MS)
    }

    fn embedded_cover_art(&self, _: &Path) -> Option<Vec<u8>> {
        None
    }
}

/// Write a fake audio file whose content is its tag line
pub fn write_track(root: &Path, relative: &str, tags: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, tags).unwrap();
    path
}

pub fn fast_settings(threshold: usize) -> ScanSettings {
    ScanSettings {
        batch: BatchSettings {
            threshold,
            poll_interval: Duration::from_millis(20),
        },
        ..ScanSettings::default()
    }
}
