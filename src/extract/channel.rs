use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, warn};

use crate::error::ExtractError;

use super::process::DecoderWatch;

/// How often to look for the decoder's pipe while waiting for it
const FIFO_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Attempts at waking a blocked open before leaving the helper thread behind
const RELEASE_ATTEMPTS: usize = 20;

/// Transport to the tag decoder: one request out, a stream of lines back
pub trait DecoderChannel: Send {
    /// Deliver one request line; the implementation adds the newline
    fn send_request(&mut self, line: &str) -> Result<(), ExtractError>;

    /// Open the stream carrying the responses to the last request
    fn open_responses(&mut self) -> Result<Box<dyn BufRead + Send>, ExtractError>;
}

/// Which end of the pipe we open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Read,
    Write,
}

impl End {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            End::Read => options.read(true),
            End::Write => options.write(true),
        };
        options
    }
}

/// Named pipe shared with the decoder process, used in both directions
#[derive(Debug)]
pub struct FifoChannel {
    path: PathBuf,
    timeout: Duration,
    watch: Option<DecoderWatch>,
}

impl FifoChannel {
    /// Wait for the decoder to create its pipe, giving up after `timeout`.
    ///
    /// The same timeout later bounds every wait for the decoder to open its
    /// end of the pipe.
    pub fn connect(path: &Path, timeout: Duration) -> Result<Self, ExtractError> {
        let deadline = Instant::now() + timeout;
        loop {
            match std::fs::metadata(path) {
                Ok(meta) if meta.file_type().is_fifo() => break,
                Ok(_) => return Err(ExtractError::NotAFifo(path.to_path_buf())),
                Err(_) if Instant::now() < deadline => thread::sleep(FIFO_CHECK_INTERVAL),
                Err(_) => {
                    return Err(ExtractError::FifoTimeout {
                        path: path.to_path_buf(),
                        timeout,
                    })
                }
            }
        }

        debug!("Connected to tag decoder pipe {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            timeout,
            watch: None,
        })
    }

    /// Stop waiting on the pipe as soon as this decoder exits
    pub fn watching(mut self, watch: DecoderWatch) -> Self {
        self.watch = Some(watch);
        self
    }

    fn decoder_gone(&self) -> bool {
        self.watch.as_ref().is_some_and(DecoderWatch::has_exited)
    }

    fn open_err(&self, source: std::io::Error) -> ExtractError {
        ExtractError::FifoOpen {
            path: self.path.clone(),
            source,
        }
    }

    /// Open one end of the pipe.
    ///
    /// Opening a FIFO blocks until the other side opens it too, so the open
    /// runs on a helper thread while this one watches the decoder and the
    /// deadline.
    fn open_end(&self, end: End) -> Result<File, ExtractError> {
        let path = self.path.clone();
        let (tx, rx) = bounded(1);
        let opener = thread::Builder::new()
            .name("fifo-open".to_string())
            .spawn(move || {
                let _ = tx.send(end.options().open(&path));
            })?;

        let deadline = Instant::now() + self.timeout;
        let failure = loop {
            match rx.recv_timeout(FIFO_CHECK_INTERVAL) {
                Ok(result) => {
                    opener.join().map_err(|_| ExtractError::ThreadPanicked)?;
                    return result.map_err(|e| self.open_err(e));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(ExtractError::ThreadPanicked),
                Err(RecvTimeoutError::Timeout) if self.decoder_gone() => {
                    break ExtractError::DecoderGone;
                }
                Err(RecvTimeoutError::Timeout) if Instant::now() >= deadline => {
                    break ExtractError::FifoStalled {
                        path: self.path.clone(),
                        timeout: self.timeout,
                    };
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        };
        warn!("Giving up on {:?} end of {:?}: {}", end, self.path, failure);

        // A read-write open never blocks and counts as the missing partner,
        // which lets the helper's open return
        for _ in 0..RELEASE_ATTEMPTS {
            let partner = OpenOptions::new().read(true).write(true).open(&self.path);
            if let Err(e) = &partner {
                debug!("Could not open {:?} to release helper: {}", self.path, e);
            }
            match rx.recv_timeout(FIFO_CHECK_INTERVAL) {
                Ok(_) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = opener.join();
                    return Err(failure);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        warn!("Leaving blocked open of {:?} behind", self.path);
        Err(failure)
    }
}

impl DecoderChannel for FifoChannel {
    fn send_request(&mut self, line: &str) -> Result<(), ExtractError> {
        // Closing the write end tells the decoder the request is complete
        let mut pipe = self.open_end(End::Write)?;
        pipe.write_all(line.as_bytes())?;
        pipe.write_all(b"\n")?;
        pipe.flush()?;
        Ok(())
    }

    fn open_responses(&mut self) -> Result<Box<dyn BufRead + Send>, ExtractError> {
        let pipe = self.open_end(End::Read)?;
        Ok(Box::new(BufReader::new(pipe)))
    }
}
