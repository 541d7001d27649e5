use std::collections::HashMap;
use std::io::BufRead;
use std::os::unix::io::RawFd;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::ExtractError;
use crate::scan::assembler::Assembler;
use crate::scan::validate::TrackValidator;
use crate::scan::walker::{DeletionMarks, ScannedFile};

use super::channel::DecoderChannel;
use super::process::DecoderProcess;
use super::protocol::{self, ResponseLine, SENTINEL};

/// Response lines buffered between the reader thread and the coordinator
const RESPONSE_BUFFER: usize = 64;

/// When to hand queued files to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Send as soon as this many files are pending
    pub threshold: usize,
    /// How long to wait for more files before checking again
    pub poll_interval: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            threshold: 15,
            poll_interval: Duration::from_millis(300),
        }
    }
}

/// Counters for one extraction pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ExtractStats {
    batches: usize,
    responses: usize,
    accepted: usize,
    rejected: usize,
}

/// Drains scanned files in batches through the tag decoder and assembles books
pub struct TagExtractionCoordinator {
    channel: Box<dyn DecoderChannel>,
    decoder: Option<DecoderProcess>,
    validator: TrackValidator,
    assembler: Assembler,
    settings: BatchSettings,
    stats: ExtractStats,
}

impl TagExtractionCoordinator {
    pub fn new(
        channel: Box<dyn DecoderChannel>,
        decoder: Option<DecoderProcess>,
        validator: TrackValidator,
        marks: DeletionMarks,
        settings: BatchSettings,
    ) -> Self {
        Self {
            channel,
            decoder,
            validator,
            assembler: Assembler::new(marks),
            settings: BatchSettings {
                threshold: settings.threshold.max(1),
                ..settings
            },
            stats: ExtractStats::default(),
        }
    }

    /// Consume the queue until the walker hangs up, then send the final batch.
    ///
    /// Batches go out when the threshold is reached; smaller batches are held
    /// back until the queue disconnects. Any pipe failure aborts the pass and
    /// stops the decoder.
    pub fn run(mut self, queue: Receiver<ScannedFile>) -> Result<Catalog, ExtractError> {
        if let Err(e) = self.drain(queue) {
            if let Some(decoder) = self.decoder.take() {
                warn!("Tag extraction failed, stopping decoder: {}", e);
                decoder.kill();
            }
            return Err(e);
        }

        if let Some(decoder) = self.decoder.take() {
            decoder.join()?;
        }

        let stats = self.stats;
        info!(
            "Extracted tags in {} batches: {} accepted, {} rejected",
            stats.batches, stats.accepted, stats.rejected
        );
        Ok(self.assembler.finish())
    }

    fn drain(&mut self, queue: Receiver<ScannedFile>) -> Result<(), ExtractError> {
        let mut pending = Vec::with_capacity(self.settings.threshold);

        loop {
            match queue.recv_timeout(self.settings.poll_interval) {
                Ok(file) => {
                    pending.push(file);
                    if pending.len() >= self.settings.threshold {
                        self.run_batch(std::mem::take(&mut pending), false)?;
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.check_decoder()?,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.run_batch(pending, true)
    }

    fn check_decoder(&self) -> Result<(), ExtractError> {
        match &self.decoder {
            Some(decoder) if decoder.has_exited() => Err(ExtractError::DecoderGone),
            _ => Ok(()),
        }
    }

    /// One request/response round trip; the batch's files stay open until it is done
    fn run_batch(&mut self, files: Vec<ScannedFile>, last: bool) -> Result<(), ExtractError> {
        self.check_decoder()?;

        let table: HashMap<RawFd, ScannedFile> = files.into_iter().map(|f| (f.fd, f)).collect();
        let mut fds: Vec<RawFd> = table.keys().copied().collect();
        fds.sort_unstable();

        let request = protocol::encode_request(&fds, last);
        self.channel.send_request(&request)?;
        debug!("Sent batch of {} descriptors (final: {})", fds.len(), last);

        // Nothing to answer for a bare final sentinel
        if fds.is_empty() {
            return Ok(());
        }

        let responses = self.channel.open_responses()?;
        let (tx, rx) = bounded(RESPONSE_BUFFER);
        let reader = thread::Builder::new()
            .name("tag-reader".to_string())
            .spawn(move || read_responses(responses, tx))?;

        let outcome = self.consume(&rx, &table);
        drop(rx);
        reader.join().map_err(|_| ExtractError::ThreadPanicked)?;
        outcome?;

        self.stats.batches += 1;
        debug!("Closing {} handles", table.len());
        drop(table);
        Ok(())
    }

    fn consume(
        &mut self,
        rx: &Receiver<std::io::Result<String>>,
        table: &HashMap<RawFd, ScannedFile>,
    ) -> Result<(), ExtractError> {
        for line in rx.iter() {
            let record = match protocol::parse_response_line(&line?) {
                ResponseLine::Record(record) => record,
                ResponseLine::Sentinel => break,
            };
            self.stats.responses += 1;

            let Some(file) = record.fd.and_then(|fd| table.get(&fd)) else {
                warn!("Tag decoder answered for unknown descriptor {:?}", record.fd);
                continue;
            };

            let track = record.into_track(file.locator.clone(), file.dir.clone());
            match self.validator.validate(track) {
                Some(track) => {
                    self.stats.accepted += 1;
                    self.assembler.insert(track);
                }
                None => {
                    self.stats.rejected += 1;
                    debug!("Rejected {:?}", file.locator);
                }
            }
        }
        Ok(())
    }
}

/// Forward response lines until the sentinel or end of stream
fn read_responses(responses: Box<dyn BufRead + Send>, tx: Sender<std::io::Result<String>>) {
    for line in responses.lines() {
        match line {
            Ok(line) if line.trim_end() == SENTINEL => return,
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                if tx.send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}
