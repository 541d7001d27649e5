use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ExtractError;

/// How often the watcher thread checks on the decoder
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Read-only view of whether the decoder is still running
#[derive(Debug, Clone)]
pub struct DecoderWatch(Arc<AtomicBool>);

impl DecoderWatch {
    pub fn has_exited(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The external tag decoder, launched once and watched by its own thread
pub struct DecoderProcess {
    program: String,
    pid: u32,
    exited: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<std::io::Result<ExitStatus>>>,
}

impl DecoderProcess {
    /// Start `command`, passing `pipe=<fifo>` as its final argument
    pub fn launch(command: &[String], fifo: &Path) -> Result<Self, ExtractError> {
        let (program, args) = command.split_first().ok_or(ExtractError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .arg(format!("pipe={}", fifo.display()))
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ExtractError::Launch {
                program: program.clone(),
                source,
            })?;
        let pid = child.id();
        info!("Started tag decoder {} (pid {})", program, pid);

        let exited = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let exited = Arc::clone(&exited);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("tag-decoder".to_string())
                .spawn(move || watch_child(child, &stop, &exited))?
        };

        Ok(Self {
            program: program.clone(),
            pid,
            exited,
            stop,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> u32 {
        self.pid
    }

    /// True once the decoder process has terminated
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn watch(&self) -> DecoderWatch {
        DecoderWatch(Arc::clone(&self.exited))
    }

    /// Wait for the decoder to exit after the final sentinel
    pub fn join(mut self) -> Result<(), ExtractError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let status = handle.join().map_err(|_| ExtractError::ThreadPanicked)??;
        if status.success() {
            debug!("Tag decoder {} exited cleanly", self.program);
            Ok(())
        } else {
            Err(ExtractError::DecoderFailed(status))
        }
    }

    /// Kill the decoder if it is still running and reap it
    pub fn kill(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if !self.has_exited() {
            warn!("Stopping tag decoder {} (pid {})", self.program, self.pid);
        }
        self.stop.store(true, Ordering::SeqCst);
        match handle.join() {
            Ok(Ok(status)) => debug!("Tag decoder {} ended with {}", self.program, status),
            Ok(Err(e)) => warn!("Failed to reap tag decoder {}: {}", self.program, e),
            Err(_) => warn!("Tag decoder watcher panicked"),
        }
    }
}

impl Drop for DecoderProcess {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Poll the child until it exits on its own or `stop` asks for it to be killed
fn watch_child(
    mut child: Child,
    stop: &AtomicBool,
    exited: &AtomicBool,
) -> std::io::Result<ExitStatus> {
    let result = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) if stop.load(Ordering::SeqCst) => {
                // kill fails only if the child is already gone, which wait reports
                let _ = child.kill();
                break child.wait();
            }
            Ok(None) => thread::sleep(WATCH_INTERVAL),
            Err(e) => break Err(e),
        }
    };
    exited.store(true, Ordering::SeqCst);
    result
}
