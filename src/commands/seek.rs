use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use std::time::Duration;

use audioshelf::playback::format;
use audioshelf::playback::PlaybackPosition;

use super::Context;

/// Where to move the playback cursor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Relative jump in milliseconds
    By(i64),
    /// Fraction of the current track
    Fraction(f64),
    /// Start of a track, 1-based
    Track(usize),
    Next,
    Previous,
    /// Short rewind after a pause of this many seconds
    Resume(u64),
}

impl SeekTarget {
    pub fn from_args(
        by: Option<i64>,
        fraction: Option<f64>,
        track: Option<usize>,
        next: bool,
        previous: bool,
        resume: Option<u64>,
    ) -> Result<Self> {
        let targets: Vec<SeekTarget> = [
            by.map(SeekTarget::By),
            fraction.map(SeekTarget::Fraction),
            track.map(SeekTarget::Track),
            next.then_some(SeekTarget::Next),
            previous.then_some(SeekTarget::Previous),
            resume.map(SeekTarget::Resume),
        ]
        .into_iter()
        .flatten()
        .collect();

        match targets.as_slice() {
            [target] => Ok(*target),
            _ => bail!("Specify exactly one seek target"),
        }
    }

    /// Move the cursor; returns true when it ran off the end of the book
    fn apply(self, position: &mut PlaybackPosition) -> Result<bool> {
        match self {
            SeekTarget::By(ms) => position.seek_relative(ms),
            SeekTarget::Fraction(p) => {
                if !position.seek_fraction(p) {
                    bail!("Fraction must be between 0 and 1, got {}", p);
                }
            }
            SeekTarget::Track(0) => bail!("Tracks are numbered from 1"),
            SeekTarget::Track(n) => position.set_track(n - 1),
            SeekTarget::Next => return Ok(position.next_track()),
            SeekTarget::Previous => position.previous_track(),
            SeekTarget::Resume(secs) => {
                let rewind = format::resume_rewind_ms(Duration::from_secs(secs));
                position.seek_relative(-rewind);
            }
        }
        Ok(false)
    }
}

pub fn run(ctx: &Context, author: &str, title: &str, target: SeekTarget) -> Result<()> {
    let mut store = ctx.open_store()?;
    let Some(book) = store.get(author, title) else {
        bail!("Audiobook not found: {} / {}", author, title);
    };

    let mut position = PlaybackPosition::from_book(book);
    let finished = target.apply(&mut position)?;

    let (track, offset) = position.cursor();
    let changed = store
        .update_position(author, title, track, offset)
        .context("Failed to save position")?;

    let status = if changed {
        "Moved to".green()
    } else {
        "Already at".yellow()
    };
    println!(
        "{} track {}/{} at {} of {}",
        status,
        track + 1,
        position.track_count(),
        format::current_position(&position),
        format::current_track_length(&position)
    );
    if finished {
        println!("{}", "Reached the end of the book".yellow());
    } else if !ctx.quiet {
        println!("{}", format::remaining(&position));
    }
    Ok(())
}
