use std::cell::Cell;

use crate::catalog::Audiobook;

/// Playback cursor over one book: a track index and an offset into that track
#[derive(Debug, Clone)]
pub struct PlaybackPosition {
    lengths: Vec<i64>,
    total_ms: i64,
    track: usize,
    offset_ms: i64,
    /// (track index, sum of the lengths of all tracks before it)
    elapsed_cache: Cell<Option<(usize, i64)>>,
}

impl PlaybackPosition {
    /// Cursor over tracks with the given lengths, starting at the beginning.
    /// Unknown (negative) lengths count as zero.
    pub fn new(lengths: Vec<i64>) -> Self {
        let lengths: Vec<i64> = lengths.into_iter().map(|l| l.max(0)).collect();
        let total_ms = lengths.iter().sum();
        Self {
            lengths,
            total_ms,
            track: 0,
            offset_ms: 0,
            elapsed_cache: Cell::new(None),
        }
    }

    /// Cursor at the book's saved position, clamped into range
    pub fn from_book(book: &Audiobook) -> Self {
        let mut position = Self::new(book.tracks().iter().map(|t| t.length_ms).collect());
        position.set_track(book.current_track());
        position.set_offset_ms(book.current_position_ms());
        position
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    pub fn track_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn total_length_ms(&self) -> i64 {
        self.total_ms
    }

    pub fn current_track_length_ms(&self) -> i64 {
        self.lengths.get(self.track).copied().unwrap_or(0)
    }

    fn last_track(&self) -> usize {
        self.lengths.len().saturating_sub(1)
    }

    /// Set the offset inside the current track, clamped to its length
    pub fn set_offset_ms(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms.clamp(0, self.current_track_length_ms());
    }

    /// Jump to the start of a track; out-of-range indices are clamped
    pub fn set_track(&mut self, track: usize) {
        self.track = track.min(self.last_track());
        self.offset_ms = 0;
    }

    /// Advance to the next track. At the last track the cursor is pinned to
    /// its end instead and `true` is returned: the book is finished.
    pub fn next_track(&mut self) -> bool {
        if self.track >= self.last_track() {
            self.offset_ms = self.current_track_length_ms();
            return true;
        }
        self.set_track(self.track + 1);
        false
    }

    pub fn previous_track(&mut self) {
        self.set_track(self.track.saturating_sub(1));
    }

    /// Move by `delta_ms`, crossing track boundaries in either direction and
    /// stopping at the very start or the very end of the book
    pub fn seek_relative(&mut self, delta_ms: i64) {
        if self.lengths.is_empty() {
            return;
        }

        let mut track = self.track;
        let mut offset = self.offset_ms.saturating_add(delta_ms);

        while offset < 0 {
            if track == 0 {
                offset = 0;
                break;
            }
            track -= 1;
            offset += self.lengths[track];
        }

        while offset > self.lengths[track] {
            if track == self.last_track() {
                offset = self.lengths[track];
                break;
            }
            offset -= self.lengths[track];
            track += 1;
        }

        self.track = track;
        self.offset_ms = offset;
    }

    /// Jump to a fraction of the current track. Returns `false` and leaves
    /// the cursor alone when `fraction` is outside `[0, 1]`.
    pub fn seek_fraction(&mut self, fraction: f64) -> bool {
        if !(0.0..=1.0).contains(&fraction) {
            return false;
        }
        self.offset_ms = (fraction * self.current_track_length_ms() as f64).round() as i64;
        true
    }

    /// Milliseconds from the start of the book to the cursor
    pub fn elapsed_ms(&self) -> i64 {
        self.before_current() + self.offset_ms
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed_ms() / 1000
    }

    pub fn remaining_ms(&self) -> i64 {
        (self.total_ms - self.elapsed_ms()).max(0)
    }

    /// Sum of the tracks before the current one, updated from the cached
    /// value for the last track it was computed for
    fn before_current(&self) -> i64 {
        let sum = match self.elapsed_cache.get() {
            Some((track, sum)) if track == self.track => return sum,
            Some((track, sum)) if track < self.track => {
                sum + self.lengths[track..self.track].iter().sum::<i64>()
            }
            Some((track, sum)) => sum - self.lengths[self.track..track].iter().sum::<i64>(),
            None => self.lengths[..self.track].iter().sum(),
        };
        self.elapsed_cache.set(Some((self.track, sum)));
        sum
    }

    /// Cursor as stored by the library: (track index, offset)
    pub fn cursor(&self) -> (usize, i64) {
        (self.track, self.offset_ms)
    }
}
