use std::time::Duration;

use super::position::PlaybackPosition;

/// `1h:2m:3s` style duration, as shown next to a book
pub fn format_hms(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}h:{}m:{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn format_remaining(ms: i64) -> String {
    format!("{} remaining", format_hms(ms))
}

/// Length of the track under the cursor
pub fn current_track_length(position: &PlaybackPosition) -> String {
    format_hms(position.current_track_length_ms())
}

/// Position within the current track
pub fn current_position(position: &PlaybackPosition) -> String {
    format_hms(position.offset_ms())
}

/// Time left in the whole book
pub fn remaining(position: &PlaybackPosition) -> String {
    format_remaining(position.remaining_ms())
}

/// How far to jump back when resuming after a pause, so the listener
/// picks up the thread again
pub fn resume_rewind_ms(paused: Duration) -> i64 {
    match paused.as_secs_f64() {
        s if s > 30.0 => 3000,
        s if s > 20.0 => 2500,
        s if s > 10.0 => 2000,
        s if s > 5.0 => 1200,
        _ => 500,
    }
}
