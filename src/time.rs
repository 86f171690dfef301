use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Converts an epoch-millisecond value into an absolute time.
///
/// The conversion is exact: every millisecond survives, nothing below it exists.
pub fn unix_millis(ms: i64) -> SystemTime {
    let offset = Duration::from_millis(ms.unsigned_abs());
    if ms >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

// Maps a wall-clock deadline onto the tokio clock. Deadlines already in the
// past resolve to "now" so timers fire immediately.
pub(crate) fn deadline_instant(deadline: SystemTime) -> Instant {
    let remaining = deadline
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Instant::now() + remaining
}
