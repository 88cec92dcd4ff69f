//! Monotonic time source
//!
//! All expiry and idle-timeout bookkeeping uses milliseconds from a
//! process-wide monotonic anchor, so values are comparable across the
//! store, the timer queue, and the event loop.

use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since the first call in this process.
pub fn monotonic_ms() -> u64 {
    ANCHOR.get_or_init(Instant::now).elapsed().as_millis() as u64
}
