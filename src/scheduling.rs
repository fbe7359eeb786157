// Scheduling - Per-callback debouncers and request-sequence tokens
// Everything here is driven by explicit `Instant`s from the render loop, so it
// stays single-threaded and deterministic under test.

use std::time::{Duration, Instant};

/// Delay before orbit trails are redrawn after the last slider input.
pub const TRAIL_REDRAW_DELAY: Duration = Duration::from_millis(50);

/// Delay before the center-date NEO lookup runs after the last slider input.
pub const CENTER_LOOKUP_DELAY: Duration = Duration::from_millis(500);

// =============================================================================
// DEBOUNCER
// =============================================================================

/// One pending timer. Scheduling again cancels and restarts it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// REQUEST SEQUENCING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Hands out increasing tokens for one kind of fetch. Only the response for
/// the most recently issued token may be applied.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }
}
