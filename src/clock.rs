//! # Tick Source
//!
//! Millisecond tick counter used to stamp received frames.

use std::time::Instant;

/// Source of the monotonic tick count recorded with every frame
#[cfg_attr(test, mockall::automock)]
pub trait TickSource {
    /// Current tick count
    fn ticks(&self) -> u32;
}

/// Milliseconds since creation, saturating at `u32::MAX`
///
/// Saturates instead of wrapping so that recorded timestamps never go
/// backwards (about 49.7 days of uptime).
#[derive(Debug, Clone, Copy)]
pub struct SystemTicks {
    start: Instant,
}

impl SystemTicks {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemTicks {
    fn ticks(&self) -> u32 {
        u32::try_from(self.start.elapsed().as_millis()).unwrap_or(u32::MAX)
    }
}
