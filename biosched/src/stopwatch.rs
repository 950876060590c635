use std::time::Duration;
use std::time::Instant;

/// A time keeping utility which keeps track of the elapsed time since creation.
#[derive(Debug, Copy, Clone)]
pub struct Stopwatch {
    time_start: Instant,
}

impl Stopwatch {
    /// Create a new [`Stopwatch`] which starts keeping track of time immediately.
    pub fn starting_now() -> Stopwatch {
        Stopwatch {
            time_start: Instant::now(),
        }
    }

    /// Get the duration since the [`Stopwatch`] was created.
    pub fn elapsed(&self) -> Duration {
        self.time_start.elapsed()
    }

    /// The elapsed time in seconds, rounded to two decimals.
    pub fn elapsed_secs(&self) -> f64 {
        summary_format::round_to(self.elapsed().as_secs_f64(), 2)
    }
}
