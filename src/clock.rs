//! Monotonic interval timer

use std::time::Instant;

/// Monotonic wall-clock interval timer with microsecond resolution.
///
/// Reusable for successive intervals within one worker: `reset` then
/// `elapsed_micros` without reconstruction.
#[derive(Debug, Clone)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    /// Capture a monotonic reference point
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Re-capture the reference point for a new interval
    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    /// Elapsed wall-clock time since the last reset, in whole microseconds
    pub fn elapsed_micros(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_elapsed_is_monotonic() {
        let clock = Clock::start();
        let first = clock.elapsed_micros();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.elapsed_micros();
        assert!(second >= first);
        assert!(second >= 2_000);
    }

    #[test]
    fn test_reset_starts_new_interval() {
        let mut clock = Clock::start();
        std::thread::sleep(Duration::from_millis(5));
        clock.reset();
        // A fresh interval must not include time before the reset.
        assert!(clock.elapsed_micros() < 5_000);
    }
}
