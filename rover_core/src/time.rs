//! Monotonic time utilities.
//!
//! All control timing runs off a process-local monotonic clock so that
//! wall-clock adjustments can never move a deadline. `monotonic_sec`
//! reports seconds since the first call in the process; timestamps from
//! it are comparable across threads.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Seconds since process start on the monotonic clock.
pub fn monotonic_sec() -> f64 {
    PROCESS_START.elapsed().as_secs_f64()
}

/// Force the process clock epoch to be captured now.
///
/// Called once early in startup so the epoch does not land in the middle
/// of driver initialization on the first `monotonic_sec` call.
pub fn init_clock() {
    Lazy::force(&PROCESS_START);
}

/// Fixed-rate loop scheduler on monotonic deadlines.
///
/// Sleeping a fixed interval at the loop tail accumulates skew; instead
/// each wait targets `next = previous deadline + period`. If the loop has
/// fallen more than one period behind, the schedule is re-anchored to now
/// rather than replaying missed ticks.
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next deadline, then advance it by one period.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
            self.next += self.period;
        } else if now.duration_since(self.next) > self.period {
            // Lagging badly; re-anchor instead of replaying missed ticks.
            self.next = now + self.period;
        } else {
            self.next += self.period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_sec_advances() {
        let t0 = monotonic_sec();
        std::thread::sleep(Duration::from_millis(5));
        let t1 = monotonic_sec();
        assert!(t1 > t0);
    }

    #[test]
    fn test_ticker_holds_rate() {
        let mut ticker = Ticker::new(Duration::from_millis(2));
        let start = Instant::now();
        for _ in 0..5 {
            ticker.wait();
        }
        // Five 2 ms periods should take at least 10 ms even when each
        // iteration does no work.
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
