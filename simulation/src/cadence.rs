use std::time::Duration;

/// Fixed-interval accumulator driving one periodic task.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cadence {
    interval: Duration,
    accumulator: Duration,
}

impl Cadence {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Adds `dt` and returns how many whole intervals elapsed.
    pub(crate) fn accumulate(&mut self, dt: Duration) -> usize {
        if self.interval.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut runs = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            runs += 1;
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_remainder_between_calls() {
        let mut cadence = Cadence::new(Duration::from_millis(300));
        assert_eq!(cadence.accumulate(Duration::from_millis(250)), 0);
        assert_eq!(cadence.accumulate(Duration::from_millis(250)), 1);
        assert_eq!(cadence.accumulate(Duration::from_millis(400)), 2);
    }

    #[test]
    fn zero_interval_never_fires() {
        let mut cadence = Cadence::new(Duration::ZERO);
        assert_eq!(cadence.accumulate(Duration::from_secs(5)), 0);
    }
}
