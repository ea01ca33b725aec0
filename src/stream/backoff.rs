use std::time::Duration;

use rand::Rng;

/// Reconnect delay schedule: starts at a base delay, multiplies by a constant
/// factor on every consecutive failure, capped at a maximum. A fraction of
/// random jitter is added on top so restarting replicas don't reconnect in
/// lockstep. A successful connection resets the schedule to its base.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self::with_jitter(base, max, factor, 0.25)
    }

    /// `jitter` is the maximum extra fraction of the current delay added per
    /// attempt; 0.0 makes the schedule fully deterministic.
    pub fn with_jitter(base: Duration, max: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            base,
            max,
            factor,
            jitter,
            current: base,
        }
    }

    /// Delay to sleep before the next reconnect attempt. Advances the
    /// schedule as a side effect.
    pub fn next_delay(&mut self) -> Duration {
        let scheduled = self.current;
        self.current = std::cmp::min(self.current.mul_f64(self.factor), self.max);

        if self.jitter <= 0.0 {
            return scheduled;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter);
        std::cmp::min(scheduled.mul_f64(1.0 + extra), self.max)
    }

    /// Call on a successful connection.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_never_decrease_up_to_cap() {
        let mut backoff = Backoff::with_jitter(
            Duration::from_millis(500),
            Duration::from_secs(30),
            2.0,
            0.0,
        );

        let mut previous = Duration::ZERO;
        for _ in 0..12 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            assert!(delay <= Duration::from_secs(30));
            previous = delay;
        }
        assert_eq!(previous, Duration::from_secs(30));
    }

    #[test]
    fn success_resets_to_base() {
        let mut backoff = Backoff::with_jitter(
            Duration::from_millis(500),
            Duration::from_secs(30),
            2.0,
            0.0,
        );

        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn jittered_delay_stays_capped() {
        let mut backoff = Backoff::new(
            Duration::from_secs(20),
            Duration::from_secs(30),
            4.0,
        );
        for _ in 0..8 {
            assert!(backoff.next_delay() <= Duration::from_secs(30));
        }
    }
}
