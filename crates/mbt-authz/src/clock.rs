// clock.rs — Simulated block time for one trace run.

use chrono::{DateTime, Duration, Utc};

/// A monotonic simulated clock. It only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    now: DateTime<Utc>,
}

impl SimClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: start }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Move the clock forward. Non-positive steps are ignored.
    pub fn advance(&mut self, by: Duration) {
        if by > Duration::zero() {
            self.now += by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_forward_only() {
        let start = Utc::now();
        let mut clock = SimClock::new(start);
        clock.advance(Duration::minutes(1));
        assert_eq!(clock.now(), start + Duration::minutes(1));
        clock.advance(Duration::minutes(-5));
        assert_eq!(clock.now(), start + Duration::minutes(1));
    }
}
