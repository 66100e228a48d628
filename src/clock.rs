use time::{OffsetDateTime, PrimitiveDateTime};

/// Wall-clock source. The engine reads it exactly once per logical
/// operation so every predicate in that operation sees the same instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// UTC wall clock used by the running service.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc();
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Settable clock for tests.
#[cfg(test)]
pub struct ManualClock(std::sync::Mutex<PrimitiveDateTime>);

#[cfg(test)]
impl ManualClock {
    pub fn new(now: PrimitiveDateTime) -> Self {
        Self(std::sync::Mutex::new(now))
    }

    pub fn set(&self, now: PrimitiveDateTime) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: time::Duration) {
        let mut guard = self.0.lock().unwrap();
        *guard = *guard + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> PrimitiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualClock::new(datetime!(2030-01-01 00:00:00));
        assert_eq!(clock.now(), datetime!(2030-01-01 00:00:00));

        clock.advance(time::Duration::hours(13));
        assert_eq!(clock.now(), datetime!(2030-01-01 13:00:00));

        clock.set(datetime!(2030-02-01 13:00:00));
        assert_eq!(clock.now(), datetime!(2030-02-01 13:00:00));
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
