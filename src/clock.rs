use std::time::Instant;

/// Millisecond time source for cooldown and cadence arithmetic. All
/// consumers subtract with wrapping ops, so wrapping at the u32 boundary
/// (~49.7 days) is expected and harmless.
pub trait TimeSource: Send {
    fn now_ms(&self) -> u32;
}

/// Milliseconds elapsed since construction.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
pub struct FixedClock(pub u32);

#[cfg(test)]
impl TimeSource for FixedClock {
    fn now_ms(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now_ms() > first);
    }
}
