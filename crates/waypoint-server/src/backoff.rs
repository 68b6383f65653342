//! Exponential retry delays with jitter for notification delivery.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
            jitter_ratio: 0.2,
        }
    }

    /// Delay before the next attempt. Doubles after each call, up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let delay_ms = delay.as_millis();
    let jitter_ms_max = ((delay_ms as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_ms = (now_nanos as u128) % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}
