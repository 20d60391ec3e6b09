use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

/// Time source and suspension points for the engine.
///
/// The engine never sleeps on its own: timers go through `sleep_ms` and
/// the animation loop waits for the next display refresh through
/// `next_frame`. Swapping the implementation lets tests run time forward
/// instantly.
pub trait Scheduler: Send + Sync {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> f64;
    fn sleep_ms(&self, ms: u64);
    /// Block until the next frame should be rendered.
    fn next_frame(&self);
}

/// Wall-clock scheduler backed by thread sleeps.
pub struct RealtimeScheduler {
    origin: Instant,
    frame: Duration,
}

impl RealtimeScheduler {
    pub fn new(frame_ms: u64) -> Self {
        Self { origin: Instant::now(), frame: Duration::from_millis(frame_ms.max(1)) }
    }
}

impl Default for RealtimeScheduler {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Scheduler for RealtimeScheduler {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }

    fn next_frame(&self) {
        thread::sleep(self.frame);
    }
}

/// Virtual clock: sleeping advances time without blocking.
pub struct ManualScheduler {
    now: Mutex<f64>,
    frame_ms: f64,
}

impl ManualScheduler {
    pub fn new(frame_ms: f64) -> Self {
        Self { now: Mutex::new(0.0), frame_ms }
    }

    pub fn advance(&self, ms: f64) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += ms;
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(16.0)
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> f64 {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms as f64);
    }

    fn next_frame(&self) {
        self.advance(self.frame_ms);
    }
}

/// `ms` with +/-`jitter` (fraction) random variation.
pub fn jittered(ms: u64, jitter: f64) -> u64 {
    if jitter <= 0.0 || ms == 0 {
        return ms;
    }
    let spread = ms as f64 * jitter.min(1.0);
    let actual = ms as f64 + rand::thread_rng().gen_range(-spread..spread);
    actual.max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep_and_frame() {
        let s = ManualScheduler::new(10.0);
        s.sleep_ms(250);
        s.next_frame();
        assert_eq!(s.now_ms(), 260.0);
    }

    #[test]
    fn zero_jitter_is_exact() {
        assert_eq!(jittered(300, 0.0), 300);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        for _ in 0..100 {
            let v = jittered(1000, 0.3);
            assert!((700..=1300).contains(&v), "{}", v);
        }
    }
}
