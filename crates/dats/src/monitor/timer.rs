use std::{
    fmt::Display,
    sync::Mutex,
    time::{Duration, Instant},
};

/// where the monitor spends its time
#[derive(Default)]
pub(crate) struct Timer {
    pub(crate) reading: Duration,
    pub(crate) writing_input: Duration,
    pub(crate) submitting: Duration,
    pub(crate) sleeping: Duration,
}

impl Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} s reading logs, {:.1} s writing input, {:.1} s submitting, \
	     {:.1} s sleeping",
            self.reading.as_millis() as f64 / 1000.0,
            self.writing_input.as_millis() as f64 / 1000.0,
            self.submitting.as_millis() as f64 / 1000.0,
            self.sleeping.as_millis() as f64 / 1000.0,
        )
    }
}

/// Something that can be slept on. Tests use [VirtualClock] so that a whole
/// run finishes without waiting on real time
pub trait Clock: Sync {
    fn sleep(&self, d: Duration);

    /// time elapsed since the clock was created
    fn elapsed(&self) -> Duration;
}

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// A clock that only advances when it is slept on
#[derive(Default)]
pub struct VirtualClock {
    now: Mutex<Duration>,
}

impl Clock for VirtualClock {
    fn sleep(&self, d: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += d;
        }
    }

    fn elapsed(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

/// How long to wait before retry `n` (counting from 0)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    pub fn delay(&self, n: usize) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(n as u32).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(cap)
            }
        }
    }
}
