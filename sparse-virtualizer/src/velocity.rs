use crate::{ConfigError, ScrollDirection, VelocityOptions};

/// Samples kept for the velocity estimate.
const WINDOW: usize = 5;

#[derive(Clone, Copy, Debug)]
struct Sample {
    time_ms: u64,
    position: f64,
}

/// Rolling estimate of scroll speed, in logical units per millisecond.
///
/// The estimate is the slope between the oldest and newest sample of a small ring buffer. A
/// sample arriving after `idle_timeout_ms` of silence starts a fresh gesture.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    options: VelocityOptions,
    samples: [Option<Sample>; WINDOW],
    // Slot of the newest sample.
    head: usize,
    len: usize,
}

impl VelocityTracker {
    pub fn new(options: VelocityOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            samples: [None; WINDOW],
            head: 0,
            len: 0,
        })
    }

    pub fn options(&self) -> &VelocityOptions {
        &self.options
    }

    pub fn add_sample(&mut self, position: f64, now_ms: u64) {
        if let Some(last) = self.newest() {
            if now_ms.saturating_sub(last.time_ms) > self.options.idle_timeout_ms {
                self.reset();
            }
        }
        self.head = (self.head + 1) % WINDOW;
        self.samples[self.head] = Some(Sample {
            time_ms: now_ms,
            position,
        });
        self.len = (self.len + 1).min(WINDOW);
    }

    /// Signed velocity; positive when scrolling forward. `0.0` with fewer than two samples.
    pub fn velocity(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.oldest(), self.newest()) else {
            return 0.0;
        };
        if self.len < 2 {
            return 0.0;
        }
        // Samples sharing a timestamp still count as motion.
        let dt = newest.time_ms.saturating_sub(oldest.time_ms).max(1) as f64;
        (newest.position - oldest.position) / dt
    }

    pub fn speed(&self) -> f64 {
        let v = self.velocity();
        if v < 0.0 { -v } else { v }
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        let v = self.velocity();
        if v > 0.0 {
            Some(ScrollDirection::Forward)
        } else if v < 0.0 {
            Some(ScrollDirection::Backward)
        } else {
            None
        }
    }

    /// Whether enough samples have been seen to trust [`Self::velocity`].
    pub fn is_tracking(&self) -> bool {
        self.len >= self.options.min_samples.min(WINDOW)
    }

    /// Whether a gesture is in progress (at least one sample since the last reset).
    pub fn is_active(&self) -> bool {
        self.len > 0
    }

    pub fn sample_count(&self) -> usize {
        self.len
    }

    /// Reports the transition to idle once, resetting the tracker.
    pub fn check_idle(&mut self, now_ms: u64) -> bool {
        let Some(last) = self.newest() else {
            return false;
        };
        if now_ms.saturating_sub(last.time_ms) < self.options.idle_timeout_ms {
            return false;
        }
        vtrace!(now_ms, last_sample_ms = last.time_ms, "VelocityTracker idle");
        self.reset();
        true
    }

    pub fn reset(&mut self) {
        self.samples = [None; WINDOW];
        self.head = 0;
        self.len = 0;
    }

    fn newest(&self) -> Option<Sample> {
        if self.len == 0 {
            return None;
        }
        self.samples[self.head]
    }

    fn oldest(&self) -> Option<Sample> {
        if self.len == 0 {
            return None;
        }
        self.samples[(self.head + WINDOW + 1 - self.len) % WINDOW]
    }
}
