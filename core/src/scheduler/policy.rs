//! Slice sizing
//!
//! A policy answers one question at every stop check: how many boundaries should the
//! next slice run? [`Fixed`] always gives the same answer. [`Latency`] measures how long
//! the last slice took and scales its estimate toward a target slice duration.

use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::opts::{Opts, YieldMethod};

pub trait YieldPolicy: Send {
    /// Boundaries in the first slice
    fn initial(&self) -> u64;

    /// Boundaries in the next slice, given how long the finished one took
    fn next(&mut self, elapsed: Duration) -> u64;
}

/// The policy the run options ask for, with configured defaults filling the gaps
pub fn from_opts(opts: &Opts, settings: &SchedulerConfig) -> Box<dyn YieldPolicy> {
    let interval = opts.yield_interval.unwrap_or(settings.default_interval);
    match opts.yield_method {
        YieldMethod::Fixed => Box::new(Fixed::new(interval)),
        YieldMethod::Flexible => Box::new(Latency::new(
            Duration::from_millis(interval),
            settings.min_interval,
            settings.max_interval,
            settings.max_growth,
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixed {
    interval: u64,
}

impl Fixed {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl YieldPolicy for Fixed {
    fn initial(&self) -> u64 {
        self.interval
    }

    fn next(&mut self, _elapsed: Duration) -> u64 {
        self.interval
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Latency {
    target: Duration,
    min: u64,
    max: u64,
    max_growth: f64,
    estimate: u64,
}

impl Latency {
    pub fn new(target: Duration, min: u64, max: u64, max_growth: f64) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            target,
            min,
            max,
            max_growth,
            estimate: min.saturating_mul(10).min(max),
        }
    }

    pub fn estimate(&self) -> u64 {
        self.estimate
    }
}

impl YieldPolicy for Latency {
    fn initial(&self) -> u64 {
        self.estimate
    }

    fn next(&mut self, elapsed: Duration) -> u64 {
        // sub-millisecond slices count as one millisecond
        let elapsed_ms = elapsed.as_secs_f64().max(0.001) * 1000.0;
        let target_ms = self.target.as_secs_f64() * 1000.0;
        let ratio = (target_ms / elapsed_ms).min(self.max_growth);
        let scaled = (self.estimate as f64 * ratio).floor() as u64;
        self.estimate = scaled.clamp(self.min, self.max);
        self.estimate
    }
}
