//! Scheduler
//!
//! Drives a stoppable computation from Rust under the same contract the JavaScript
//! preambles implement for compiled programs:
//!
//! - every [`Step::Continue`] is one scheduling boundary and uses up one unit of the
//!   current slice
//! - when the slice runs out, the driver yields to the tokio task queue, then checks the
//!   stop flag; each check counts as one yield
//! - a `stop` deadline arms a timer task that raises the stop flag once it elapses
//!
//! Steps are never interrupted, so a stop request only takes effect at the next check.
//!
//! ```ignore
//! let mut scheduler = Scheduler::new(&opts, &config.scheduler);
//! let report = scheduler.run(&mut program).await?;
//! println!("{}", report);
//! ```

mod policy;
mod report;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::opts::{Env, Opts};

pub use policy::{from_opts, Fixed, Latency, YieldPolicy};
pub use report::{Outcome, Report};


/* ===================== Types ===================== */

/// Result of one step of a stoppable computation
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue,
    Done(JsonValue),
}

/// An error raised by the computation itself
#[derive(Debug, Clone, Error, PartialEq)]
#[error("host error: {message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("program already ran to completion")]
    Finished,
}

/// A computation the scheduler can advance one boundary at a time
pub trait Stoppable {
    fn step(&mut self) -> Result<Step, HostError>;
}

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/* ===================== Scheduler ===================== */

pub struct Scheduler {
    env: Env,
    deadline: Option<Duration>,
    policy: Box<dyn YieldPolicy>,
    stop: StopHandle,
    /// Boundaries left in the current slice
    counter: u64,
    yields: u64,
    started: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    stopped: bool,
    finished: bool,
}

impl Scheduler {
    pub fn new(opts: &Opts, settings: &SchedulerConfig) -> Self {
        Self::with_policy(opts, policy::from_opts(opts, settings))
    }

    pub fn with_policy(opts: &Opts, policy: Box<dyn YieldPolicy>) -> Self {
        let deadline = opts
            .stop
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64);
        Self {
            env: opts.env,
            deadline,
            counter: policy.initial(),
            policy,
            stop: StopHandle::new(),
            yields: 0,
            started: None,
            timer: None,
            stopped: false,
            finished: false,
        }
    }

    /// Handle for stopping the run from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn yields(&self) -> u64 {
        self.yields
    }

    /// Run `program` until it finishes, stops or fails. After a stop, calling `run`
    /// again resumes where the program left off.
    pub async fn run<S>(&mut self, program: &mut S) -> Result<Report, RunError>
    where
        S: Stoppable + ?Sized,
    {
        if self.finished {
            return Err(RunError::Finished);
        }
        if self.stopped {
            debug!(yields = self.yields, "resuming stopped program");
            self.stop.clear();
            self.stopped = false;
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        self.arm_deadline();

        let mut slice_start = Instant::now();
        loop {
            match program.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Done(value)) => {
                    self.finish();
                    let report = self.report(Outcome::Done(value), started);
                    info!(
                        running_time_ms = report.running_time.as_millis() as u64,
                        yields = report.yields,
                        "program finished"
                    );
                    return Ok(report);
                }
                Err(err) => {
                    self.finish();
                    return match self.env {
                        Env::Browser => {
                            warn!(error = %err, "uncaught error in program");
                            Ok(self.report(Outcome::HostError(err.message), started))
                        }
                        Env::Node => Err(err.into()),
                    };
                }
            }

            self.counter = self.counter.saturating_sub(1);
            if self.counter > 0 {
                continue;
            }
            self.counter = self.policy.next(slice_start.elapsed()).max(1);

            tokio::task::yield_now().await;
            slice_start = Instant::now();
            self.yields += 1;
            if self.stop.is_stopped() {
                self.stopped = true;
                let report = self.report(Outcome::Stopped, started);
                info!(
                    running_time_ms = report.running_time.as_millis() as u64,
                    yields = report.yields,
                    "program stopped"
                );
                return Ok(report);
            }
        }
    }

    fn arm_deadline(&mut self) {
        let Some(deadline) = self.deadline else {
            return;
        };
        if self.timer.is_some() {
            return;
        }
        let stop = self.stop.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            debug!("stop deadline reached");
            stop.stop();
        }));
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn report(&self, outcome: Outcome, started: Instant) -> Report {
        Report {
            outcome,
            running_time: started.elapsed(),
            yields: self.yields,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
