//! Cycle scheduler.
//!
//! [`CycleJob`] holds the per-cycle algorithm and is host-agnostic: a
//! [`CycleContext`] only decides where it runs. Two contexts are provided:
//! [`ThreadContext`] (dedicated OS thread, the default) and
//! [`TokioContext`] (a task on a caller-supplied runtime).
//!
//! Per cycle:
//! 1. `refresh()` the process image. On failure the rest of the cycle is
//!    skipped and the refresh is retried next cycle.
//! 2. Inputs in registration order: read, coerce, post to the variable if
//!    the value changed.
//! 3. Outputs: read the variable, cache it, write it to hardware; `flush()`.
//! 4. User tasks in registration order; another `flush()` if any ran.
//! 5. Wait out the remainder of the period. Overruns start the next cycle
//!    immediately; missed cycles are not replayed.

use parking_lot::{Condvar, Mutex};
use pvbridge_common::consts::{OVERRUN_LOG_BURST, OVERRUN_LOG_EVERY};
use pvbridge_common::io::image::ProcessImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::binding::Binding;
use crate::error::EngineError;
use crate::tasks::TaskList;

// ─── Statistics ─────────────────────────────────────────────────────

/// Cycle loop statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Completed cycles, including skipped ones.
    pub cycle_count: u64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
    pub max_cycle_us: u64,
    pub avg_cycle_us: u64,
    pub refresh_failures: u64,
    pub consecutive_refresh_failures: u64,
    pub task_failures: u64,
    pub binding_failures: u64,
    #[serde(skip)]
    total_cycle_us: u64,
}

impl CycleStats {
    #[inline]
    fn record(&mut self, cycle_us: u64) {
        self.cycle_count += 1;
        self.total_cycle_us = self.total_cycle_us.saturating_add(cycle_us);
        self.max_cycle_us = self.max_cycle_us.max(cycle_us);
        self.avg_cycle_us = self.total_cycle_us / self.cycle_count;
    }
}

// ─── Loop control ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LoopFlags {
    stop_requested: bool,
    finished: bool,
}

/// Stop request and completion signal shared by the engine and the job.
#[derive(Debug, Default)]
pub struct LoopControl {
    flags: Mutex<LoopFlags>,
    changed: Condvar,
    wake: Notify,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at the next cycle boundary and wake it if it is
    /// waiting.
    pub fn request_stop(&self) {
        self.flags.lock().stop_requested = true;
        self.changed.notify_all();
        self.wake.notify_one();
    }

    pub fn stop_requested(&self) -> bool {
        self.flags.lock().stop_requested
    }

    pub fn is_finished(&self) -> bool {
        self.flags.lock().finished
    }

    fn mark_finished(&self) {
        self.flags.lock().finished = true;
        self.changed.notify_all();
    }

    /// Block for up to `timeout`, returning early on a stop request.
    pub fn wait(&self, timeout: Duration) {
        let mut flags = self.flags.lock();
        self.changed
            .wait_while_for(&mut flags, |f| !f.stop_requested, timeout);
    }

    /// Async form of [`wait`](Self::wait).
    pub async fn wait_async(&self, timeout: Duration) {
        if self.stop_requested() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = self.wake.notified() => {}
        }
    }

    /// Block until the loop has finished. Returns `false` on timeout.
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        let mut flags = self.flags.lock();
        self.changed
            .wait_while_for(&mut flags, |f| !f.finished, timeout);
        flags.finished
    }
}

// ─── Job ────────────────────────────────────────────────────────────

/// Everything one cycle loop needs, moved into its context at start.
pub struct CycleJob {
    io: Arc<dyn ProcessImage>,
    inputs: Vec<Binding>,
    outputs: Vec<Binding>,
    tasks: Arc<Mutex<TaskList>>,
    period: Duration,
    debug: bool,
    cleanup: bool,
    control: Arc<LoopControl>,
    stats: Arc<Mutex<CycleStats>>,
    launched: bool,
    finished: bool,
}

/// Parameters for [`CycleJob::new`].
pub struct JobSettings {
    pub period: Duration,
    pub debug: bool,
    pub cleanup: bool,
}

impl CycleJob {
    pub fn new(
        io: Arc<dyn ProcessImage>,
        inputs: Vec<Binding>,
        outputs: Vec<Binding>,
        tasks: Arc<Mutex<TaskList>>,
        settings: JobSettings,
        control: Arc<LoopControl>,
        stats: Arc<Mutex<CycleStats>>,
    ) -> Self {
        Self {
            io,
            inputs,
            outputs,
            tasks,
            period: settings.period,
            debug: settings.debug,
            cleanup: settings.cleanup,
            control,
            stats,
            launched: false,
            finished: false,
        }
    }

    pub fn control(&self) -> Arc<LoopControl> {
        Arc::clone(&self.control)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one cycle. Returns how long to wait before the next call, or
    /// `None` once the loop has ended (cleanup already done).
    pub fn tick(&mut self) -> Option<Duration> {
        if self.finished {
            return None;
        }
        self.launched = true;
        if self.control.stop_requested() {
            self.finish();
            return None;
        }
        if self.io.exit_requested() {
            info!("Process image requested exit");
            self.finish();
            return None;
        }

        let start = Instant::now();
        self.run_cycle();
        let elapsed = start.elapsed();
        self.account(elapsed);
        Some(self.period.saturating_sub(elapsed))
    }

    fn run_cycle(&mut self) {
        if let Err(e) = self.io.refresh() {
            let consecutive = {
                let mut stats = self.stats.lock();
                stats.refresh_failures += 1;
                stats.consecutive_refresh_failures += 1;
                stats.consecutive_refresh_failures
            };
            if consecutive == 1 {
                warn!("Process image refresh failed, skipping cycle: {e}");
            } else {
                debug!("Process image refresh failed ({consecutive} in a row): {e}");
            }
            return;
        }

        let recovered = std::mem::take(&mut self.stats.lock().consecutive_refresh_failures);
        if recovered > 0 {
            info!("Process image refresh recovered after {recovered} failed cycles");
        }

        let mut binding_failures = 0u64;

        for binding in &self.inputs {
            match binding.pull_input(self.io.as_ref()) {
                Ok(true) if self.debug => {
                    debug!(
                        "{} -> {} = {}",
                        binding.hardware_name(),
                        binding.exposed_name(),
                        binding.get()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    binding_failures += 1;
                    warn!("Input sync failed for {}: {e}", binding.hardware_name());
                }
            }
        }

        for binding in &self.outputs {
            if let Err(e) = binding.push_output(self.io.as_ref()) {
                binding_failures += 1;
                warn!("Output sync failed for {}: {e}", binding.hardware_name());
            }
        }
        self.flush("output phase");

        let task_failures = {
            let mut tasks = self.tasks.lock();
            if tasks.is_empty() {
                0
            } else {
                let failures = tasks.run_all();
                drop(tasks);
                self.flush("loop tasks");
                failures
            }
        };

        let mut stats = self.stats.lock();
        stats.binding_failures += binding_failures;
        stats.task_failures += task_failures;
    }

    fn flush(&self, phase: &str) {
        if let Err(e) = self.io.flush() {
            warn!("Process image flush after {phase} failed: {e}");
        }
    }

    fn account(&self, elapsed: Duration) {
        let cycle_us = elapsed.as_micros() as u64;
        let mut stats = self.stats.lock();
        stats.record(cycle_us);

        if elapsed > self.period {
            stats.overruns += 1;
            let n = stats.overruns;
            if self.debug && (n <= OVERRUN_LOG_BURST || n % OVERRUN_LOG_EVERY == 0) {
                warn!(
                    "Cycle overrun #{n}: cycle took {}ms (period {}ms)",
                    elapsed.as_millis(),
                    self.period.as_millis()
                );
            }
        }

        if stats.cycle_count % 1000 == 0 {
            debug!(
                "Cycle loop: {} cycles, avg={}us, max={}us, overruns={}",
                stats.cycle_count, stats.avg_cycle_us, stats.max_cycle_us, stats.overruns
            );
        }
    }

    /// Reset outputs if cleanup is enabled, then signal completion.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.cleanup {
            for binding in &self.outputs {
                if let Err(e) = binding.reset_output(self.io.as_ref()) {
                    warn!("Cleanup failed for {}: {e}", binding.hardware_name());
                }
            }
            self.flush("cleanup");
            info!("Outputs reset to defaults ({} bindings)", self.outputs.len());
        }

        let stats = self.stats.lock().clone();
        info!(
            "Cycle loop stopped after {} cycles (overruns: {})",
            stats.cycle_count, stats.overruns
        );
        self.control.mark_finished();
    }
}

impl Drop for CycleJob {
    fn drop(&mut self) {
        // A job its context never ran has touched no outputs.
        if self.launched {
            // Host went away without a stop request (runtime shutdown, panic).
            self.finish();
        }
    }
}

// ─── Contexts ───────────────────────────────────────────────────────

/// Somewhere to run a [`CycleJob`] periodically.
///
/// Implementations call [`CycleJob::tick`] until it returns `None`, waiting
/// the returned duration in between with [`LoopControl::wait`] or
/// [`LoopControl::wait_async`] so a stop request cuts the wait short.
pub trait CycleContext {
    fn launch(&self, job: CycleJob) -> Result<(), EngineError>;
}

/// Runs the loop on a dedicated, named OS thread.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    thread_name: String,
}

impl ThreadContext {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Default for ThreadContext {
    fn default() -> Self {
        Self::new("pvbridge-cycle")
    }
}

impl CycleContext for ThreadContext {
    fn launch(&self, mut job: CycleJob) -> Result<(), EngineError> {
        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                if detect_rt_mode() {
                    info!("Cycle thread running in real-time mode");
                } else {
                    debug!("Cycle thread running in standard (non-RT) mode");
                }
                let control = job.control();
                while let Some(wait) = job.tick() {
                    if !wait.is_zero() {
                        control.wait(wait);
                    }
                }
            })
            .map(drop)
            .map_err(|e| EngineError::Launch(e.to_string()))
    }
}

/// Runs the loop as a task on a Tokio runtime.
///
/// The cycle body is synchronous and occupies a worker for its duration;
/// use a multi-threaded runtime if `Engine::stop` is called from async code.
#[derive(Debug, Clone)]
pub struct TokioContext {
    handle: tokio::runtime::Handle,
}

impl TokioContext {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Context on the runtime the caller is running in.
    pub fn current() -> Result<Self, EngineError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| EngineError::Launch(e.to_string()))
    }
}

impl CycleContext for TokioContext {
    fn launch(&self, mut job: CycleJob) -> Result<(), EngineError> {
        self.handle.spawn(async move {
            let control = job.control();
            while let Some(wait) = job.tick() {
                if wait.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    control.wait_async(wait).await;
                }
            }
        });
        Ok(())
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
