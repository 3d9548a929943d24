//! Run/stop control.
//!
//! Continuous mode runs the machine on one worker thread in bounded
//! batches. The lock on the machine is released between batches so a
//! host loop can inspect it, and a shared stop flag is checked between
//! instructions so `stop` can be called from any thread.

use crate::cpu::decode::Instruction;
use crate::cpu::execute::{Cpu, CpuError};
use crate::cpu::memory::MemoryObserver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Batch sizing for continuous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Steps executed per batch.
    pub batch_size: u64,
    /// Pause between batches.
    pub tick: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            tick: Duration::from_millis(1),
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Instructions executed by the run.
    pub steps: u64,
}

struct ActiveRun {
    stop: Arc<AtomicBool>,
    worker: JoinHandle<Result<RunSummary, CpuError>>,
}

/// Drives a machine either one step at a time or continuously.
pub struct Driver<O: MemoryObserver + Send + 'static> {
    cpu: Arc<Mutex<Cpu<O>>>,
    config: RunConfig,
    active: Option<ActiveRun>,
}

impl<O: MemoryObserver + Send + 'static> Driver<O> {
    /// Wrap a machine. Nothing runs until [`Driver::run`].
    pub fn new(cpu: Cpu<O>, config: RunConfig) -> Self {
        Self {
            cpu: Arc::new(Mutex::new(cpu)),
            config,
            active: None,
        }
    }

    /// Execute exactly one instruction on the calling thread.
    pub fn step(&self) -> Result<Instruction, DriverError> {
        Ok(lock(&self.cpu).step()?)
    }

    /// Start continuous execution, stopping any run already in flight.
    ///
    /// If that earlier run had ended in an error, the error is returned
    /// and no new run is started.
    pub fn run(&mut self) -> Result<(), DriverError> {
        self.stop()?;

        let stop = Arc::new(AtomicBool::new(false));
        let cpu = Arc::clone(&self.cpu);
        let flag = Arc::clone(&stop);
        let config = self.config;

        tracing::debug!(batch_size = config.batch_size, tick = ?config.tick, "starting run");
        let worker = thread::spawn(move || run_batches(&cpu, &flag, config));
        self.active = Some(ActiveRun { stop, worker });
        Ok(())
    }

    /// Stop continuous execution and wait for the worker to finish.
    ///
    /// Safe to call when nothing is running, in which case it returns an
    /// empty summary.
    pub fn stop(&mut self) -> Result<RunSummary, DriverError> {
        let Some(run) = self.active.take() else {
            return Ok(RunSummary::default());
        };

        run.stop.store(true, Ordering::Release);
        let outcome = run.worker.join().map_err(|_| DriverError::WorkerPanicked)?;
        match &outcome {
            Ok(summary) => tracing::debug!(steps = summary.steps, "run stopped"),
            Err(e) => tracing::warn!(error = %e, "run ended with an error"),
        }
        Ok(outcome?)
    }

    /// Whether a worker is alive. A run that hit an error reports false
    /// here but still holds its error until [`Driver::stop`].
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.worker.is_finished())
    }

    /// Inspect or mutate the machine between batches.
    ///
    /// Mutating memory while a run is active interleaves with the guest;
    /// stop first when that matters.
    pub fn with_cpu<R>(&self, f: impl FnOnce(&mut Cpu<O>) -> R) -> R {
        f(&mut lock(&self.cpu))
    }

    /// The batch configuration.
    pub fn config(&self) -> RunConfig {
        self.config
    }

    /// Stop any run and hand the machine back.
    pub fn into_cpu(mut self) -> Result<Cpu<O>, DriverError> {
        self.stop()?;
        let cpu = Arc::clone(&self.cpu);
        drop(self);
        match Arc::try_unwrap(cpu) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(PoisonError::into_inner)),
            // The worker has been joined, so no other owner can remain
            Err(_) => Err(DriverError::WorkerPanicked),
        }
    }
}

impl<O: MemoryObserver + Send + 'static> Drop for Driver<O> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "run failed before the driver was dropped");
        }
    }
}

impl<O: MemoryObserver + Send + 'static> std::fmt::Debug for Driver<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Worker body: one batch per tick until the flag is raised.
fn run_batches<O: MemoryObserver>(
    cpu: &Mutex<Cpu<O>>,
    stop: &AtomicBool,
    config: RunConfig,
) -> Result<RunSummary, CpuError> {
    let mut summary = RunSummary::default();

    while !stop.load(Ordering::Acquire) {
        {
            let mut cpu = lock(cpu);
            for _ in 0..config.batch_size {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                cpu.step()?;
                summary.steps += 1;
            }
        }

        if config.tick.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(config.tick);
        }
    }

    Ok(summary)
}

/// Errors from the run/stop driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("cpu error: {0}")]
    Cpu(#[from] CpuError),

    #[error("run worker panicked")]
    WorkerPanicked,
}
