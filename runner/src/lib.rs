//! A background-thread runner for [`mk61_core::Engine`].
//!
//! The chipset core is strictly synchronous: a macro-tick is CPU-bound and
//! bounded, and nothing inside it suspends. This
//! crate is the optional wrapper around that core that gives it a wall-clock
//! heartbeat: a dedicated worker thread repeatedly calls [`Engine::do_step`]
//! while the engine is powered on, sleeping a configurable interval between
//! macro-ticks so a program advances at a perceptible, real-time-like pace
//! rather than as fast as the host CPU allows.
//!
//! All public methods serialise access to the wrapped engine through a single
//! mutex held for the duration of the call; callers must not re-enter the
//! runner from inside a closure passed to [`Runner::with_engine`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use mk61_core::Engine;

/// Configuration for a [`Runner`].
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// The sleep interval between macro-ticks while the worker is active.
    ///
    /// Defaults to 100ms, matching the real-time perceptual speed called for
    /// by the engine's concurrency model.
    pub tick_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
        }
    }
}

/// Owns an [`Engine`] and an optional background worker thread that steps it.
pub struct Runner {
    engine: Arc<Mutex<Engine>>,
    config: RunnerConfig,
    terminate: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Runner {
    /// Wrap an engine in a runner using the given configuration.
    ///
    /// The worker thread is not started; call [`Runner::start`] to begin
    /// stepping the engine in the background.
    #[must_use]
    pub fn new(engine: Engine, config: RunnerConfig) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            config,
            terminate: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start the background worker, if it is not already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            log::debug!("runner already started, ignoring duplicate start()");
            return;
        }

        self.terminate.store(false, Ordering::SeqCst);

        let engine = Arc::clone(&self.engine);
        let terminate = Arc::clone(&self.terminate);
        let interval = self.config.tick_interval;

        log::debug!("starting mk61 runner worker, tick_interval={interval:?}");

        self.handle = Some(std::thread::spawn(move || {
            while !terminate.load(Ordering::SeqCst) {
                {
                    let mut engine = engine.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    if engine.get_power_state().is_on() && engine.is_running() {
                        engine.do_step();
                    }
                }
                std::thread::sleep(interval);
            }
            log::debug!("mk61 runner worker terminated");
        }));
    }

    /// Signal the worker to stop and block until it has joined.
    ///
    /// The current macro-tick (if any) always completes before the worker
    /// exits; partial macro-ticks are never left half-executed.
    pub fn terminate(&mut self) {
        self.terminate.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            log::debug!("joining mk61 runner worker");
            let _ = handle.join();
        }
    }

    /// Run a closure against the wrapped engine, holding the runner's lock
    /// for the duration of the call.
    ///
    /// # Panics
    ///
    /// Propagates a panic if the closure itself panics; the lock is not
    /// poisoned-checked beyond recovering the inner value, matching the
    /// "no fairness guarantees beyond the underlying mutex" contract.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self
            .engine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut engine)
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::{Runner, RunnerConfig};
    use mk61_core::{Engine, PowerState, RomSet};
    use std::time::Duration;

    #[test]
    fn start_and_terminate_joins_cleanly() {
        let engine = Engine::new(RomSet::default());
        let mut runner = Runner::new(
            engine,
            RunnerConfig {
                tick_interval: Duration::from_millis(1),
            },
        );

        runner.start();
        runner.with_engine(|engine| engine.set_power_state(PowerState::On));
        std::thread::sleep(Duration::from_millis(20));
        runner.terminate();
    }
}
