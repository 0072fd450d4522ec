use std::cell::Cell;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{IfxError, Result};

/// What `shutdown` does once the shared driver runtime is up.
///
/// The underlying JVM-hosted bridge cannot be cleanly restarted within a
/// process once stopped. The original driver worked around that by exiting
/// the whole process; that behavior is kept here as an explicit opt-in
/// rather than a hardcoded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStrategy {
    /// Exit the process with status 3, matching the legacy driver.
    TerminateProcess,
    /// Leave the runtime running; the process owns its lifetime.
    Noop,
    /// Refuse to shut down and return an error to the caller.
    Error,
}

thread_local! {
    static THREAD_ATTACHED: Cell<bool> = const { Cell::new(false) };
}

/// Handle to the process-wide native bridge runtime.
///
/// Lifecycle: init-once, attach-per-thread, never safely restart. One
/// handle is shared by every connection in the process; each thread that
/// issues database calls is attached at most once.
pub struct BridgeRuntime {
    strategy: ShutdownStrategy,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl BridgeRuntime {
    pub fn new(strategy: ShutdownStrategy) -> Arc<Self> {
        Arc::new(Self {
            strategy,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn strategy(&self) -> ShutdownStrategy {
        self.strategy
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Attach the calling thread to the shared runtime, invoking `attach`
    /// only the first time this thread comes through. Marks the runtime
    /// started on first use.
    pub fn attach_current_thread<F>(&self, attach: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(IfxError::Runtime(
                "bridge runtime has been shut down and cannot be restarted".to_string(),
            ));
        }
        self.started.store(true, Ordering::SeqCst);

        THREAD_ATTACHED.with(|attached| {
            if attached.get() {
                return Ok(());
            }
            attach()?;
            attached.set(true);
            Ok(())
        })
    }

    /// Terminate the shared runtime according to the configured strategy.
    ///
    /// A no-op when the runtime was never started.
    pub fn shutdown(&self) -> Result<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }
        match self.strategy {
            ShutdownStrategy::TerminateProcess => {
                debug!("shutting down bridge runtime, terminating process");
                process::exit(3);
            }
            ShutdownStrategy::Noop => {
                debug!("bridge runtime shutdown requested, leaving runtime up");
                self.stopped.store(true, Ordering::SeqCst);
                Ok(())
            }
            ShutdownStrategy::Error => Err(IfxError::Runtime(
                "bridge runtime cannot be restarted once stopped; refusing to shut down"
                    .to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_is_once_per_thread() {
        let runtime = BridgeRuntime::new(ShutdownStrategy::Noop);
        let mut calls = 0;

        runtime
            .attach_current_thread(|| {
                calls += 1;
                Ok(())
            })
            .unwrap();
        runtime
            .attach_current_thread(|| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(runtime.is_started());
    }

    #[test]
    fn test_shutdown_noop_marks_stopped() {
        let runtime = BridgeRuntime::new(ShutdownStrategy::Noop);
        runtime.attach_current_thread(|| Ok(())).unwrap();
        runtime.shutdown().unwrap();
        assert!(runtime.is_stopped());
    }

    #[test]
    fn test_shutdown_error_strategy() {
        let runtime = BridgeRuntime::new(ShutdownStrategy::Error);
        runtime.attach_current_thread(|| Ok(())).unwrap();
        assert!(matches!(runtime.shutdown(), Err(IfxError::Runtime(_))));
    }

    #[test]
    fn test_shutdown_before_start_is_noop() {
        let runtime = BridgeRuntime::new(ShutdownStrategy::Error);
        runtime.shutdown().unwrap();
    }
}
