//! The reading timer.
//!
//! A [`ReadingTimer`] drives [`ReadingGate::tick`] once per interval from a
//! background tokio task. The task ends when the timer is stopped, when the
//! timer is dropped, or when the gate leaves the reading state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::gate::{ReadingGate, ReadingState};

/// A gate shared between the timer task and its owner.
pub type SharedGate = Arc<Mutex<ReadingGate>>;

/// Lock a shared gate, recovering the value if a previous holder panicked.
pub fn lock_gate(gate: &SharedGate) -> MutexGuard<'_, ReadingGate> {
    gate.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Background counter for one open document.
#[derive(Debug)]
pub struct ReadingTimer {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ReadingTimer {
    /// Start ticking `gate` every `every`.
    ///
    /// The first tick lands one full interval after the call, so a reader is
    /// never credited for time they have not spent. Must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn start(gate: SharedGate, every: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        debug!(interval_ms = every.as_millis(), "Starting reading timer");

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;

            while flag.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                let mut gate = lock_gate(&gate);
                if matches!(gate.state(), ReadingState::Signed) {
                    break;
                }
                gate.tick();
            }

            flag.store(false, Ordering::SeqCst);
            debug!("Reading timer stopped");
        });

        Self {
            running,
            task: Some(task),
        }
    }

    /// Check whether the timer task is still counting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop counting. Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReadingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
