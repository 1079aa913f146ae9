//! Timer engine: commands over the persisted snapshot and the single
//! countdown task that drives deadline expiry.
//!
//! The engine keeps no timer state of its own. Every command reads the
//! store, applies a pure transition and writes the result back, so an engine
//! can be dropped and rebuilt over the same store at any time.

pub mod clock;
pub mod transitions;

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::EngineResult,
    services::{notifier::deliver, Notifier},
    state::{ScheduleStore, Snapshot, TimerConfig},
    tasks::{countdown_task, Countdown},
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use transitions::{Alert, Transition};

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

struct CountdownHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl CountdownHandle {
    fn is_alive(&self) -> bool {
        !self.join.is_finished()
    }
}

pub struct TimerEngine {
    countdown: Countdown,
    /// Held for the whole read-modify-write of a command; also owns the
    /// handle of the one countdown task allowed to exist.
    active: Mutex<Option<CountdownHandle>>,
}

impl TimerEngine {
    pub fn new(store: Arc<ScheduleStore>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self::with_tick(store, notifier, clock, DEFAULT_TICK)
    }

    pub fn with_tick(
        store: Arc<ScheduleStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        tick: Duration,
    ) -> Self {
        Self {
            countdown: Countdown {
                store,
                notifier,
                clock,
                tick,
            },
            active: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.countdown.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.countdown.clock
    }

    /// Begin a cycle, resume a paused interval, or (when already running)
    /// make sure the countdown task is alive against the existing deadline.
    pub async fn start(&self) -> EngineResult<Snapshot> {
        let mut active = self.active.lock().await;

        let snapshot = self.countdown.store.read();
        let snapshot = match transitions::start(&snapshot, self.countdown.clock.now_ms()) {
            Some(transition) => {
                halt(&mut active).await;
                self.countdown.notifier.silence();
                let committed = self.countdown.store.write_state(transition.schedule)?;
                info!(
                    "Start: {} -> {} (round {}/{})",
                    snapshot.phase.name(),
                    committed.phase.name(),
                    committed.current_round,
                    committed.config.total_rounds
                );
                deliver(self.countdown.notifier.as_ref(), &transition.alerts);
                committed
            }
            None => {
                self.countdown.notifier.silence();
                debug!("Start while {} keeps the current deadline", snapshot.phase.name());
                snapshot
            }
        };

        self.ensure_countdown(&mut active, &snapshot);
        Ok(snapshot)
    }

    /// Freeze the running interval; a no-op outside Focus/Break
    pub async fn pause(&self) -> EngineResult<Snapshot> {
        let mut active = self.active.lock().await;
        // The countdown may be mid-expiry; only silence once it has finished.
        halt(&mut active).await;
        self.countdown.notifier.silence();

        let snapshot = self.countdown.store.read();
        let Some(transition) = transitions::pause(&snapshot, self.countdown.clock.now_ms()) else {
            debug!("Pause ignored while {}", snapshot.phase.name());
            return Ok(snapshot);
        };

        match self.countdown.store.write_state(transition.schedule) {
            Ok(committed) => {
                info!(
                    "Pause: {} with {}ms left (round {})",
                    snapshot.phase.name(),
                    committed.remaining_ms,
                    committed.current_round
                );
                Ok(committed)
            }
            Err(e) => {
                self.ensure_countdown(&mut active, &snapshot);
                Err(e.into())
            }
        }
    }

    /// Back to Idle from any phase
    pub async fn stop(&self) -> EngineResult<Snapshot> {
        let mut active = self.active.lock().await;
        halt(&mut active).await;
        self.countdown.notifier.silence();

        let snapshot = self.countdown.store.read();
        match self.countdown.store.write_state(transitions::stop().schedule) {
            Ok(committed) => {
                info!("Stop: {} -> {}", snapshot.phase.name(), committed.phase.name());
                Ok(committed)
            }
            Err(e) => {
                self.ensure_countdown(&mut active, &snapshot);
                Err(e.into())
            }
        }
    }

    /// Return the schedule to its Idle/round-1 shape through the store's
    /// reset path; configuration is kept.
    pub async fn reset(&self) -> EngineResult<Snapshot> {
        let mut active = self.active.lock().await;
        halt(&mut active).await;
        self.countdown.notifier.silence();

        let snapshot = self.countdown.store.read();
        match self.countdown.store.reset() {
            Ok(committed) => {
                info!("Reset from {}", snapshot.phase.name());
                Ok(committed)
            }
            Err(e) => {
                self.ensure_countdown(&mut active, &snapshot);
                Err(e.into())
            }
        }
    }

    /// Change durations and round count for future intervals. A deadline
    /// that is already running is left as it is.
    pub async fn update_config(&self, config: TimerConfig) -> EngineResult<Snapshot> {
        let _active = self.active.lock().await;
        let committed = self.countdown.store.write_config(config)?;
        info!(
            "Config updated: focus={}min, break={}min, rounds={}",
            config.focus_minutes, config.break_minutes, config.total_rounds
        );
        Ok(committed)
    }

    /// Pick up a countdown persisted by an earlier process. An interval
    /// that ran out while nothing was running is expired on the first tick.
    pub async fn recover(&self) -> Snapshot {
        let mut active = self.active.lock().await;
        let snapshot = self.countdown.store.read();
        if snapshot.phase.is_running() {
            info!(
                "Recovering {} countdown (round {}/{}), deadline {:?}",
                snapshot.phase.name(),
                snapshot.current_round,
                snapshot.config.total_rounds,
                snapshot.deadline
            );
            self.ensure_countdown(&mut active, &snapshot);
        } else {
            debug!("Nothing to recover, phase is {}", snapshot.phase.name());
        }
        snapshot
    }

    /// Stop the countdown task without touching persisted state
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        halt(&mut active).await;
        self.countdown.notifier.silence();
        info!("Timer engine shut down");
    }

    /// Whether a countdown task is currently running
    pub async fn is_counting_down(&self) -> bool {
        self.active.lock().await.as_ref().is_some_and(CountdownHandle::is_alive)
    }

    fn ensure_countdown(&self, active: &mut Option<CountdownHandle>, snapshot: &Snapshot) {
        if !snapshot.phase.is_running() {
            return;
        }
        if active.as_ref().is_some_and(CountdownHandle::is_alive) {
            debug!("Countdown task already running");
            return;
        }

        let cancel = CancellationToken::new();
        let join = tokio::spawn(countdown_task(self.countdown.clone(), cancel.clone()));
        *active = Some(CountdownHandle { cancel, join });
    }
}

/// Cancel the countdown task, if any, and wait for it to finish
async fn halt(active: &mut Option<CountdownHandle>) {
    if let Some(handle) = active.take() {
        handle.cancel.cancel();
        if let Err(e) = handle.join.await {
            warn!("Countdown task ended abnormally: {}", e);
        }
    }
}
