//! Countdown background task

use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    engine::{transitions, Clock},
    services::{notifier::deliver, Notifier},
    state::ScheduleStore,
};

/// Everything one countdown loop needs; cloned out of the engine per spawn
#[derive(Clone)]
pub struct Countdown {
    pub store: Arc<ScheduleStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub tick: Duration,
}

/// Poll the persisted deadline until the cycle stops running.
///
/// Every pass re-reads the store, so the loop never works from a stale
/// in-memory copy. Once `cancel` fires no further transition is committed.
pub async fn countdown_task(countdown: Countdown, cancel: CancellationToken) {
    info!("Starting countdown task");

    loop {
        if cancel.is_cancelled() {
            debug!("Countdown cancelled before check");
            break;
        }

        let snapshot = countdown.store.read();
        let Some(interval) = snapshot.phase.running() else {
            debug!("Phase is {}, countdown ends", snapshot.phase.name());
            break;
        };

        let now = countdown.clock.now_ms();
        match transitions::expire(&snapshot, now) {
            Some(transition) => {
                if cancel.is_cancelled() {
                    debug!("Countdown cancelled at expiry, leaving transition to the command");
                    break;
                }

                match countdown.store.write_state(transition.schedule) {
                    Ok(next) => {
                        info!(
                            "{} expired in round {}, now {} (round {}/{})",
                            interval.as_str(),
                            snapshot.current_round,
                            next.phase.name(),
                            next.current_round,
                            next.config.total_rounds
                        );
                        deliver(countdown.notifier.as_ref(), &transition.alerts);

                        if !next.phase.is_running() {
                            info!("Cycle complete, countdown ends");
                            break;
                        }
                        continue;
                    }
                    Err(e) => {
                        // Nothing committed and nothing announced; the next
                        // tick sees the same expired deadline and retries.
                        error!("Failed to commit expiry, retrying next tick: {}", e);
                    }
                }
            }
            None => {
                let remaining = snapshot.remaining_at(now);
                if let Err(e) = countdown.notifier.progress(interval, remaining) {
                    debug!("Progress update dropped: {}", e);
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Countdown cancelled while waiting");
                break;
            }
            _ = sleep(countdown.tick) => {}
        }
    }

    info!("Countdown task stopped");
}
