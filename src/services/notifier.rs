//! Alert delivery for phase changes and live progress

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use tokio::{process::Command, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    engine::Alert,
    error::NotifyError,
    state::{format_remaining, Interval},
};

/// Receives timer events. Delivery is best-effort: an error is logged by
/// the caller and never undoes the transition that produced the event.
pub trait Notifier: Send + Sync {
    fn phase_started(&self, interval: Interval) -> Result<(), NotifyError>;

    /// Should be noticeable (sound, vibration, desktop alert)
    fn phase_ended(&self, interval: Interval) -> Result<(), NotifyError>;

    fn all_rounds_completed(&self) -> Result<(), NotifyError>;

    /// Live countdown; callers invoke this about once per tick
    fn progress(&self, interval: Interval, remaining_ms: i64) -> Result<(), NotifyError>;

    /// Stop any alarm that is still going off
    fn silence(&self) {}
}

/// Hand committed alerts to `notifier`, logging failures
pub(crate) fn deliver(notifier: &dyn Notifier, alerts: &[Alert]) {
    for alert in alerts {
        let result = match alert {
            Alert::PhaseStarted(interval) => notifier.phase_started(*interval),
            Alert::PhaseEnded(interval) => notifier.phase_ended(*interval),
            Alert::AllRoundsCompleted => notifier.all_rounds_completed(),
        };
        if let Err(e) = result {
            warn!("Failed to deliver {:?} alert: {}", alert, e);
        }
    }
}

/// Reports events through the tracing subscriber
#[derive(Debug)]
pub struct LogNotifier {
    progress_every: Duration,
    last_progress: Mutex<Option<Instant>>,
}

impl LogNotifier {
    pub fn new(progress_every: Duration) -> Self {
        Self {
            progress_every,
            last_progress: Mutex::new(None),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl Notifier for LogNotifier {
    fn phase_started(&self, interval: Interval) -> Result<(), NotifyError> {
        info!("{} started", interval.as_str());
        Ok(())
    }

    fn phase_ended(&self, interval: Interval) -> Result<(), NotifyError> {
        info!("{} complete", interval.as_str());
        Ok(())
    }

    fn all_rounds_completed(&self) -> Result<(), NotifyError> {
        info!("All rounds complete");
        Ok(())
    }

    fn progress(&self, interval: Interval, remaining_ms: i64) -> Result<(), NotifyError> {
        let mut last = self.last_progress.lock().unwrap_or_else(|e| e.into_inner());
        let due = last.map_or(true, |at| at.elapsed() >= self.progress_every);
        if due {
            *last = Some(Instant::now());
            info!("{} remaining: {}", interval.as_str(), format_remaining(remaining_ms));
        } else {
            debug!("{} remaining: {}", interval.as_str(), format_remaining(remaining_ms));
        }
        Ok(())
    }
}

/// Runs a user-supplied shell command as the alarm for alert events.
///
/// The command sees `POMODORO_EVENT` (`phase_ended` or `all_rounds_completed`)
/// and `POMODORO_PHASE`. A still-running alarm is killed after
/// `alarm_timeout`, when the next alarm fires, or on `silence`.
#[derive(Debug)]
pub struct CommandNotifier {
    command: String,
    alarm_timeout: Duration,
    log: LogNotifier,
    ringing: Mutex<Option<CancellationToken>>,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>, alarm_timeout: Duration, log: LogNotifier) -> Self {
        Self {
            command: command.into(),
            alarm_timeout,
            log,
            ringing: Mutex::new(None),
        }
    }

    fn ring(&self, event: &str, phase: &str) -> Result<(), NotifyError> {
        self.silence();

        debug!("Running alarm command for {}: {}", event, self.command);
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("POMODORO_EVENT", event)
            .env("POMODORO_PHASE", phase)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let cancel = CancellationToken::new();
        *self.ringing.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());

        let alarm_timeout = self.alarm_timeout;
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => debug!("Alarm command finished"),
                    Ok(status) => warn!("Alarm command exited with {}", status),
                    Err(e) => warn!("Failed to wait for alarm command: {}", e),
                },
                _ = cancel.cancelled() => {
                    debug!("Alarm silenced");
                    let _ = child.kill().await;
                }
                _ = sleep(alarm_timeout) => {
                    info!("Alarm auto-silenced after {}s", alarm_timeout.as_secs());
                    let _ = child.kill().await;
                }
            }
        });
        Ok(())
    }
}

impl Notifier for CommandNotifier {
    fn phase_started(&self, interval: Interval) -> Result<(), NotifyError> {
        self.log.phase_started(interval)
    }

    fn phase_ended(&self, interval: Interval) -> Result<(), NotifyError> {
        self.log.phase_ended(interval)?;
        self.ring("phase_ended", interval.as_str())
    }

    fn all_rounds_completed(&self) -> Result<(), NotifyError> {
        self.log.all_rounds_completed()?;
        self.ring("all_rounds_completed", "COMPLETED")
    }

    fn progress(&self, interval: Interval, remaining_ms: i64) -> Result<(), NotifyError> {
        self.log.progress(interval, remaining_ms)
    }

    fn silence(&self) {
        if let Some(cancel) = self.ringing.lock().unwrap_or_else(|e| e.into_inner()).take() {
            cancel.cancel();
        }
    }
}
