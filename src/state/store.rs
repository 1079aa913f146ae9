//! Durable store for the single timer snapshot

use std::sync::Mutex;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::{
    backend::StorageBackend,
    snapshot::{Schedule, Snapshot, TimerConfig},
};
use crate::error::{EngineResult, StoreResult};

/// Owns the persisted key/value map and publishes every committed write.
///
/// All writes are read-modify-write over the whole map under one lock, so a
/// reader never observes a half-applied multi-field update.
pub struct ScheduleStore {
    backend: Box<dyn StorageBackend>,
    /// Last map the backend acknowledged
    map: Mutex<Map<String, Value>>,
    /// Decoded view of `map`, for readers and subscribers
    snapshot_tx: watch::Sender<Snapshot>,
}

impl ScheduleStore {
    /// Load the stored map (or start empty) from `backend`
    pub fn open(backend: impl StorageBackend + 'static) -> StoreResult<Self> {
        let map = backend.load()?.unwrap_or_default();
        let snapshot = Snapshot::from_map(&map);
        info!(
            "Opened schedule store: phase={}, round={}/{}",
            snapshot.phase.name(),
            snapshot.current_round,
            snapshot.config.total_rounds
        );

        let (snapshot_tx, _) = watch::channel(snapshot);
        Ok(Self {
            backend: Box::new(backend),
            map: Mutex::new(map),
            snapshot_tx,
        })
    }

    /// Latest durable snapshot, with defaults applied
    pub fn read(&self) -> Snapshot {
        *self.snapshot_tx.borrow()
    }

    /// Stream that yields the current snapshot, then one item after each
    /// committed write. Consecutive writes may coalesce into the newest.
    pub fn subscribe(&self) -> BoxStream<'static, Snapshot> {
        let rx = self.snapshot_tx.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = *rx.borrow_and_update();
            Some((snapshot, (rx, false)))
        })
        .boxed()
    }

    /// Replace the three configuration fields; never touches the schedule
    pub fn write_config(&self, config: TimerConfig) -> EngineResult<Snapshot> {
        config.validate()?;
        let snapshot = self.edit("config", |map| config.write_into(map))?;
        Ok(snapshot)
    }

    /// Replace phase, round, deadline and remaining as one unit
    pub fn write_state(&self, schedule: Schedule) -> StoreResult<Snapshot> {
        self.edit("state", |map| schedule.write_into(map))
    }

    /// Back to Idle/round 1, configuration untouched
    pub fn reset(&self) -> StoreResult<Snapshot> {
        self.edit("reset", |map| Schedule::idle().write_into(map))
    }

    fn edit<F>(&self, action: &str, updater: F) -> StoreResult<Snapshot>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        // A panic while holding the lock cannot leave a half-edited map behind:
        // edits happen on a copy that is swapped in only after persisting.
        let mut current = self.map.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = current.clone();
        updater(&mut next);

        if let Err(e) = self.backend.persist(&next) {
            error!("Failed to persist {} update: {}", action, e);
            return Err(e);
        }

        let snapshot = Snapshot::from_map(&next);
        *current = next;
        self.snapshot_tx.send_replace(snapshot);
        drop(current);

        debug!(
            "Committed {} update: phase={}, round={}, deadline={:?}",
            action,
            snapshot.phase.name(),
            snapshot.current_round,
            snapshot.deadline
        );
        Ok(snapshot)
    }
}
