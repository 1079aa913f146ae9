#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::StreamExt;
use pomodoro_keeper::{
    engine::{ManualClock, TimerEngine},
    state::{Interval, MemoryBackend, ScheduleStore, Snapshot, StorageBackend, TimerConfig},
    Notifier, NotifyError,
};

pub const MINUTE: i64 = 60_000;
/// Arbitrary wall-clock origin for tests
pub const T0: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Started(Interval),
    Ended(Interval),
    AllRoundsCompleted,
}

/// Notifier double that records alerts and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Recorded>>,
    progress_calls: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_calls(&self) -> usize {
        *self.progress_calls.lock().unwrap()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, event: Recorded) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        if self.failing.load(Ordering::SeqCst) {
            Err(NotifyError::Rejected("display unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl Notifier for RecordingNotifier {
    fn phase_started(&self, interval: Interval) -> Result<(), NotifyError> {
        self.record(Recorded::Started(interval))
    }

    fn phase_ended(&self, interval: Interval) -> Result<(), NotifyError> {
        self.record(Recorded::Ended(interval))
    }

    fn all_rounds_completed(&self) -> Result<(), NotifyError> {
        self.record(Recorded::AllRoundsCompleted)
    }

    fn progress(&self, _interval: Interval, _remaining_ms: i64) -> Result<(), NotifyError> {
        *self.progress_calls.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<TimerEngine>,
    pub store: Arc<ScheduleStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub backend: MemoryBackend,
}

/// Engine over an in-memory store with the given focus/break minutes and rounds
pub fn harness(focus: i64, brk: i64, rounds: i64) -> Harness {
    let backend = MemoryBackend::new();
    let store = Arc::new(ScheduleStore::open(backend.clone()).expect("Failed to open store"));
    store
        .write_config(TimerConfig::try_new(focus, brk, rounds).unwrap())
        .expect("Failed to write config");
    let clock = Arc::new(ManualClock::new(T0));
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Arc::new(engine_over(&store, &clock, &notifier));
    Harness {
        engine,
        store,
        clock,
        notifier,
        backend,
    }
}

pub fn engine_over(
    store: &Arc<ScheduleStore>,
    clock: &Arc<ManualClock>,
    notifier: &Arc<RecordingNotifier>,
) -> TimerEngine {
    TimerEngine::with_tick(
        Arc::clone(store),
        Arc::clone(notifier) as Arc<dyn Notifier>,
        Arc::clone(clock) as Arc<dyn pomodoro_keeper::engine::Clock>,
        Duration::from_secs(1),
    )
}

pub fn open_store(backend: impl StorageBackend + 'static) -> Arc<ScheduleStore> {
    Arc::new(ScheduleStore::open(backend).expect("Failed to open store"))
}

/// Wait (in virtual time) until the store holds a snapshot matching `pred`
pub async fn wait_for<F>(store: &ScheduleStore, pred: F) -> Snapshot
where
    F: Fn(&Snapshot) -> bool,
{
    let mut updates = store.subscribe();
    tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(snapshot) = updates.next().await {
            if pred(&snapshot) {
                return snapshot;
            }
        }
        panic!("snapshot stream ended");
    })
    .await
    .expect("Timed out waiting for snapshot")
}

/// Let the countdown task run for a few virtual seconds
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}
