//! Persisted timer record and its key/value encoding

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

/// Stable key names of the persisted record
pub mod keys {
    pub const FOCUS_MINUTES: &str = "focus_minutes";
    pub const BREAK_MINUTES: &str = "break_minutes";
    pub const TOTAL_ROUNDS: &str = "total_rounds";
    pub const CURRENT_ROUND: &str = "current_round";
    pub const CURRENT_STATE: &str = "current_state";
    pub const TIMER_END_TIMESTAMP: &str = "timer_end_timestamp";
    pub const REMAINING_MILLIS: &str = "remaining_millis";
    pub const PAUSED_FROM: &str = "paused_from";
}

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_TOTAL_ROUNDS: u32 = 4;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A countdown kind: the two phases that carry a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interval {
    Focus,
    Break,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Focus => "FOCUS",
            Interval::Break => "BREAK",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "FOCUS" => Some(Interval::Focus),
            "BREAK" => Some(Interval::Break),
            _ => None,
        }
    }

    /// Full length of this interval under `config`, in milliseconds
    pub fn duration_ms(&self, config: &TimerConfig) -> i64 {
        let minutes = match self {
            Interval::Focus => config.focus_minutes,
            Interval::Break => config.break_minutes,
        };
        i64::from(minutes) * MILLIS_PER_MINUTE
    }
}

/// Coarse state of the cycle.
///
/// `Paused` carries the interval it interrupted so a resume never has to
/// infer whether it was a focus or a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running(Interval),
    Paused(Interval),
    Completed,
}

impl Phase {
    /// Persisted/display name of the phase
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Running(interval) => interval.as_str(),
            Phase::Paused(_) => "PAUSED",
            Phase::Completed => "COMPLETED",
        }
    }

    pub fn running(&self) -> Option<Interval> {
        match self {
            Phase::Running(interval) => Some(*interval),
            _ => None,
        }
    }

    pub fn paused_from(&self) -> Option<Interval> {
        match self {
            Phase::Paused(interval) => Some(*interval),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    /// Decode the persisted pair. A bare `PAUSED` without a readable
    /// `paused_from` is not decodable.
    pub fn decode(state: &str, paused_from: Option<&str>) -> Option<Self> {
        match state {
            "IDLE" => Some(Phase::Idle),
            "COMPLETED" => Some(Phase::Completed),
            "PAUSED" => paused_from.and_then(Interval::parse).map(Phase::Paused),
            other => Interval::parse(other).map(Phase::Running),
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Durations and round count; only changed through an explicit config update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub total_rounds: u32,
}

impl TimerConfig {
    /// Build a config from caller-supplied values, rejecting non-positive ones
    pub fn try_new(focus_minutes: i64, break_minutes: i64, total_rounds: i64) -> EngineResult<Self> {
        Ok(Self {
            focus_minutes: positive("focus_minutes", focus_minutes)?,
            break_minutes: positive("break_minutes", break_minutes)?,
            total_rounds: positive("total_rounds", total_rounds)?,
        })
    }

    pub fn validate(&self) -> EngineResult<()> {
        Self::try_new(
            self.focus_minutes.into(),
            self.break_minutes.into(),
            self.total_rounds.into(),
        )
        .map(|_| ())
    }

    pub(crate) fn write_into(&self, map: &mut Map<String, Value>) {
        map.insert(keys::FOCUS_MINUTES.into(), self.focus_minutes.into());
        map.insert(keys::BREAK_MINUTES.into(), self.break_minutes.into());
        map.insert(keys::TOTAL_ROUNDS.into(), self.total_rounds.into());
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            focus_minutes: read_positive(map, keys::FOCUS_MINUTES).unwrap_or(DEFAULT_FOCUS_MINUTES),
            break_minutes: read_positive(map, keys::BREAK_MINUTES).unwrap_or(DEFAULT_BREAK_MINUTES),
            total_rounds: read_positive(map, keys::TOTAL_ROUNDS).unwrap_or(DEFAULT_TOTAL_ROUNDS),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
        }
    }
}

fn positive(field: &'static str, value: i64) -> EngineResult<u32> {
    if value <= 0 {
        return Err(EngineError::invalid_config(field, format!("must be positive, got {value}")));
    }
    u32::try_from(value)
        .map_err(|_| EngineError::invalid_config(field, format!("{value} is out of range")))
}

fn read_positive(map: &Map<String, Value>, key: &str) -> Option<u32> {
    map.get(key)
        .and_then(Value::as_i64)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

/// The four fields a state transition replaces as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub phase: Phase,
    pub current_round: u32,
    /// Epoch milliseconds; only set while a countdown runs
    pub deadline: Option<i64>,
    /// Only meaningful while paused
    pub remaining_ms: i64,
}

impl Schedule {
    /// The Idle/round-1 shape
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            current_round: 1,
            deadline: None,
            remaining_ms: 0,
        }
    }

    pub(crate) fn write_into(&self, map: &mut Map<String, Value>) {
        map.insert(keys::CURRENT_STATE.into(), self.phase.name().into());
        map.insert(keys::CURRENT_ROUND.into(), self.current_round.into());
        map.insert(keys::REMAINING_MILLIS.into(), self.remaining_ms.max(0).into());
        match self.deadline {
            Some(deadline) => map.insert(keys::TIMER_END_TIMESTAMP.into(), deadline.into()),
            None => map.remove(keys::TIMER_END_TIMESTAMP),
        };
        match self.phase.paused_from() {
            Some(interval) => map.insert(keys::PAUSED_FROM.into(), interval.as_str().into()),
            None => map.remove(keys::PAUSED_FROM),
        };
    }
}

/// Complete persisted state, decoded with defaults and invariants applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub config: TimerConfig,
    pub current_round: u32,
    pub phase: Phase,
    pub deadline: Option<i64>,
    pub remaining_ms: i64,
}

impl Snapshot {
    /// Decode a stored map. Missing fields take their defaults and an
    /// unreadable phase falls back to Idle.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let config = TimerConfig::from_map(map);
        let phase = map
            .get(keys::CURRENT_STATE)
            .and_then(Value::as_str)
            .and_then(|state| {
                let paused_from = map.get(keys::PAUSED_FROM).and_then(Value::as_str);
                Phase::decode(state, paused_from)
            })
            .unwrap_or_default();
        let current_round = map
            .get(keys::CURRENT_ROUND)
            .and_then(Value::as_i64)
            .unwrap_or(1)
            .clamp(1, i64::from(config.total_rounds)) as u32;
        let deadline = map.get(keys::TIMER_END_TIMESTAMP).and_then(Value::as_i64);
        // A paused interval can never have more left than its full length.
        let longest_ms = Interval::Focus
            .duration_ms(&config)
            .max(Interval::Break.duration_ms(&config));
        let remaining_ms = map
            .get(keys::REMAINING_MILLIS)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .clamp(0, longest_ms);

        let snapshot = Self {
            config,
            current_round,
            phase,
            deadline,
            remaining_ms,
        };
        snapshot.normalized()
    }

    fn normalized(self) -> Self {
        let schedule = match self.phase {
            Phase::Idle => Schedule::idle(),
            Phase::Running(_) if self.deadline.is_none() => Schedule::idle(),
            Phase::Running(_) => Schedule {
                remaining_ms: 0,
                ..self.schedule()
            },
            Phase::Paused(_) => Schedule {
                deadline: None,
                ..self.schedule()
            },
            Phase::Completed => Schedule {
                deadline: None,
                remaining_ms: 0,
                ..self.schedule()
            },
        };
        self.with_schedule(schedule)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            phase: self.phase,
            current_round: self.current_round,
            deadline: self.deadline,
            remaining_ms: self.remaining_ms,
        }
    }

    fn with_schedule(self, schedule: Schedule) -> Self {
        Self {
            phase: schedule.phase,
            current_round: schedule.current_round,
            deadline: schedule.deadline,
            remaining_ms: schedule.remaining_ms,
            ..self
        }
    }

    /// Time left at `now_ms`, clamped to zero
    pub fn remaining_at(&self, now_ms: i64) -> i64 {
        match self.phase {
            Phase::Running(_) => self
                .deadline
                .map_or(0, |deadline| deadline.saturating_sub(now_ms).max(0)),
            Phase::Paused(_) => self.remaining_ms.max(0),
            Phase::Idle | Phase::Completed => 0,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::from_map(&Map::new())
    }
}

/// Render milliseconds as `MM:SS`
pub fn format_remaining(remaining_ms: i64) -> String {
    let total_seconds = remaining_ms.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
