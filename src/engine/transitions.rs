//! Pure transition functions of the timer state machine.
//!
//! Each function looks at a snapshot and the current wall-clock time and
//! returns the schedule to persist plus the alerts to emit, or `None` when
//! the command is a no-op in the current phase.

use crate::state::{Interval, Phase, Schedule, Snapshot};

/// Notification owed to the notifier once a transition is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    PhaseStarted(Interval),
    PhaseEnded(Interval),
    AllRoundsCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub schedule: Schedule,
    pub alerts: Vec<Alert>,
}

impl Transition {
    fn new(schedule: Schedule, alerts: Vec<Alert>) -> Self {
        Self { schedule, alerts }
    }
}

/// Idle/Completed begin a fresh cycle; Paused resumes the interval it
/// interrupted. Already running is a no-op.
pub fn start(snapshot: &Snapshot, now_ms: i64) -> Option<Transition> {
    match snapshot.phase {
        Phase::Idle | Phase::Completed => {
            let interval = Interval::Focus;
            Some(Transition::new(
                Schedule {
                    phase: Phase::Running(interval),
                    current_round: 1,
                    deadline: Some(now_ms.saturating_add(interval.duration_ms(&snapshot.config))),
                    remaining_ms: 0,
                },
                vec![Alert::PhaseStarted(interval)],
            ))
        }
        Phase::Paused(interval) => Some(Transition::new(
            Schedule {
                phase: Phase::Running(interval),
                current_round: snapshot.current_round,
                deadline: Some(now_ms.saturating_add(snapshot.remaining_ms.max(0))),
                remaining_ms: 0,
            },
            vec![Alert::PhaseStarted(interval)],
        )),
        Phase::Running(_) => None,
    }
}

pub fn pause(snapshot: &Snapshot, now_ms: i64) -> Option<Transition> {
    let interval = snapshot.phase.running()?;
    Some(Transition::new(
        Schedule {
            phase: Phase::Paused(interval),
            current_round: snapshot.current_round,
            deadline: None,
            remaining_ms: snapshot.remaining_at(now_ms),
        },
        Vec::new(),
    ))
}

/// Always valid, from any phase
pub fn stop() -> Transition {
    Transition::new(Schedule::idle(), Vec::new())
}

/// Deadline expiry. Focus always hands over to its break; a break either
/// opens the next round or, in the last round, completes the cycle.
pub fn expire(snapshot: &Snapshot, now_ms: i64) -> Option<Transition> {
    let interval = snapshot.phase.running()?;
    if snapshot.deadline? > now_ms {
        return None;
    }

    let config = &snapshot.config;
    let transition = match interval {
        Interval::Focus => Transition::new(
            Schedule {
                phase: Phase::Running(Interval::Break),
                current_round: snapshot.current_round,
                deadline: Some(now_ms.saturating_add(Interval::Break.duration_ms(config))),
                remaining_ms: 0,
            },
            vec![Alert::PhaseEnded(Interval::Focus), Alert::PhaseStarted(Interval::Break)],
        ),
        Interval::Break if snapshot.current_round < config.total_rounds => Transition::new(
            Schedule {
                phase: Phase::Running(Interval::Focus),
                current_round: snapshot.current_round + 1,
                deadline: Some(now_ms.saturating_add(Interval::Focus.duration_ms(config))),
                remaining_ms: 0,
            },
            vec![Alert::PhaseEnded(Interval::Break), Alert::PhaseStarted(Interval::Focus)],
        ),
        Interval::Break => Transition::new(
            Schedule {
                phase: Phase::Completed,
                current_round: snapshot.current_round,
                deadline: None,
                remaining_ms: 0,
            },
            vec![Alert::PhaseEnded(Interval::Break), Alert::AllRoundsCompleted],
        ),
    };
    Some(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TimerConfig;

    const MINUTE: i64 = 60_000;

    fn snapshot(config: TimerConfig, schedule: Schedule) -> Snapshot {
        Snapshot {
            config,
            phase: schedule.phase,
            current_round: schedule.current_round,
            deadline: schedule.deadline,
            remaining_ms: schedule.remaining_ms,
        }
    }

    fn short_config() -> TimerConfig {
        TimerConfig::try_new(1, 1, 2).unwrap()
    }

    /// Apply a transition's schedule on top of `from`
    fn apply(from: &Snapshot, transition: &Transition) -> Snapshot {
        snapshot(from.config, transition.schedule)
    }

    #[test]
    fn start_from_idle_opens_first_focus() {
        let idle = snapshot(short_config(), Schedule::idle());
        let t = start(&idle, 1_000).unwrap();
        assert_eq!(t.schedule.phase, Phase::Running(Interval::Focus));
        assert_eq!(t.schedule.current_round, 1);
        assert_eq!(t.schedule.deadline, Some(1_000 + MINUTE));
        assert_eq!(t.alerts, vec![Alert::PhaseStarted(Interval::Focus)]);
    }

    #[test]
    fn start_from_completed_resets_round() {
        let done = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Completed,
                current_round: 2,
                deadline: None,
                remaining_ms: 0,
            },
        );
        let t = start(&done, 0).unwrap();
        assert_eq!(t.schedule.current_round, 1);
        assert_eq!(t.schedule.phase, Phase::Running(Interval::Focus));
    }

    #[test]
    fn start_while_running_is_noop() {
        let running = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Running(Interval::Break),
                current_round: 1,
                deadline: Some(500),
                remaining_ms: 0,
            },
        );
        assert!(start(&running, 0).is_none());
    }

    #[test]
    fn pause_then_resume_keeps_interrupted_interval() {
        for interval in [Interval::Focus, Interval::Break] {
            let running = snapshot(
                short_config(),
                Schedule {
                    phase: Phase::Running(interval),
                    current_round: 2,
                    deadline: Some(50_000),
                    remaining_ms: 0,
                },
            );
            let paused = apply(&running, &pause(&running, 20_000).unwrap());
            assert_eq!(paused.phase, Phase::Paused(interval));
            assert_eq!(paused.remaining_ms, 30_000);
            assert_eq!(paused.deadline, None);

            let resumed = apply(&paused, &start(&paused, 100_000).unwrap());
            assert_eq!(resumed.phase, Phase::Running(interval));
            assert_eq!(resumed.current_round, 2);
            assert_eq!(resumed.deadline, Some(130_000));
            assert_eq!(resumed.remaining_ms, 0);
        }
    }

    #[test]
    fn pause_after_deadline_clamps_remaining() {
        let running = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Running(Interval::Focus),
                current_round: 1,
                deadline: Some(10),
                remaining_ms: 0,
            },
        );
        assert_eq!(pause(&running, 99).unwrap().schedule.remaining_ms, 0);
    }

    #[test]
    fn pause_outside_countdown_is_noop() {
        let config = short_config();
        assert!(pause(&snapshot(config, Schedule::idle()), 0).is_none());
        let paused = Schedule {
            phase: Phase::Paused(Interval::Focus),
            current_round: 1,
            deadline: None,
            remaining_ms: 5,
        };
        assert!(pause(&snapshot(config, paused), 0).is_none());
    }

    #[test]
    fn extreme_clock_values_saturate() {
        let paused = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Paused(Interval::Focus),
                current_round: 1,
                deadline: None,
                remaining_ms: i64::MAX,
            },
        );
        let t = start(&paused, i64::MAX - 10).unwrap();
        assert_eq!(t.schedule.deadline, Some(i64::MAX));

        let running = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Running(Interval::Focus),
                current_round: 1,
                deadline: Some(i64::MIN),
                remaining_ms: 0,
            },
        );
        let t = expire(&running, i64::MAX).unwrap();
        assert_eq!(t.schedule.phase, Phase::Running(Interval::Break));
        assert_eq!(t.schedule.deadline, Some(i64::MAX));
        assert_eq!(pause(&running, 0).unwrap().schedule.remaining_ms, 0);
    }

    #[test]
    fn expiry_waits_for_deadline() {
        let running = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Running(Interval::Focus),
                current_round: 1,
                deadline: Some(MINUTE),
                remaining_ms: 0,
            },
        );
        assert!(expire(&running, MINUTE - 1).is_none());
        assert!(expire(&running, MINUTE).is_some());
    }

    #[test]
    fn full_cycle_with_two_rounds() {
        let mut now = 0;
        let idle = snapshot(short_config(), Schedule::idle());
        let mut current = apply(&idle, &start(&idle, now).unwrap());
        assert_eq!(current.deadline, Some(MINUTE));

        let expected = [
            (Phase::Running(Interval::Break), 1, Some(2 * MINUTE)),
            (Phase::Running(Interval::Focus), 2, Some(3 * MINUTE)),
            (Phase::Running(Interval::Break), 2, Some(4 * MINUTE)),
            (Phase::Completed, 2, None),
        ];
        for (phase, round, deadline) in expected {
            now += MINUTE;
            current = apply(&current, &expire(&current, now).unwrap());
            assert_eq!(current.phase, phase);
            assert_eq!(current.current_round, round);
            assert_eq!(current.deadline, deadline);
        }
        assert!(expire(&current, now + MINUTE).is_none());
    }

    #[test]
    fn final_break_alerts_completion() {
        let last_break = snapshot(
            short_config(),
            Schedule {
                phase: Phase::Running(Interval::Break),
                current_round: 2,
                deadline: Some(0),
                remaining_ms: 0,
            },
        );
        let t = expire(&last_break, 0).unwrap();
        assert_eq!(
            t.alerts,
            vec![Alert::PhaseEnded(Interval::Break), Alert::AllRoundsCompleted]
        );
    }

    #[test]
    fn rounds_never_leave_configured_range() {
        for total in 1..=4 {
            let config = TimerConfig::try_new(1, 1, total).unwrap();
            let mut now = 0;
            let idle = snapshot(config, Schedule::idle());
            let mut current = apply(&idle, &start(&idle, now).unwrap());
            while let Some(t) = expire(&current, now + MINUTE) {
                now += MINUTE;
                current = apply(&current, &t);
                assert!(current.current_round >= 1);
                assert!(i64::from(current.current_round) <= total);
            }
            assert_eq!(current.phase, Phase::Completed);
        }
    }
}
