use chrono::{DateTime, Utc};
use serde::Serialize;

mod executor;
mod registry;
mod session;

pub use executor::CommandExecutor;
pub use registry::MonitorRegistry;
pub use session::{MonitorSession, MonitorSnapshot, SessionSettings};

pub const DEFAULT_LEAK_THRESHOLD_LPM: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    Inactive,
    Active,
}

impl AlertState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Side effect requested by a transition. Plain data, so a caller can replay it.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCommand {
    RecordLeak {
        flow_rate: f64,
        detected_at: DateTime<Utc>,
    },
    RefreshRecent,
}

/// Edge-triggered classification of one sample. Only the first sample above `threshold`
/// in an excursion emits commands; the first sample at or below it clears the alert.
pub fn transition(
    state: AlertState,
    flow_rate: f64,
    threshold: f64,
    now: DateTime<Utc>,
) -> (AlertState, Vec<MonitorCommand>) {
    match state {
        AlertState::Inactive if flow_rate > threshold => (
            AlertState::Active,
            vec![
                MonitorCommand::RecordLeak {
                    flow_rate,
                    detected_at: now,
                },
                MonitorCommand::RefreshRecent,
            ],
        ),
        AlertState::Active if flow_rate <= threshold => (AlertState::Inactive, Vec::new()),
        unchanged => (unchanged, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(samples: &[f64]) -> (Vec<AlertState>, usize) {
        let now = Utc::now();
        let mut state = AlertState::Inactive;
        let mut states = Vec::new();
        let mut records = 0;
        for sample in samples {
            let (next, commands) = transition(state, *sample, DEFAULT_LEAK_THRESHOLD_LPM, now);
            records += commands
                .iter()
                .filter(|cmd| matches!(cmd, MonitorCommand::RecordLeak { .. }))
                .count();
            state = next;
            states.push(state);
        }
        (states, records)
    }

    #[test]
    fn activates_once_per_excursion_regardless_of_length() {
        let (states, records) = run(&[30.0, 32.0, 38.5, 25.1, 26.0]);
        assert!(states.iter().all(|state| state.is_active()));
        assert_eq!(records, 1);
    }

    #[test]
    fn clears_on_first_sample_at_or_below_threshold() {
        let (states, records) = run(&[30.0, 20.0, 5.0]);
        assert_eq!(
            states,
            vec![AlertState::Active, AlertState::Inactive, AlertState::Inactive]
        );
        assert_eq!(records, 1);
    }

    #[test]
    fn threshold_itself_is_not_a_leak() {
        let (states, records) = run(&[20.0, 19.9, 0.0]);
        assert!(states.iter().all(|state| !state.is_active()));
        assert_eq!(records, 0);
    }

    #[test]
    fn separate_excursions_each_record() {
        let (_, records) = run(&[30.0, 10.0, 31.0, 35.0, 2.0, 27.0]);
        assert_eq!(records, 3);
    }

    #[test]
    fn activation_carries_sample_and_time() {
        let now = Utc::now();
        let (state, commands) = transition(AlertState::Inactive, 33.3, 20.0, now);
        assert_eq!(state, AlertState::Active);
        assert_eq!(
            commands,
            vec![
                MonitorCommand::RecordLeak {
                    flow_rate: 33.3,
                    detected_at: now,
                },
                MonitorCommand::RefreshRecent,
            ]
        );
    }
}
