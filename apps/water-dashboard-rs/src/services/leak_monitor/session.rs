use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{transition, AlertState, CommandExecutor, MonitorCommand};
use crate::services::flow_sim::{FlowBand, FlowSimulator};
use crate::services::usage::{UsageMeter, UsageSettings, UsageSnapshot};
use crate::store::LeakEvent;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub sample_interval: Duration,
    pub threshold_lpm: f64,
    pub recent_limit: i64,
    pub usage: UsageSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            threshold_lpm: super::DEFAULT_LEAK_THRESHOLD_LPM,
            recent_limit: 5,
            usage: UsageSettings::default(),
        }
    }
}

/// Read-only view of a session, published after every change.
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub user_id: Uuid,
    pub flow_rate: f64,
    pub band: Option<FlowBand>,
    pub alert: AlertState,
    pub sampled_at: Option<DateTime<Utc>>,
    pub recent: Vec<LeakEvent>,
    pub usage: UsageSnapshot,
}

/// One user's simulator and alert state machine. The session is the only writer of its state.
pub struct MonitorSession {
    user_id: Uuid,
    settings: SessionSettings,
    simulator: FlowSimulator,
    usage: UsageMeter,
    alert: AlertState,
    flow_rate: f64,
    snapshot: Arc<watch::Sender<MonitorSnapshot>>,
}

impl MonitorSession {
    pub fn new(
        user_id: Uuid,
        settings: SessionSettings,
        simulator: FlowSimulator,
        usage: UsageMeter,
    ) -> (Self, watch::Receiver<MonitorSnapshot>) {
        let initial = MonitorSnapshot {
            user_id,
            flow_rate: 0.0,
            band: None,
            alert: AlertState::Inactive,
            sampled_at: None,
            recent: Vec::new(),
            usage: usage.snapshot(),
        };
        let (tx, rx) = watch::channel(initial);
        let session = Self {
            user_id,
            settings,
            simulator,
            usage,
            alert: AlertState::Inactive,
            flow_rate: 0.0,
            snapshot: Arc::new(tx),
        };
        (session, rx)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn alert_state(&self) -> AlertState {
        self.alert
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn snapshot_sender(&self) -> Arc<watch::Sender<MonitorSnapshot>> {
        self.snapshot.clone()
    }

    /// Draws one sample, applies the transition and returns the side effects to run.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<MonitorCommand> {
        let sample = self.simulator.next_sample();
        let (next, commands) = transition(
            self.alert,
            sample.litres_per_minute,
            self.settings.threshold_lpm,
            now,
        );
        if next != self.alert {
            tracing::debug!(
                user_id = %self.user_id,
                flow_rate = sample.litres_per_minute,
                from = ?self.alert,
                to = ?next,
                "alert state changed"
            );
        }
        self.alert = next;
        self.flow_rate = sample.litres_per_minute;

        self.snapshot.send_modify(|snapshot| {
            snapshot.flow_rate = sample.litres_per_minute;
            snapshot.band = Some(sample.band);
            snapshot.alert = next;
            snapshot.sampled_at = Some(now);
        });
        commands
    }

    pub fn tick_usage(&mut self) {
        self.usage.advance();
        let usage = self.usage.snapshot();
        self.snapshot.send_modify(|snapshot| snapshot.usage = usage);
    }

    /// Drives the session until `cancel` fires. Commands run on their own task so a slow
    /// store never delays the next sample.
    pub async fn run(mut self, executor: CommandExecutor, cancel: CancellationToken) {
        let sample_period = self.settings.sample_interval;
        let usage_period = self.settings.usage.interval;
        let mut samples = interval_at(Instant::now() + sample_period, sample_period);
        samples.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut usage = interval_at(Instant::now() + usage_period, usage_period);
        usage.set_missed_tick_behavior(MissedTickBehavior::Delay);

        executor.spawn(vec![MonitorCommand::RefreshRecent]);
        tracing::info!(user_id = %self.user_id, "monitoring session started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = samples.tick() => {
                    let commands = self.tick(Utc::now());
                    if !commands.is_empty() {
                        executor.spawn(commands);
                    }
                }
                _ = usage.tick() => self.tick_usage(),
            }
        }

        tracing::info!(user_id = %self.user_id, "monitoring session stopped");
    }
}
