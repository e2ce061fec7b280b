use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{MonitorCommand, MonitorSnapshot};
use crate::services::notifier::{Notification, Notifier};
use crate::store::{LeakEvent, NewLeak, Store};

/// Runs the side effects of one session. Each command is attempted once; failures are
/// logged and never stop the session.
///
/// Refreshes of the recent leak list are numbered when issued. A refresh whose read finishes
/// after a newer one has been applied is discarded, so the snapshot never regresses.
#[derive(Clone)]
pub struct CommandExecutor {
    user_id: Uuid,
    store: Arc<dyn Store>,
    notifier: Notifier,
    recent_limit: i64,
    snapshot: Arc<watch::Sender<MonitorSnapshot>>,
    refresh_issued: Arc<AtomicU64>,
    refresh_applied: Arc<AtomicU64>,
}

impl CommandExecutor {
    pub fn new(
        user_id: Uuid,
        store: Arc<dyn Store>,
        notifier: Notifier,
        recent_limit: i64,
        snapshot: Arc<watch::Sender<MonitorSnapshot>>,
    ) -> Self {
        Self {
            user_id,
            store,
            notifier,
            recent_limit: recent_limit.max(1),
            snapshot,
            refresh_issued: Arc::new(AtomicU64::new(0)),
            refresh_applied: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs `commands` in order on a background task.
    pub fn spawn(&self, commands: Vec<MonitorCommand>) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move { executor.execute_all(commands).await })
    }

    pub async fn execute_all(&self, commands: Vec<MonitorCommand>) {
        for command in commands {
            self.execute(command).await;
        }
    }

    pub async fn execute(&self, command: MonitorCommand) {
        match command {
            MonitorCommand::RecordLeak {
                flow_rate,
                detected_at,
            } => {
                let leak = NewLeak {
                    user_id: self.user_id,
                    flow_rate,
                    detected_at,
                };
                match self.store.insert_leak(leak).await {
                    Ok(event) => {
                        tracing::info!(
                            user_id = %self.user_id,
                            leak_id = %event.id,
                            flow_rate,
                            "leak detected"
                        );
                        self.notifier
                            .publish(Notification::leak_detected(self.user_id, flow_rate, detected_at));
                    }
                    Err(err) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            flow_rate,
                            error = %err,
                            "failed to record leak; alert suppressed"
                        );
                    }
                }
            }
            MonitorCommand::RefreshRecent => {
                let ticket = self.refresh_issued.fetch_add(1, Ordering::SeqCst) + 1;
                match self.store.recent_leaks(self.user_id, self.recent_limit).await {
                    Ok(recent) => self.apply_recent(ticket, recent),
                    Err(err) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            error = %err,
                            "failed to refresh recent leaks"
                        );
                    }
                }
            }
        }
    }

    fn apply_recent(&self, ticket: u64, recent: Vec<LeakEvent>) {
        // The watch lock orders competing refreshes.
        let applied = self.snapshot.send_if_modified(|snapshot| {
            if self.refresh_applied.load(Ordering::SeqCst) >= ticket {
                return false;
            }
            self.refresh_applied.store(ticket, Ordering::SeqCst);
            snapshot.recent = recent;
            true
        });
        if !applied {
            tracing::debug!(user_id = %self.user_id, ticket, "discarded stale recent leak list");
        }
    }
}
