use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{CommandExecutor, MonitorCommand, MonitorSession, MonitorSnapshot, SessionSettings};
use crate::services::flow_sim::{Draws, FlowSimulator, RandomDraws};
use crate::services::notifier::Notifier;
use crate::services::usage::UsageMeter;
use crate::store::Store;

struct SessionHandle {
    cancel: CancellationToken,
    snapshot: watch::Receiver<MonitorSnapshot>,
    executor: CommandExecutor,
}

/// At most one running monitoring session per user.
pub struct MonitorRegistry {
    store: Arc<dyn Store>,
    notifier: Notifier,
    settings: SessionSettings,
    shutdown: CancellationToken,
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl MonitorRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Notifier,
        settings: SessionSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
            shutdown,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when the user already has a running session.
    pub async fn start(&self, user_id: Uuid) -> bool {
        self.launch(
            user_id,
            Box::new(RandomDraws::from_entropy()),
            Box::new(RandomDraws::from_entropy()),
        )
        .await
    }

    #[cfg(test)]
    pub(crate) async fn start_with_draws(
        &self,
        user_id: Uuid,
        flow_draws: Box<dyn Draws>,
        usage_draws: Box<dyn Draws>,
    ) -> bool {
        self.launch(user_id, flow_draws, usage_draws).await
    }

    async fn launch(
        &self,
        user_id: Uuid,
        flow_draws: Box<dyn Draws>,
        usage_draws: Box<dyn Draws>,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&user_id) {
            if !existing.cancel.is_cancelled() {
                return false;
            }
        }

        let (session, snapshot) = MonitorSession::new(
            user_id,
            self.settings.clone(),
            FlowSimulator::new(flow_draws),
            UsageMeter::new(self.settings.usage.clone(), usage_draws),
        );
        let executor = CommandExecutor::new(
            user_id,
            self.store.clone(),
            self.notifier.clone(),
            self.settings.recent_limit,
            session.snapshot_sender(),
        );
        let cancel = self.shutdown.child_token();
        tokio::spawn(session.run(executor.clone(), cancel.clone()));

        sessions.insert(
            user_id,
            SessionHandle {
                cancel,
                snapshot,
                executor,
            },
        );
        true
    }

    /// Returns false when no session was running.
    pub async fn stop(&self, user_id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.remove(&user_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self, user_id: Uuid) -> Option<MonitorSnapshot> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&user_id)
            .map(|handle| handle.snapshot.borrow().clone())
    }

    pub async fn is_running(&self, user_id: Uuid) -> bool {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&user_id)
            .map(|handle| !handle.cancel.is_cancelled())
            .unwrap_or(false)
    }

    /// Reloads the recent leak list of a running session, e.g. after a resolution.
    pub async fn refresh_recent(&self, user_id: Uuid) {
        let sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(&user_id) {
            handle.executor.spawn(vec![MonitorCommand::RefreshRecent]);
        }
    }

    pub async fn stop_all(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        for (_, handle) in sessions.drain() {
            handle.cancel.cancel();
        }
        count
    }
}
