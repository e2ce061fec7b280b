use crate::config::WaterConfig;
use crate::services::leak_monitor::MonitorRegistry;
use crate::services::notifier::Notifier;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: WaterConfig,
    pub store: Arc<dyn Store>,
    pub notifier: Notifier,
    pub monitors: Arc<MonitorRegistry>,
}
