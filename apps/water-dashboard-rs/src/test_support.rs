use crate::config::WaterConfig;
use crate::services::leak_monitor::MonitorRegistry;
use crate::services::notifier::Notifier;
use crate::state::AppState;
use crate::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn test_config() -> WaterConfig {
    WaterConfig {
        sample_interval: Duration::from_millis(20),
        usage_interval: Duration::from_millis(50),
        ..WaterConfig::default()
    }
}

pub fn test_state() -> AppState {
    test_state_with(Arc::new(MemoryStore::with_demo_content()))
}

pub fn test_state_with(store: Arc<MemoryStore>) -> AppState {
    let config = test_config();
    let notifier = Notifier::default();
    let monitors = Arc::new(MonitorRegistry::new(
        store.clone(),
        notifier.clone(),
        config.session_settings(),
        CancellationToken::new(),
    ));
    AppState {
        config,
        store,
        notifier,
        monitors,
    }
}
