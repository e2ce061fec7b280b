use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use water_dashboard_rs::services::leak_monitor::MonitorRegistry;
use water_dashboard_rs::services::notifier::Notifier;
use water_dashboard_rs::store::{MemoryStore, PgStore, Store};
use water_dashboard_rs::{cli, config, db, openapi, routes, state};

async fn bind_listener(args: &cli::Args) -> Result<TcpListener> {
    let addr = format!("{}:{}", args.host, args.port);
    TcpListener::bind(&addr).await.with_context(|| {
        format!("cannot listen on {addr}; pick another address with --host/--port")
    })
}

async fn open_store(config: &config::WaterConfig) -> Result<Arc<dyn Store>> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("WATER_DATABASE_URL not set; running in demo mode on the in-memory store");
        return Ok(Arc::new(MemoryStore::with_demo_content()));
    };

    let pool = db::connect_lazy(database_url)?;
    if config.apply_migrations {
        db::apply_migrations(&pool, &config.migrations_dir)
            .await
            .context("failed to apply migrations")?;
    }
    Ok(Arc::new(PgStore::new(pool)))
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    if args.print_openapi {
        println!(
            "{}",
            serde_json::to_string_pretty(&openapi::openapi_json())?
        );
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::WaterConfig::from_env()?;
    let store = open_store(&config).await?;

    let cancel = CancellationToken::new();
    let notifier = Notifier::default();
    let monitors = Arc::new(MonitorRegistry::new(
        store.clone(),
        notifier.clone(),
        config.session_settings(),
        cancel.clone(),
    ));

    let state = state::AppState {
        config: config.clone(),
        store,
        notifier,
        monitors: monitors.clone(),
    };

    let app = routes::router(state).layer(CorsLayer::permissive());
    let listener = bind_listener(&args).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        threshold_lpm = config.leak_threshold_lpm,
        sample_interval_ms = config.sample_interval.as_millis() as u64,
        "water-dashboard-rs listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    let stopped = monitors.stop_all().await;
    tracing::info!(sessions = stopped, "monitoring sessions stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use water_dashboard_rs::config::WaterConfig;

    #[tokio::test]
    async fn listener_uses_host_and_port_from_the_command_line() -> Result<()> {
        let args =
            cli::Args::parse_from(["water-dashboard-rs", "--host", "127.0.0.1", "--port", "0"]);
        let listener = bind_listener(&args).await?;
        let addr = listener.local_addr()?;
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        let taken = cli::Args::parse_from([
            "water-dashboard-rs",
            "--port",
            &addr.port().to_string(),
        ]);
        let err = bind_listener(&taken).await.unwrap_err();
        assert!(err.to_string().contains("--host/--port"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn demo_mode_uses_memory_store() -> Result<()> {
        let store = open_store(&WaterConfig::default()).await?;
        assert_eq!(store.list_tips().await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn database_mode_fails_fast_on_missing_migrations() {
        let config = WaterConfig {
            database_url: Some("postgres://water@127.0.0.1:1/water".to_string()),
            migrations_dir: "/nonexistent/water-migrations".into(),
            apply_migrations: true,
            ..WaterConfig::default()
        };
        let err = open_store(&config).await.err().expect("missing migrations");
        assert!(err.to_string().contains("failed to apply migrations"), "{err}");
    }
}
