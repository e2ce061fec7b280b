use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::leak_monitor::{SessionSettings, DEFAULT_LEAK_THRESHOLD_LPM};
use crate::services::usage::UsageSettings;

const MIN_SAMPLE_INTERVAL_MS: u64 = 100;
const MAX_RECENT_LEAKS_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct WaterConfig {
    /// `None` runs the service in demo mode on the in-memory store.
    pub database_url: Option<String>,
    pub migrations_dir: PathBuf,
    pub apply_migrations: bool,
    pub sample_interval: Duration,
    pub leak_threshold_lpm: f64,
    pub usage_interval: Duration,
    pub daily_limit_litres: f64,
    pub cost_per_litre: f64,
    pub recent_leaks_limit: i64,
}

impl Default for WaterConfig {
    fn default() -> Self {
        let usage = UsageSettings::default();
        Self {
            database_url: None,
            migrations_dir: PathBuf::from("migrations"),
            apply_migrations: true,
            sample_interval: Duration::from_millis(5_000),
            leak_threshold_lpm: DEFAULT_LEAK_THRESHOLD_LPM,
            usage_interval: usage.interval,
            daily_limit_litres: usage.daily_limit_litres,
            cost_per_litre: usage.cost_per_litre,
            recent_leaks_limit: 5,
        }
    }
}

impl WaterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let sample_interval_ms = env_u64(&get, "WATER_SAMPLE_INTERVAL_MS", 5_000);
        if sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            anyhow::bail!(
                "WATER_SAMPLE_INTERVAL_MS must be at least {MIN_SAMPLE_INTERVAL_MS} (got {sample_interval_ms})"
            );
        }
        let usage_interval_ms = env_u64(&get, "WATER_USAGE_INTERVAL_MS", 10_000);
        if usage_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            anyhow::bail!(
                "WATER_USAGE_INTERVAL_MS must be at least {MIN_SAMPLE_INTERVAL_MS} (got {usage_interval_ms})"
            );
        }

        let leak_threshold_lpm = env_f64(&get, "WATER_LEAK_THRESHOLD_LPM", DEFAULT_LEAK_THRESHOLD_LPM);
        if !leak_threshold_lpm.is_finite() || leak_threshold_lpm < 0.0 {
            anyhow::bail!("WATER_LEAK_THRESHOLD_LPM must be a non-negative number");
        }
        let daily_limit_litres = env_f64(&get, "WATER_DAILY_LIMIT_LITRES", defaults.daily_limit_litres);
        if !daily_limit_litres.is_finite() || daily_limit_litres <= 0.0 {
            anyhow::bail!("WATER_DAILY_LIMIT_LITRES must be positive");
        }
        let cost_per_litre = env_f64(&get, "WATER_COST_PER_LITRE", defaults.cost_per_litre);
        if !cost_per_litre.is_finite() || cost_per_litre < 0.0 {
            anyhow::bail!("WATER_COST_PER_LITRE must be a non-negative number");
        }

        let recent_leaks_limit = (env_u64(&get, "WATER_RECENT_LEAKS_LIMIT", 5) as i64)
            .clamp(1, MAX_RECENT_LEAKS_LIMIT);

        Ok(Self {
            database_url: env_optional_string(&get, "WATER_DATABASE_URL"),
            migrations_dir: PathBuf::from(env_string(&get, "WATER_MIGRATIONS_DIR", "migrations")),
            apply_migrations: env_bool(&get, "WATER_APPLY_MIGRATIONS", true),
            sample_interval: Duration::from_millis(sample_interval_ms),
            leak_threshold_lpm,
            usage_interval: Duration::from_millis(usage_interval_ms),
            daily_limit_litres,
            cost_per_litre,
            recent_leaks_limit,
        })
    }

    pub fn usage_settings(&self) -> UsageSettings {
        UsageSettings {
            interval: self.usage_interval,
            daily_limit_litres: self.daily_limit_litres,
            cost_per_litre: self.cost_per_litre,
            ..UsageSettings::default()
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sample_interval: self.sample_interval,
            threshold_lpm: self.leak_threshold_lpm,
            recent_limit: self.recent_leaks_limit,
            usage: self.usage_settings(),
        }
    }
}

fn env_optional_string(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_string(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    env_optional_string(get, key).unwrap_or_else(|| default.to_string())
}

fn env_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match get(key).map(|value| value.trim().to_lowercase()) {
        Some(value) if value == "1" || value == "true" || value == "yes" => true,
        Some(value) if value == "0" || value == "false" || value == "no" => false,
        _ => default,
    }
}

fn env_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    get(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(get: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    get(key)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(default)
}
