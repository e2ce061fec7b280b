use serde::Serialize;
use std::time::Duration;

use crate::services::flow_sim::Draws;

const MAX_STEP_LITRES: f64 = 5.0;

/// Demo week shown until real metering exists.
pub const WEEKLY_DEMO_USAGE: [(&str, f64); 7] = [
    ("Mon", 280.0),
    ("Tue", 250.0),
    ("Wed", 290.0),
    ("Thu", 230.0),
    ("Fri", 265.0),
    ("Sat", 310.0),
    ("Sun", 245.0),
];

#[derive(Debug, Clone)]
pub struct UsageSettings {
    pub interval: Duration,
    pub starting_litres: f64,
    pub daily_limit_litres: f64,
    pub cost_per_litre: f64,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            starting_litres: 245.0,
            daily_limit_litres: 400.0,
            cost_per_litre: 0.015,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct WeeklyUsagePoint {
    pub day: String,
    pub usage_litres: f64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UsageSnapshot {
    pub today_litres: f64,
    pub daily_limit_litres: f64,
    pub fill_percent: f64,
    pub cost_estimate: f64,
    pub weekly: Vec<WeeklyUsagePoint>,
    pub weekly_average_litres: f64,
}

pub fn fill_percent(usage: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 100.0;
    }
    (usage / limit * 100.0).clamp(0.0, 100.0)
}

pub fn weekly_average(points: &[WeeklyUsagePoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|point| point.usage_litres).sum::<f64>() / points.len() as f64
}

/// Simulated running total of today's consumption.
pub struct UsageMeter {
    settings: UsageSettings,
    today_litres: f64,
    draws: Box<dyn Draws>,
}

impl UsageMeter {
    pub fn new(settings: UsageSettings, draws: Box<dyn Draws>) -> Self {
        let today_litres = settings.starting_litres.min(settings.daily_limit_litres);
        Self {
            settings,
            today_litres,
            draws,
        }
    }

    pub fn advance(&mut self) -> f64 {
        let step = self.draws.next_draw() * MAX_STEP_LITRES;
        self.today_litres = (self.today_litres + step).min(self.settings.daily_limit_litres);
        self.today_litres
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        usage_snapshot(&self.settings, self.today_litres)
    }
}

/// Usage view for a user with no running session.
pub fn baseline_snapshot(settings: &UsageSettings) -> UsageSnapshot {
    usage_snapshot(
        settings,
        settings.starting_litres.min(settings.daily_limit_litres),
    )
}

fn usage_snapshot(settings: &UsageSettings, today_litres: f64) -> UsageSnapshot {
    let weekly: Vec<WeeklyUsagePoint> = WEEKLY_DEMO_USAGE
        .iter()
        .map(|(day, usage)| WeeklyUsagePoint {
            day: day.to_string(),
            usage_litres: *usage,
        })
        .collect();
    let weekly_average_litres = weekly_average(&weekly);
    UsageSnapshot {
        today_litres,
        daily_limit_litres: settings.daily_limit_litres,
        fill_percent: fill_percent(today_litres, settings.daily_limit_litres),
        cost_estimate: today_litres * settings.cost_per_litre,
        weekly,
        weekly_average_litres,
    }
}
