#[cfg(test)]
mod delayed;
mod memory;
mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
pub(crate) use delayed::DelayedStore;
pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid stored value: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeakStatus {
    Active,
    Fixed,
}

impl LeakStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Fixed => "fixed",
        }
    }
}

pub fn parse_leak_status(value: &str) -> Option<LeakStatus> {
    match value.trim().to_lowercase().as_str() {
        "active" => Some(LeakStatus::Active),
        "fixed" => Some(LeakStatus::Fixed),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeakEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flow_rate: f64,
    pub status: LeakStatus,
    pub detected_at: DateTime<Utc>,
    pub fixed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewLeak {
    pub user_id: Uuid,
    pub flow_rate: f64,
    pub detected_at: DateTime<Utc>,
}

/// Status change plus counter increments, applied by the store as one unit.
#[derive(Debug, Clone)]
pub struct LeakResolution {
    pub leak_id: Uuid,
    pub user_id: Uuid,
    pub fixed_at: DateTime<Utc>,
    pub water_saved_litres: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveApplied {
    Applied,
    AlreadyFixed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityStats {
    pub user_id: Uuid,
    pub leaks_fixed: i64,
    pub total_saved_litres: i64,
    pub rank: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Tip {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Technician {
    pub id: Uuid,
    pub full_name: String,
    pub location: Option<String>,
    pub specialization: Option<String>,
    pub rating: f64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub available: bool,
}

/// CRUD surface of the dashboard backend.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_leak(&self, leak: NewLeak) -> StoreResult<LeakEvent>;

    async fn get_leak(&self, leak_id: Uuid) -> StoreResult<Option<LeakEvent>>;

    /// Newest first.
    async fn recent_leaks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<LeakEvent>>;

    /// Marks the leak fixed and bumps the owner's counters. Only an active leak is changed;
    /// counters never move for a leak that was already fixed.
    async fn resolve_leak(&self, resolution: &LeakResolution) -> StoreResult<ResolveApplied>;

    async fn community_stats(&self, user_id: Uuid) -> StoreResult<Option<CommunityStats>>;

    async fn list_tips(&self) -> StoreResult<Vec<Tip>>;

    async fn list_available_technicians(&self) -> StoreResult<Vec<Technician>>;
}
