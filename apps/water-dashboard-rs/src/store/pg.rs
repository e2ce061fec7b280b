use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    parse_leak_status, CommunityStats, LeakEvent, LeakResolution, LeakStatus, NewLeak,
    ResolveApplied, Store, StoreError, StoreResult, Technician, Tip,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LeakRow {
    id: Uuid,
    user_id: Uuid,
    flow_rate: f64,
    status: String,
    detected_at: DateTime<Utc>,
    fixed_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeakRow> for LeakEvent {
    type Error = StoreError;

    fn try_from(row: LeakRow) -> Result<Self, Self::Error> {
        let status = parse_leak_status(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("leak {} has unknown status {:?}", row.id, row.status))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            flow_rate: row.flow_rate,
            status,
            detected_at: row.detected_at,
            fixed_at: row.fixed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CommunityStatsRow {
    user_id: Uuid,
    leaks_fixed: i64,
    total_saved_litres: i64,
    rank: Option<i32>,
}

#[derive(Debug, FromRow)]
struct TipRow {
    id: Uuid,
    title: String,
    content: String,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TechnicianRow {
    id: Uuid,
    full_name: String,
    location: Option<String>,
    specialization: Option<String>,
    rating: f64,
    phone: Option<String>,
    email: Option<String>,
    available: bool,
}

#[async_trait]
impl Store for PgStore {
    async fn insert_leak(&self, leak: NewLeak) -> StoreResult<LeakEvent> {
        let row: LeakRow = sqlx::query_as(
            r#"
            INSERT INTO leak_detections (id, user_id, flow_rate, status, detected_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, flow_rate, status, detected_at, fixed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(leak.user_id)
        .bind(leak.flow_rate)
        .bind(LeakStatus::Active.as_str())
        .bind(leak.detected_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_leak(&self, leak_id: Uuid) -> StoreResult<Option<LeakEvent>> {
        let row: Option<LeakRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, flow_rate, status, detected_at, fixed_at
            FROM leak_detections
            WHERE id = $1
            "#,
        )
        .bind(leak_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(LeakEvent::try_from).transpose()
    }

    async fn recent_leaks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<LeakEvent>> {
        let rows: Vec<LeakRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, flow_rate, status, detected_at, fixed_at
            FROM leak_detections
            WHERE user_id = $1
            ORDER BY detected_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LeakEvent::try_from).collect()
    }

    async fn resolve_leak(&self, resolution: &LeakResolution) -> StoreResult<ResolveApplied> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT status
            FROM leak_detections
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(resolution.leak_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((status,)) = current else {
            tx.rollback().await?;
            return Ok(ResolveApplied::NotFound);
        };
        if parse_leak_status(&status) != Some(LeakStatus::Active) {
            tx.rollback().await?;
            return Ok(ResolveApplied::AlreadyFixed);
        }

        sqlx::query(
            r#"
            UPDATE leak_detections
            SET status = $2, fixed_at = $3
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(resolution.leak_id)
        .bind(LeakStatus::Fixed.as_str())
        .bind(resolution.fixed_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO community_stats (user_id, leaks_fixed, total_saved_litres)
            VALUES ($1, 1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET
                leaks_fixed = community_stats.leaks_fixed + 1,
                total_saved_litres = community_stats.total_saved_litres + EXCLUDED.total_saved_litres
            "#,
        )
        .bind(resolution.user_id)
        .bind(resolution.water_saved_litres)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ResolveApplied::Applied)
    }

    async fn community_stats(&self, user_id: Uuid) -> StoreResult<Option<CommunityStats>> {
        let row: Option<CommunityStatsRow> = sqlx::query_as(
            r#"
            SELECT user_id, leaks_fixed, total_saved_litres, rank
            FROM community_stats
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| CommunityStats {
            user_id: row.user_id,
            leaks_fixed: row.leaks_fixed,
            total_saved_litres: row.total_saved_litres,
            rank: row.rank,
        }))
    }

    async fn list_tips(&self) -> StoreResult<Vec<Tip>> {
        let rows: Vec<TipRow> = sqlx::query_as(
            r#"
            SELECT id, title, content, category, created_at
            FROM sustainability_tips
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Tip {
                id: row.id,
                title: row.title,
                content: row.content,
                category: row.category,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn list_available_technicians(&self) -> StoreResult<Vec<Technician>> {
        let rows: Vec<TechnicianRow> = sqlx::query_as(
            r#"
            SELECT id, full_name, location, specialization, rating, phone, email, available
            FROM technicians
            WHERE available = TRUE
            ORDER BY rating DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Technician {
                id: row.id,
                full_name: row.full_name,
                location: row.location,
                specialization: row.specialization,
                rating: row.rating,
                phone: row.phone,
                email: row.email,
                available: row.available,
            })
            .collect())
    }
}
