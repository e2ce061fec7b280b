use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommunityStats, LeakEvent, LeakResolution, LeakStatus, NewLeak, ResolveApplied, Store,
    StoreError, StoreResult, Technician, Tip,
};

#[derive(Debug, Default)]
struct Tables {
    leaks: Vec<LeakEvent>,
    stats: HashMap<Uuid, CommunityStats>,
    tips: Vec<Tip>,
    technicians: Vec<Technician>,
}

/// In-process backend used in demo mode and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_content() -> Self {
        let now = Utc::now();
        let tips = [
            (
                "Fix dripping taps",
                "A tap dripping once per second wastes over 10,000 litres a year. Replace worn washers.",
                "maintenance",
            ),
            (
                "Shorter showers",
                "Cutting a shower by two minutes saves around 20 litres.",
                "daily habits",
            ),
            (
                "Water the garden early",
                "Irrigate before 8am to reduce evaporation losses.",
                "gardening",
            ),
            (
                "Install a dual-flush cistern",
                "Dual-flush toilets use up to 60% less water per flush.",
                "upgrades",
            ),
        ];
        let tips = tips
            .into_iter()
            .enumerate()
            .map(|(idx, (title, content, category))| Tip {
                id: Uuid::new_v4(),
                title: title.to_string(),
                content: content.to_string(),
                category: Some(category.to_string()),
                created_at: now - Duration::days(idx as i64),
            })
            .collect();

        let technicians = [
            ("Thabo Nkosi", "Soweto", "Leak repair", 4.9, true),
            ("Lerato Dlamini", "Sandton", "Geyser maintenance", 4.7, true),
            ("Pieter van Wyk", "Randburg", "Irrigation systems", 4.5, false),
        ];
        let technicians = technicians
            .into_iter()
            .map(
                |(full_name, location, specialization, rating, available)| Technician {
                    id: Uuid::new_v4(),
                    full_name: full_name.to_string(),
                    location: Some(location.to_string()),
                    specialization: Some(specialization.to_string()),
                    rating,
                    phone: None,
                    email: None,
                    available,
                },
            )
            .collect();

        Self {
            tables: RwLock::new(Tables {
                tips,
                technicians,
                ..Tables::default()
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every write fail with `StoreError::Unavailable` until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    pub async fn seed_stats(&self, stats: CommunityStats) {
        let mut tables = self.tables.write().await;
        tables.stats.insert(stats.user_id, stats);
    }

    pub async fn leak_count(&self, user_id: Uuid) -> usize {
        let tables = self.tables.read().await;
        tables
            .leaks
            .iter()
            .filter(|leak| leak.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_leak(&self, leak: NewLeak) -> StoreResult<LeakEvent> {
        self.check_writable()?;
        let event = LeakEvent {
            id: Uuid::new_v4(),
            user_id: leak.user_id,
            flow_rate: leak.flow_rate,
            status: LeakStatus::Active,
            detected_at: leak.detected_at,
            fixed_at: None,
        };
        let mut tables = self.tables.write().await;
        tables.leaks.push(event.clone());
        Ok(event)
    }

    async fn get_leak(&self, leak_id: Uuid) -> StoreResult<Option<LeakEvent>> {
        let tables = self.tables.read().await;
        Ok(tables.leaks.iter().find(|leak| leak.id == leak_id).cloned())
    }

    async fn recent_leaks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<LeakEvent>> {
        let tables = self.tables.read().await;
        let mut leaks: Vec<LeakEvent> = tables
            .leaks
            .iter()
            .filter(|leak| leak.user_id == user_id)
            .cloned()
            .collect();
        leaks.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        leaks.truncate(limit.max(1) as usize);
        Ok(leaks)
    }

    async fn resolve_leak(&self, resolution: &LeakResolution) -> StoreResult<ResolveApplied> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(leak) = tables
            .leaks
            .iter_mut()
            .find(|leak| leak.id == resolution.leak_id)
        else {
            return Ok(ResolveApplied::NotFound);
        };
        if leak.status != LeakStatus::Active {
            return Ok(ResolveApplied::AlreadyFixed);
        }
        leak.status = LeakStatus::Fixed;
        leak.fixed_at = Some(resolution.fixed_at);

        let stats = tables
            .stats
            .entry(resolution.user_id)
            .or_insert_with(|| CommunityStats {
                user_id: resolution.user_id,
                leaks_fixed: 0,
                total_saved_litres: 0,
                rank: None,
            });
        stats.leaks_fixed += 1;
        stats.total_saved_litres += resolution.water_saved_litres;
        Ok(ResolveApplied::Applied)
    }

    async fn community_stats(&self, user_id: Uuid) -> StoreResult<Option<CommunityStats>> {
        let tables = self.tables.read().await;
        Ok(tables.stats.get(&user_id).cloned())
    }

    async fn list_tips(&self) -> StoreResult<Vec<Tip>> {
        let tables = self.tables.read().await;
        let mut tips = tables.tips.clone();
        tips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tips)
    }

    async fn list_available_technicians(&self) -> StoreResult<Vec<Technician>> {
        let tables = self.tables.read().await;
        let mut technicians: Vec<Technician> = tables
            .technicians
            .iter()
            .filter(|tech| tech.available)
            .cloned()
            .collect();
        technicians.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        Ok(technicians)
    }
}
