use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::services::notifier::{Notification, Notifier};
use crate::store::{LeakResolution, LeakStatus, ResolveApplied, Store, StoreResult};

const MINUTES_PER_HOUR: f64 = 60.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;
/// Share of the potential loss credited to a timely repair.
const PREVENTED_WASTE_FACTOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Fixed {
        user_id: Uuid,
        water_saved_litres: i64,
    },
    AlreadyFixed,
    NotFound,
}

/// Litres credited for repairing a leak that ran from `detected_at` until `fixed_at`.
pub fn estimate_water_saved(
    flow_rate_lpm: f64,
    detected_at: DateTime<Utc>,
    fixed_at: DateTime<Utc>,
) -> i64 {
    let elapsed_ms = (fixed_at - detected_at).num_milliseconds().max(0) as f64;
    let elapsed_hours = elapsed_ms / MILLIS_PER_HOUR;
    (flow_rate_lpm.max(0.0) * MINUTES_PER_HOUR * elapsed_hours * PREVENTED_WASTE_FACTOR).round()
        as i64
}

/// Resolves a leak on behalf of its owner. Unknown ids are a silent no-op and a second
/// resolution of the same leak leaves the counters alone.
pub async fn mark_as_fixed(
    store: &dyn Store,
    notifier: &Notifier,
    leak_id: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<FixOutcome> {
    let Some(leak) = store.get_leak(leak_id).await? else {
        tracing::debug!(leak_id = %leak_id, "resolve requested for unknown leak");
        return Ok(FixOutcome::NotFound);
    };
    if leak.status == LeakStatus::Fixed {
        return Ok(FixOutcome::AlreadyFixed);
    }

    let water_saved_litres = estimate_water_saved(leak.flow_rate, leak.detected_at, now);
    let resolution = LeakResolution {
        leak_id,
        user_id: leak.user_id,
        fixed_at: now,
        water_saved_litres,
    };

    let outcome = match store.resolve_leak(&resolution).await? {
        ResolveApplied::Applied => FixOutcome::Fixed {
            user_id: leak.user_id,
            water_saved_litres,
        },
        ResolveApplied::AlreadyFixed => FixOutcome::AlreadyFixed,
        ResolveApplied::NotFound => FixOutcome::NotFound,
    };

    if let FixOutcome::Fixed {
        water_saved_litres, ..
    } = outcome
    {
        tracing::info!(
            leak_id = %leak_id,
            user_id = %leak.user_id,
            water_saved_litres,
            "leak marked fixed"
        );
        notifier.publish(Notification::leak_fixed(leak.user_id, water_saved_litres, now));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CommunityStats, MemoryStore, NewLeak, StoreError};
    use chrono::{Duration, TimeZone};

    #[test]
    fn two_hours_at_25_lpm_saves_900_litres() {
        let detected = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let fixed = detected + Duration::hours(2);
        assert_eq!(estimate_water_saved(25.0, detected, fixed), 900);
    }

    #[test]
    fn water_saved_rounds_and_never_goes_negative() {
        let detected = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        // 30 L/min for 10 minutes: 30 * 60 * (1/6) * 0.3 = 90
        assert_eq!(
            estimate_water_saved(30.0, detected, detected + Duration::minutes(10)),
            90
        );
        // 27.3 L/min for 1 minute: 27.3 * 60 * (1/60) * 0.3 = 8.19
        assert_eq!(
            estimate_water_saved(27.3, detected, detected + Duration::minutes(1)),
            8
        );
        assert_eq!(
            estimate_water_saved(30.0, detected, detected - Duration::hours(1)),
            0
        );
    }

    async fn seeded_leak(
        store: &MemoryStore,
        flow_rate: f64,
        detected_at: DateTime<Utc>,
    ) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        let leak = store
            .insert_leak(NewLeak {
                user_id,
                flow_rate,
                detected_at,
            })
            .await
            .unwrap();
        (leak.id, user_id)
    }

    #[tokio::test]
    async fn fixing_credits_owner_and_notifies() {
        let store = MemoryStore::new();
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let now = Utc::now();
        let (leak_id, user_id) = seeded_leak(&store, 25.0, now - Duration::hours(2)).await;
        store
            .seed_stats(CommunityStats {
                user_id,
                leaks_fixed: 3,
                total_saved_litres: 1250,
                rank: Some(12),
            })
            .await;

        let outcome = mark_as_fixed(&store, &notifier, leak_id, now).await.unwrap();
        assert_eq!(
            outcome,
            FixOutcome::Fixed {
                user_id,
                water_saved_litres: 900
            }
        );

        let stats = store.community_stats(user_id).await.unwrap().unwrap();
        assert_eq!(stats.leaks_fixed, 4);
        assert_eq!(stats.total_saved_litres, 2150);
        assert_eq!(stats.rank, Some(12));

        let leak = store.get_leak(leak_id).await.unwrap().unwrap();
        assert_eq!(leak.status, LeakStatus::Fixed);
        assert_eq!(leak.fixed_at, Some(now));

        let notification = rx.recv().await.unwrap();
        assert!(notification.message.contains("900L"));
    }

    #[tokio::test]
    async fn second_fix_does_not_double_count() {
        let store = MemoryStore::new();
        let notifier = Notifier::default();
        let now = Utc::now();
        let (leak_id, user_id) = seeded_leak(&store, 30.0, now - Duration::hours(1)).await;

        let first = mark_as_fixed(&store, &notifier, leak_id, now).await.unwrap();
        assert!(matches!(first, FixOutcome::Fixed { .. }));
        let second = mark_as_fixed(&store, &notifier, leak_id, now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(second, FixOutcome::AlreadyFixed);

        let stats = store.community_stats(user_id).await.unwrap().unwrap();
        assert_eq!(stats.leaks_fixed, 1);
        assert_eq!(stats.total_saved_litres, 540);
    }

    #[tokio::test]
    async fn unknown_leak_is_a_silent_noop() {
        let store = MemoryStore::new();
        let outcome = mark_as_fixed(&store, &Notifier::default(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome, FixOutcome::NotFound);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_and_changes_nothing() {
        let store = MemoryStore::new();
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let now = Utc::now();
        let (leak_id, user_id) = seeded_leak(&store, 30.0, now - Duration::hours(1)).await;

        store.set_fail_writes(true);
        let err = mark_as_fixed(&store, &notifier, leak_id, now).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.community_stats(user_id).await.unwrap().is_none());
        assert_eq!(
            store.get_leak(leak_id).await.unwrap().unwrap().status,
            LeakStatus::Active
        );
        assert!(rx.try_recv().is_err());
    }
}
