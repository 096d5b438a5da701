//! On-demand dashboard statistics.
//!
//! Every number is re-derived from the store at call time. There is no
//! cached or incrementally maintained counter state: the store is the
//! single source of counts, so the aggregates cannot drift from the rows
//! they describe. Consistency across the sub-queries is only as strong as
//! the store's own isolation — concurrent ingestion between two sub-queries
//! can skew sibling counts by the events inserted in between.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use fieldwatch_core::event::EventSeverity;
use fieldwatch_db::store::{DashboardStatistics, EventStore, StoreError};

/// How many events the recent-events listings carry.
pub const RECENT_EVENT_LIMIT: i64 = 10;

/// Trailing window, in days, for the per-day counts.
pub const DAILY_COUNT_WINDOW_DAYS: i64 = 30;

/// Computes dashboard aggregates directly from the event store.
pub struct StatisticsAggregator {
    store: Arc<dyn EventStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Build the full dashboard snapshot.
    pub async fn dashboard_statistics(&self) -> Result<DashboardStatistics, StoreError> {
        let now = Utc::now();

        let total_events = self.store.count_events().await?;
        let unacknowledged_events = self.store.count_unacknowledged().await?;

        let by_severity = self.store.counts_by_severity().await?;
        let severity_count = |severity: EventSeverity| {
            by_severity
                .iter()
                .find(|(s, _)| *s == severity)
                .map(|(_, count)| *count)
                .unwrap_or(0)
        };

        let event_counts_by_severity: BTreeMap<String, i64> = by_severity
            .iter()
            .map(|(severity, count)| (severity.as_str().to_string(), *count))
            .collect();

        let event_counts_by_type: BTreeMap<String, i64> = self
            .store
            .counts_by_type()
            .await?
            .into_iter()
            .map(|(event_type, count)| (event_type.as_str().to_string(), count))
            .collect();

        let recent_critical_events = self
            .store
            .recent_by_severity(EventSeverity::Critical, RECENT_EVENT_LIMIT)
            .await?;

        let recent_events = self
            .store
            .recent_since(now - Duration::hours(24), RECENT_EVENT_LIMIT)
            .await?;

        let daily_event_counts: BTreeMap<String, i64> = self
            .store
            .daily_counts_since(now - Duration::days(DAILY_COUNT_WINDOW_DAYS))
            .await?
            .into_iter()
            .map(|(day, count)| (day.to_string(), count))
            .collect();

        Ok(DashboardStatistics {
            total_events,
            unacknowledged_events,
            critical_events: severity_count(EventSeverity::Critical),
            warning_events: severity_count(EventSeverity::Warning),
            info_events: severity_count(EventSeverity::Info),
            event_counts_by_type,
            event_counts_by_severity,
            recent_critical_events,
            recent_events,
            daily_event_counts,
            events_last_24_hours: self.store.count_between(now - Duration::hours(24), now).await?,
            events_last_7_days: self.store.count_between(now - Duration::days(7), now).await?,
            events_last_30_days: self.store.count_between(now - Duration::days(30), now).await?,
        })
    }
}
