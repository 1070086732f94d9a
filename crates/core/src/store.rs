//! Store contract — the operations the billing checker and the report
//! generator need from the document store holding client records.
//!
//! Jobs accept a `&dyn ClientStore`; the handle is opened before a run and
//! closed by the caller on every exit path.

use crate::error::UpkeepResult;
use crate::types::{AnalyticsReport, AutomationLogEntry, ClientStatus, PaymentRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Field of an active client record used as a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Status,
    Plan,
}

impl GroupKey {
    /// Field name in the stored document.
    pub fn field(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Plan => "plan",
        }
    }
}

/// One row of a group-by-count over active clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub key: String,
    pub count: u64,
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Flag every active, not-yet-due client whose billing date is before
    /// `now` as due, in one filtered bulk write. Returns the modified count.
    async fn mark_overdue_as_due(&self, now: DateTime<Utc>) -> UpkeepResult<u64>;

    /// Count active clients, optionally restricted to one status.
    async fn count_active(&self, status: Option<ClientStatus>) -> UpkeepResult<u64>;

    /// Group active clients by `key` and count each group.
    async fn group_active_by(&self, key: GroupKey) -> UpkeepResult<Vec<GroupCount>>;

    /// Payment history of active clients flattened to one row per payment,
    /// keeping only payments on or after `since` when given.
    async fn payment_events(&self, since: Option<DateTime<Utc>>)
        -> UpkeepResult<Vec<PaymentRecord>>;

    async fn insert_report(&self, report: &AnalyticsReport) -> UpkeepResult<()>;

    async fn insert_log(&self, entry: &AutomationLogEntry) -> UpkeepResult<()>;

    /// Release the underlying connection.
    async fn close(&self) -> UpkeepResult<()> {
        Ok(())
    }
}

/// Start of a trailing window of `days` ending at `now`. A window reaching
/// past the earliest representable instant covers every payment, so it is
/// returned as unbounded.
pub fn window_start(now: DateTime<Utc>, days: Option<u32>) -> Option<DateTime<Utc>> {
    let days = days?;
    now.checked_sub_signed(Duration::days(i64::from(days)))
}
