//! Store double that fails selected operations, for exercising the jobs'
//! error paths. Everything else is delegated to an `InMemoryStore`.

use crate::memory::InMemoryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use upkeep_core::store::{ClientStore, GroupCount, GroupKey};
use upkeep_core::types::{AnalyticsReport, AutomationLogEntry, ClientStatus, PaymentRecord};
use upkeep_core::{UpkeepError, UpkeepResult};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Update,
    Read,
    ReportInsert,
    LogInsert,
}

pub struct FaultyStore {
    inner: InMemoryStore,
    faults: Vec<Fault>,
}

impl FaultyStore {
    pub fn new(inner: InMemoryStore, faults: impl IntoIterator<Item = Fault>) -> Self {
        Self {
            inner,
            faults: faults.into_iter().collect(),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self, fault: Fault) -> UpkeepResult<()> {
        if self.faults.contains(&fault) {
            return Err(UpkeepError::Store(format!("injected {fault:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl ClientStore for FaultyStore {
    async fn mark_overdue_as_due(&self, now: DateTime<Utc>) -> UpkeepResult<u64> {
        self.check(Fault::Update)?;
        self.inner.mark_overdue_as_due(now).await
    }

    async fn count_active(&self, status: Option<ClientStatus>) -> UpkeepResult<u64> {
        self.check(Fault::Read)?;
        self.inner.count_active(status).await
    }

    async fn group_active_by(&self, key: GroupKey) -> UpkeepResult<Vec<GroupCount>> {
        self.check(Fault::Read)?;
        self.inner.group_active_by(key).await
    }

    async fn payment_events(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> UpkeepResult<Vec<PaymentRecord>> {
        self.check(Fault::Read)?;
        self.inner.payment_events(since).await
    }

    async fn insert_report(&self, report: &AnalyticsReport) -> UpkeepResult<()> {
        self.check(Fault::ReportInsert)?;
        self.inner.insert_report(report).await
    }

    async fn insert_log(&self, entry: &AutomationLogEntry) -> UpkeepResult<()> {
        self.check(Fault::LogInsert)?;
        self.inner.insert_log(entry).await
    }
}
