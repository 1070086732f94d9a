//! Categorical counts over active clients. Statuses are a closed set and
//! always reported in full; plans are open-ended and only present tags appear.

use tracing::warn;
use upkeep_core::store::{ClientStore, GroupCount, GroupKey};
use upkeep_core::types::{ClientStatus, PlanDistribution, StatusSummary};
use upkeep_core::UpkeepResult;

pub struct DistributionEngine<'a> {
    store: &'a dyn ClientStore,
}

impl<'a> DistributionEngine<'a> {
    pub fn new(store: &'a dyn ClientStore) -> Self {
        Self { store }
    }

    pub async fn status_summary(&self) -> UpkeepResult<StatusSummary> {
        let groups = self.store.group_active_by(GroupKey::Status).await?;
        Ok(summarize_statuses(groups))
    }

    pub async fn plan_distribution(&self) -> UpkeepResult<PlanDistribution> {
        let groups = self.store.group_active_by(GroupKey::Plan).await?;
        Ok(distribute_plans(groups))
    }
}

/// Fold status groups into the three known statuses; absent ones stay zero.
pub fn summarize_statuses(groups: impl IntoIterator<Item = GroupCount>) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for group in groups {
        match group.key.parse::<ClientStatus>() {
            Ok(status) => summary.add(status, group.count),
            Err(_) => warn!(
                status = %group.key,
                count = group.count,
                "Ignoring unknown client status"
            ),
        }
    }
    summary
}

pub fn distribute_plans(groups: impl IntoIterator<Item = GroupCount>) -> PlanDistribution {
    let mut plans = PlanDistribution::new();
    for group in groups {
        *plans.entry(group.key).or_default() += group.count;
    }
    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkeep_core::types::ClientBillingRecord;
    use upkeep_store::InMemoryStore;

    fn client(id: &str, plan: &str, status: ClientStatus, active: bool) -> ClientBillingRecord {
        let mut record = ClientBillingRecord::new(id, plan);
        record.status = status;
        record.is_active = active;
        record
    }

    #[tokio::test]
    async fn test_status_summary_excludes_inactive_and_zero_fills() {
        let store = InMemoryStore::with_clients([
            client("a", "pro", ClientStatus::Active, true),
            client("b", "pro", ClientStatus::Active, true),
            client("c", "basic", ClientStatus::Due, true),
            client("d", "basic", ClientStatus::Active, false),
        ]);

        let summary = DistributionEngine::new(&store).status_summary().await.unwrap();
        assert_eq!(
            summary,
            StatusSummary {
                active: 2,
                due: 1,
                suspended: 0,
            }
        );
        assert_eq!(summary.total(), 3);
    }

    #[tokio::test]
    async fn test_empty_store_reports_all_statuses_as_zero() {
        let store = InMemoryStore::new();
        let engine = DistributionEngine::new(&store);
        assert_eq!(engine.status_summary().await.unwrap(), StatusSummary::default());
        assert!(engine.plan_distribution().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plan_distribution_only_lists_present_plans() {
        let store = InMemoryStore::with_clients([
            client("a", "pro", ClientStatus::Active, true),
            client("b", "campus-plus", ClientStatus::Suspended, true),
            client("c", "pro", ClientStatus::Due, true),
            client("d", "legacy", ClientStatus::Active, false),
        ]);

        let plans = DistributionEngine::new(&store).plan_distribution().await.unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans["pro"], 2);
        assert_eq!(plans["campus-plus"], 1);
        assert!(!plans.contains_key("legacy"));
    }

    #[test]
    fn test_unknown_status_groups_are_ignored() {
        let summary = summarize_statuses([
            GroupCount {
                key: "active".into(),
                count: 4,
            },
            GroupCount {
                key: "archived".into(),
                count: 2,
            },
        ]);
        assert_eq!(summary.active, 4);
        assert_eq!(summary.total(), 4);
    }
}
