//! Revenue aggregation — payment history of active clients, flattened,
//! windowed, grouped by plan and ordered by descending revenue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;
use upkeep_core::store::{window_start, ClientStore};
use upkeep_core::types::{PaymentRecord, RevenueAggregate};
use upkeep_core::{UpkeepError, UpkeepResult};

pub struct RevenueAggregationEngine<'a> {
    store: &'a dyn ClientStore,
}

impl<'a> RevenueAggregationEngine<'a> {
    pub fn new(store: &'a dyn ClientStore) -> Self {
        Self { store }
    }

    /// Revenue per plan over the trailing `window_days`, or over all history
    /// when `None`.
    pub async fn aggregate_revenue(
        &self,
        window_days: Option<u32>,
    ) -> UpkeepResult<Vec<RevenueAggregate>> {
        self.aggregate_revenue_at(Utc::now(), window_days).await
    }

    pub async fn aggregate_revenue_at(
        &self,
        now: DateTime<Utc>,
        window_days: Option<u32>,
    ) -> UpkeepResult<Vec<RevenueAggregate>> {
        let since = window_start(now, window_days);
        let events = self.store.payment_events(since).await?;
        debug!(payments = events.len(), window_days = ?window_days, "Aggregating revenue");
        group_by_plan(events)
    }
}

/// Group payments by plan into sum, count and mean, then order by
/// descending sum with the plan tag breaking ties.
pub fn group_by_plan(
    events: impl IntoIterator<Item = PaymentRecord>,
) -> UpkeepResult<Vec<RevenueAggregate>> {
    let mut groups: BTreeMap<String, (Decimal, u64)> = BTreeMap::new();
    for event in events {
        let (sum, count) = groups.entry(event.plan).or_insert((Decimal::ZERO, 0));
        *sum = sum
            .checked_add(event.amount)
            .ok_or_else(|| overflow("revenue sum"))?;
        *count += 1;
    }

    let mut rows = groups
        .into_iter()
        .map(|(plan, (total_amount, count))| {
            let avg_amount = total_amount
                .checked_div(Decimal::from(count))
                .ok_or_else(|| overflow("revenue average"))?;
            Ok(RevenueAggregate {
                plan,
                total_amount,
                count,
                avg_amount,
            })
        })
        .collect::<UpkeepResult<Vec<_>>>()?;

    rows.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.plan.cmp(&b.plan))
    });
    Ok(rows)
}

/// Grand total across plan rows.
pub fn total_revenue(rows: &[RevenueAggregate]) -> UpkeepResult<Decimal> {
    rows.iter().try_fold(Decimal::ZERO, |acc, row| {
        acc.checked_add(row.total_amount)
            .ok_or_else(|| overflow("revenue total"))
    })
}

pub fn revenue_by_plan(rows: &[RevenueAggregate]) -> BTreeMap<String, Decimal> {
    rows.iter()
        .map(|row| (row.plan.clone(), row.total_amount))
        .collect()
}

fn overflow(what: &str) -> UpkeepError {
    UpkeepError::Validation(format!("{what} exceeds decimal range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use upkeep_core::types::ClientBillingRecord;
    use upkeep_store::InMemoryStore;

    fn paid(plan: &str, amount: Decimal, now: DateTime<Utc>, days_ago: i64) -> PaymentRecord {
        PaymentRecord {
            plan: plan.to_string(),
            amount,
            payment_date: now - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn test_weekly_window_excludes_older_payments() {
        let now = Utc::now();
        let mut client = ClientBillingRecord::new("c1", "pro");
        client.billing_history = vec![
            paid("pro", dec!(100), now, 2),
            paid("pro", dec!(50), now, 10),
        ];
        let store = InMemoryStore::with_clients([client]);

        let rows = RevenueAggregationEngine::new(&store)
            .aggregate_revenue_at(now, Some(7))
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![RevenueAggregate {
                plan: "pro".to_string(),
                total_amount: dec!(100),
                count: 1,
                avg_amount: dec!(100),
            }]
        );
    }

    #[tokio::test]
    async fn test_unwindowed_includes_all_history() {
        let now = Utc::now();
        let mut client = ClientBillingRecord::new("c1", "pro");
        client.billing_history = vec![
            paid("pro", dec!(100), now, 2),
            paid("pro", dec!(50), now, 400),
        ];
        let store = InMemoryStore::with_clients([client]);

        let rows = RevenueAggregationEngine::new(&store)
            .aggregate_revenue_at(now, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_amount, dec!(150));
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].avg_amount, dec!(75));
    }

    #[tokio::test]
    async fn test_window_wider_than_calendar_covers_all_history() {
        let now = Utc::now();
        let mut client = ClientBillingRecord::new("c1", "pro");
        client.billing_history = vec![
            paid("pro", dec!(100), now, 2),
            paid("pro", dec!(50), now, 4000),
        ];
        let store = InMemoryStore::with_clients([client]);

        let rows = RevenueAggregationEngine::new(&store)
            .aggregate_revenue(Some(u32::MAX))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_amount, dec!(150));
        assert_eq!(rows[0].count, 2);
    }

    #[tokio::test]
    async fn test_window_boundary_is_inclusive() {
        let now = Utc::now();
        let mut client = ClientBillingRecord::new("c1", "basic");
        client.billing_history = vec![paid("basic", dec!(10), now, 7)];
        let store = InMemoryStore::with_clients([client]);

        let rows = RevenueAggregationEngine::new(&store)
            .aggregate_revenue_at(now, Some(7))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_clients_without_window_payments_contribute_nothing() {
        let now = Utc::now();
        let empty = ClientBillingRecord::new("empty", "starter");
        let mut stale = ClientBillingRecord::new("stale", "legacy");
        stale.billing_history = vec![paid("legacy", dec!(20), now, 90)];
        let mut deleted = ClientBillingRecord::new("deleted", "pro");
        deleted.is_active = false;
        deleted.billing_history = vec![paid("pro", dec!(500), now, 1)];
        let store = InMemoryStore::with_clients([empty, stale, deleted]);

        let rows = RevenueAggregationEngine::new(&store)
            .aggregate_revenue_at(now, Some(30))
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total_revenue(&rows).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_groups_by_payment_plan_and_sorts_by_revenue() {
        let now = Utc::now();
        let rows = group_by_plan(vec![
            paid("basic", dec!(9.99), now, 1),
            paid("enterprise", dec!(1999.00), now, 1),
            paid("basic", dec!(9.99), now, 2),
            paid("pro", dec!(19.98), now, 3),
        ])
        .unwrap();

        let order: Vec<_> = rows.iter().map(|r| r.plan.as_str()).collect();
        // basic and pro tie at 19.98; plan tag decides.
        assert_eq!(order, vec!["enterprise", "basic", "pro"]);
        assert_eq!(rows[1].total_amount, dec!(19.98));
        assert_eq!(rows[1].avg_amount, dec!(9.99));
        assert_eq!(total_revenue(&rows).unwrap(), dec!(2038.96));
    }

    #[test]
    fn test_cent_amounts_sum_exactly() {
        let now = Utc::now();
        let events = (0..10).map(|_| paid("pro", dec!(0.10), now, 1));
        let rows = group_by_plan(events).unwrap();
        assert_eq!(rows[0].total_amount, dec!(1.00));
        assert_eq!(rows[0].avg_amount, dec!(0.10));
    }

    #[test]
    fn test_revenue_by_plan_lookup() {
        let now = Utc::now();
        let rows =
            group_by_plan(vec![paid("pro", dec!(49), now, 1), paid("basic", dec!(9), now, 1)])
                .unwrap();
        let by_plan = revenue_by_plan(&rows);
        assert_eq!(by_plan.get("pro"), Some(&dec!(49)));
        assert_eq!(by_plan.get("basic"), Some(&dec!(9)));
        assert_eq!(by_plan.len(), 2);
    }
}
