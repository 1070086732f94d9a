//! Report composer — combines status, plan and revenue figures for one
//! period into an `AnalyticsReport` and persists it.

use crate::distribution::DistributionEngine;
use crate::revenue::{revenue_by_plan, total_revenue, RevenueAggregationEngine};
use chrono::{DateTime, Utc};
use tracing::info;
use upkeep_core::store::ClientStore;
use upkeep_core::types::{
    AnalyticsReport, ReportDetails, ReportPeriod, ReportSummary, RevenueSummary,
};
use upkeep_core::UpkeepResult;

/// Share of `active` in `total` as a whole percentage, rounding halves to
/// even. Zero when there are no clients.
pub fn health_percentage(active: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(active) * 100;
    let total = u128::from(total);
    let (quotient, remainder) = (scaled / total, scaled % total);
    let rounded = match (remainder * 2).cmp(&total) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };
    rounded as u64
}

pub struct ReportComposer<'a> {
    store: &'a dyn ClientStore,
}

impl<'a> ReportComposer<'a> {
    pub fn new(store: &'a dyn ClientStore) -> Self {
        Self { store }
    }

    /// Build, persist and return the report for `period`.
    pub async fn generate_report(&self, period: ReportPeriod) -> UpkeepResult<AnalyticsReport> {
        self.generate_report_at(Utc::now(), period).await
    }

    pub async fn generate_report_at(
        &self,
        now: DateTime<Utc>,
        period: ReportPeriod,
    ) -> UpkeepResult<AnalyticsReport> {
        let distribution = DistributionEngine::new(self.store);
        let status = distribution.status_summary().await?;
        let plans = distribution.plan_distribution().await?;
        let total_clients = self.store.count_active(None).await?;

        let period_days = period.window_days();
        let rows = RevenueAggregationEngine::new(self.store)
            .aggregate_revenue_at(now, Some(period_days))
            .await?;
        let revenue = RevenueSummary {
            period_days,
            total: total_revenue(&rows)?,
            by_plan: revenue_by_plan(&rows),
        };

        let report = AnalyticsReport {
            timestamp: now,
            period,
            summary: ReportSummary {
                total_clients,
                health_percentage: health_percentage(status.active, total_clients),
                status,
                plans,
                revenue,
            },
            details: ReportDetails { revenue: rows },
        };

        self.store.insert_report(&report).await?;

        metrics::counter!("reporting.reports.generated").increment(1);
        info!(
            period = %period,
            total_clients = total_clients,
            health = report.summary.health_percentage,
            revenue = %report.summary.revenue.total,
            "Analytics report generated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use upkeep_core::types::{ClientBillingRecord, ClientStatus, PaymentRecord};
    use upkeep_store::{Fault, FaultyStore, InMemoryStore};

    fn paid(plan: &str, amount: Decimal, now: DateTime<Utc>, days_ago: i64) -> PaymentRecord {
        PaymentRecord {
            plan: plan.to_string(),
            amount,
            payment_date: now - Duration::days(days_ago),
        }
    }

    fn fixture(now: DateTime<Utc>) -> InMemoryStore {
        let mut a = ClientBillingRecord::new("a", "pro");
        a.billing_history = vec![
            paid("pro", dec!(499.00), now, 3),
            paid("pro", dec!(499.00), now, 20),
        ];
        let mut b = ClientBillingRecord::new("b", "basic");
        b.billing_history = vec![paid("basic", dec!(99.50), now, 0)];
        let mut c = ClientBillingRecord::new("c", "basic");
        c.status = ClientStatus::Due;
        let mut d = ClientBillingRecord::new("d", "pro");
        d.status = ClientStatus::Suspended;
        let mut gone = ClientBillingRecord::new("gone", "enterprise");
        gone.is_active = false;
        gone.billing_history = vec![paid("enterprise", dec!(1999), now, 1)];
        InMemoryStore::with_clients([a, b, c, d, gone])
    }

    #[test]
    fn test_health_percentage() {
        assert_eq!(health_percentage(0, 0), 0);
        assert_eq!(health_percentage(5, 0), 0);
        assert_eq!(health_percentage(0, 4), 0);
        assert_eq!(health_percentage(4, 4), 100);
        assert_eq!(health_percentage(2, 3), 67);
        assert_eq!(health_percentage(1, 3), 33);
        // 12.5 and 37.5: halves round to even.
        assert_eq!(health_percentage(1, 8), 12);
        assert_eq!(health_percentage(3, 8), 38);
    }

    #[test]
    fn test_health_percentage_matches_float_rounding_off_midpoint() {
        for total in 1..=60u64 {
            for active in 0..=total {
                let exact = active as f64 / total as f64 * 100.0;
                if (exact.fract() - 0.5).abs() > 1e-9 {
                    assert_eq!(health_percentage(active, total), exact.round() as u64);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_weekly_report() {
        let now = Utc::now();
        let store = fixture(now);

        let report = ReportComposer::new(&store)
            .generate_report_at(now, ReportPeriod::Weekly)
            .await
            .unwrap();

        assert_eq!(report.period, ReportPeriod::Weekly);
        assert_eq!(report.timestamp, now);

        let summary = &report.summary;
        assert_eq!(summary.total_clients, 4);
        assert_eq!(summary.status.active, 2);
        assert_eq!(summary.status.due, 1);
        assert_eq!(summary.status.suspended, 1);
        assert_eq!(summary.health_percentage, 50);
        assert_eq!(summary.plans["pro"], 2);
        assert_eq!(summary.plans["basic"], 2);
        assert!(!summary.plans.contains_key("enterprise"));

        assert_eq!(summary.revenue.period_days, 7);
        assert_eq!(summary.revenue.total, dec!(598.50));
        assert_eq!(summary.revenue.by_plan["pro"], dec!(499.00));
        assert_eq!(summary.revenue.by_plan["basic"], dec!(99.50));

        let plans: Vec<_> = report.details.revenue.iter().map(|r| r.plan.as_str()).collect();
        assert_eq!(plans, vec!["pro", "basic"]);

        assert_eq!(store.reports(), vec![report]);
    }

    #[tokio::test]
    async fn test_monthly_window_reaches_older_payments() {
        let now = Utc::now();
        let store = fixture(now);

        let report = ReportComposer::new(&store)
            .generate_report_at(now, ReportPeriod::Monthly)
            .await
            .unwrap();
        assert_eq!(report.summary.revenue.period_days, 30);
        assert_eq!(report.summary.revenue.by_plan["pro"], dec!(998.00));
        assert_eq!(report.details.revenue[0].count, 2);
    }

    #[tokio::test]
    async fn test_empty_store_produces_zero_report() {
        let store = InMemoryStore::new();
        let report = ReportComposer::new(&store)
            .generate_report(ReportPeriod::Daily)
            .await
            .unwrap();

        assert_eq!(report.summary.total_clients, 0);
        assert_eq!(report.summary.health_percentage, 0);
        assert_eq!(report.summary.revenue.total, Decimal::ZERO);
        assert!(report.summary.revenue.by_plan.is_empty());
        assert!(report.details.revenue.is_empty());
        assert_eq!(store.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_is_fatal() {
        let now = Utc::now();
        let store = FaultyStore::new(fixture(now), [Fault::ReportInsert]);

        let result = ReportComposer::new(&store)
            .generate_report_at(now, ReportPeriod::Daily)
            .await;
        assert!(result.is_err());
        assert!(store.inner().reports().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_persists_nothing() {
        let store = FaultyStore::new(fixture(Utc::now()), [Fault::Read]);
        assert!(ReportComposer::new(&store)
            .generate_report(ReportPeriod::Weekly)
            .await
            .is_err());
        assert!(store.inner().reports().is_empty());
    }

    #[tokio::test]
    async fn test_report_document_layout() {
        let now = Utc::now();
        let store = fixture(now);
        let report = ReportComposer::new(&store)
            .generate_report_at(now, ReportPeriod::Weekly)
            .await
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"], "weekly");
        assert_eq!(json["summary"]["status"]["suspended"], 1);
        assert_eq!(json["summary"]["revenue"]["period_days"], 7);
        assert!(json["details"]["revenue"][0].get("totalAmount").is_some());
        assert!(json["details"]["revenue"][0].get("avgAmount").is_some());
    }
}
