//! In-process document store. Every operation runs under one lock, so the
//! overdue transition is a single atomic filtered update, and the
//! aggregation stages run as plain iterator pipelines.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;
use upkeep_core::store::{ClientStore, GroupCount, GroupKey};
use upkeep_core::types::{
    AnalyticsReport, AutomationLogEntry, ClientBillingRecord, ClientStatus, PaymentRecord,
};
use upkeep_core::UpkeepResult;

/// Client records, reports and log entries held behind `RwLock`s.
#[derive(Default)]
pub struct InMemoryStore {
    clients: RwLock<BTreeMap<String, ClientBillingRecord>>,
    reports: RwLock<Vec<AnalyticsReport>>,
    logs: RwLock<Vec<AutomationLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ClientBillingRecord>) -> Self {
        let store = Self::new();
        for client in clients {
            store.upsert_client(client);
        }
        store
    }

    /// Insert or replace a client record by id.
    pub fn upsert_client(&self, client: ClientBillingRecord) {
        self.clients.write().insert(client.id.clone(), client);
    }

    pub fn client(&self, id: &str) -> Option<ClientBillingRecord> {
        self.clients.read().get(id).cloned()
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn reports(&self) -> Vec<AnalyticsReport> {
        self.reports.read().clone()
    }

    pub fn logs(&self) -> Vec<AutomationLogEntry> {
        self.logs.read().clone()
    }

    /// Seed demo data: five clients across three plans, one of them overdue
    /// and one soft-deleted.
    pub fn seed_demo_data(&self) {
        let now = Utc::now();
        let payment = |plan: &str, cents: i64, days_ago: i64| PaymentRecord {
            plan: plan.to_string(),
            amount: Decimal::new(cents, 2),
            payment_date: now - Duration::days(days_ago),
        };

        let mut riverside = ClientBillingRecord::new("riverside-college", "pro");
        riverside.next_billing_date = Some(now + Duration::days(12));
        riverside.billing_history = vec![payment("pro", 49_900, 18), payment("pro", 49_900, 0)];

        let mut hillcrest = ClientBillingRecord::new("hillcrest-academy", "basic");
        hillcrest.next_billing_date = Some(now - Duration::days(2));
        hillcrest.billing_history = vec![payment("basic", 9_900, 32)];

        let mut lakeside = ClientBillingRecord::new("lakeside-institute", "enterprise");
        lakeside.next_billing_date = Some(now + Duration::days(25));
        lakeside.billing_history = vec![payment("enterprise", 199_900, 5)];

        let mut northgate = ClientBillingRecord::new("northgate-school", "basic");
        northgate.status = ClientStatus::Suspended;
        northgate.next_billing_date = Some(now - Duration::days(40));

        let mut oakwood = ClientBillingRecord::new("oakwood-polytechnic", "pro");
        oakwood.is_active = false;
        oakwood.billing_history = vec![payment("pro", 49_900, 3)];

        for client in [riverside, hillcrest, lakeside, northgate, oakwood] {
            self.upsert_client(client);
        }

        info!("Seeded demo client data: 5 clients, 3 plans");
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn mark_overdue_as_due(&self, now: DateTime<Utc>) -> UpkeepResult<u64> {
        let mut clients = self.clients.write();
        let mut modified = 0u64;
        for client in clients.values_mut().filter(|c| c.is_overdue(now)) {
            client.mark_due(now);
            modified += 1;
        }
        Ok(modified)
    }

    async fn count_active(&self, status: Option<ClientStatus>) -> UpkeepResult<u64> {
        let count = self
            .clients
            .read()
            .values()
            .filter(|c| c.is_active)
            .filter(|c| status.map_or(true, |s| c.status == s))
            .count();
        Ok(count as u64)
    }

    async fn group_active_by(&self, key: GroupKey) -> UpkeepResult<Vec<GroupCount>> {
        let mut groups: BTreeMap<String, u64> = BTreeMap::new();
        for client in self.clients.read().values().filter(|c| c.is_active) {
            let value = match key {
                GroupKey::Status => client.status.as_str().to_string(),
                GroupKey::Plan => client.plan.clone(),
            };
            *groups.entry(value).or_default() += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect())
    }

    async fn payment_events(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> UpkeepResult<Vec<PaymentRecord>> {
        let clients = self.clients.read();
        let events = clients
            .values()
            .filter(|c| c.is_active)
            .flat_map(|c| c.billing_history.iter())
            .filter(|p| since.map_or(true, |cutoff| p.payment_date >= cutoff))
            .cloned()
            .collect();
        Ok(events)
    }

    async fn insert_report(&self, report: &AnalyticsReport) -> UpkeepResult<()> {
        self.reports.write().push(report.clone());
        Ok(())
    }

    async fn insert_log(&self, entry: &AutomationLogEntry) -> UpkeepResult<()> {
        self.logs.write().push(entry.clone());
        Ok(())
    }
}
