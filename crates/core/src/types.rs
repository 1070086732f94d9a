use crate::error::UpkeepError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// ─── Client records ─────────────────────────────────────────────────────────

/// Billing lifecycle state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Due,
    Suspended,
}

impl ClientStatus {
    /// Statuses the overdue check leaves alone.
    pub const NOT_TRANSITIONABLE: [ClientStatus; 2] = [Self::Due, Self::Suspended];

    pub fn blocks_due_transition(self) -> bool {
        Self::NOT_TRANSITIONABLE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Due => "due",
            Self::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = UpkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "due" => Ok(Self::Due),
            "suspended" => Ok(Self::Suspended),
            other => Err(UpkeepError::Validation(format!(
                "unknown client status '{other}'"
            ))),
        }
    }
}

/// One completed payment in a client's billing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub plan: String,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
}

/// A subscription client as stored in the clients collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBillingRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub is_active: bool,
    pub status: ClientStatus,
    pub plan: String,
    #[serde(default)]
    pub next_billing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub show_reminder: bool,
    #[serde(default)]
    pub billing_history: Vec<PaymentRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClientBillingRecord {
    /// A new active client on `plan` with no billing date and no history.
    pub fn new(id: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_active: true,
            status: ClientStatus::Active,
            plan: plan.into(),
            next_billing_date: None,
            show_reminder: false,
            billing_history: Vec::new(),
            updated_at: None,
        }
    }

    /// The due-transition predicate. Due and suspended clients never match;
    /// a billing date equal to `now` is not yet due.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && !self.status.blocks_due_transition()
            && self.next_billing_date.is_some_and(|date| date < now)
    }

    pub fn mark_due(&mut self, now: DateTime<Utc>) {
        self.status = ClientStatus::Due;
        self.show_reminder = true;
        self.updated_at = Some(now);
    }
}

// ─── Reports ────────────────────────────────────────────────────────────────

/// Reporting period; decides the trailing revenue window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn window_days(self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client counts for each of the three known statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub active: u64,
    pub due: u64,
    pub suspended: u64,
}

impl StatusSummary {
    pub fn add(&mut self, status: ClientStatus, count: u64) {
        match status {
            ClientStatus::Active => self.active += count,
            ClientStatus::Due => self.due += count,
            ClientStatus::Suspended => self.suspended += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.active + self.due + self.suspended
    }
}

/// Plan tag to client count. Only plans present in the data appear.
pub type PlanDistribution = BTreeMap<String, u64>;

/// Revenue for one plan over the reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueAggregate {
    pub plan: String,
    pub total_amount: Decimal,
    pub count: u64,
    pub avg_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub period_days: u32,
    pub total: Decimal,
    pub by_plan: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_clients: u64,
    pub status: StatusSummary,
    pub plans: PlanDistribution,
    pub health_percentage: u64,
    pub revenue: RevenueSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub revenue: Vec<RevenueAggregate>,
}

/// One generated analytics report. Inserted once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub timestamp: DateTime<Utc>,
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub details: ReportDetails,
}

// ─── Automation log ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    BillingCheck,
    BillingCheckError,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BillingCheck => "BILLING_CHECK",
            Self::BillingCheckError => "BILLING_CHECK_ERROR",
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit trail entry written by the billing checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: LogAction,
    pub details: String,
}

impl AutomationLogEntry {
    pub fn new(action: LogAction, details: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            details: details.into(),
        }
    }
}
