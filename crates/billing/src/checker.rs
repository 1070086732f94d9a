//! Billing status checker — flips overdue clients to `due` in one filtered
//! bulk update and appends an automation log entry for every run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use upkeep_core::store::ClientStore;
use upkeep_core::types::{AutomationLogEntry, ClientStatus, LogAction};
use upkeep_core::UpkeepResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Point-in-time counts over active clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub active: u64,
    pub due: u64,
    pub suspended: u64,
}

/// Result of one checker run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub checked_at: DateTime<Utc>,
    /// Records moved to `due` by this run.
    pub transitioned: u64,
    pub counts: StatusCounts,
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

pub struct BillingStatusChecker<'a> {
    store: &'a dyn ClientStore,
}

impl<'a> BillingStatusChecker<'a> {
    pub fn new(store: &'a dyn ClientStore) -> Self {
        Self { store }
    }

    /// Run the check against the current wall-clock time.
    pub async fn run_check(&self) -> UpkeepResult<CheckOutcome> {
        self.run_check_at(Utc::now()).await
    }

    /// Run the check as of `now`. A store failure is recorded with
    /// `BILLING_CHECK_ERROR` and returned; nothing is retried.
    pub async fn run_check_at(&self, now: DateTime<Utc>) -> UpkeepResult<CheckOutcome> {
        match self.check(now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                metrics::counter!("billing.check.errors").increment(1);
                error!(error = %e, "Billing status check failed");

                let entry = AutomationLogEntry::new(LogAction::BillingCheckError, e.to_string());
                if let Err(log_err) = self.store.insert_log(&entry).await {
                    warn!(error = %log_err, "Failed to record billing check error");
                }
                Err(e)
            }
        }
    }

    async fn check(&self, now: DateTime<Utc>) -> UpkeepResult<CheckOutcome> {
        let transitioned = self.store.mark_overdue_as_due(now).await?;

        let details = if transitioned > 0 {
            format!("Marked {transitioned} client(s) as due")
        } else {
            "No clients marked as due".to_string()
        };
        self.store
            .insert_log(&AutomationLogEntry {
                timestamp: now,
                action: LogAction::BillingCheck,
                details,
            })
            .await?;

        metrics::counter!("billing.check.transitioned").increment(transitioned);
        info!(transitioned = transitioned, "Billing status check complete");

        let counts = self.status_counts().await?;
        info!(
            total = counts.total,
            active = counts.active,
            due = counts.due,
            suspended = counts.suspended,
            "Client status summary"
        );

        Ok(CheckOutcome {
            checked_at: now,
            transitioned,
            counts,
        })
    }

    /// Total and per-status counts over active clients.
    pub async fn status_counts(&self) -> UpkeepResult<StatusCounts> {
        Ok(StatusCounts {
            total: self.store.count_active(None).await?,
            active: self.store.count_active(Some(ClientStatus::Active)).await?,
            due: self.store.count_active(Some(ClientStatus::Due)).await?,
            suspended: self
                .store
                .count_active(Some(ClientStatus::Suspended))
                .await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
