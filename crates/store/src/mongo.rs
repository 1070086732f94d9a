//! MongoDB-backed store. The overdue transition is a single `update_many`
//! with the due predicate as its filter; revenue rows come from a
//! match → unwind → match → replaceRoot pipeline run on the server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use upkeep_core::config::StoreConfig;
use upkeep_core::store::{ClientStore, GroupCount, GroupKey};
use upkeep_core::types::{
    AnalyticsReport, AutomationLogEntry, ClientStatus, LogAction, PaymentRecord,
};
use upkeep_core::{UpkeepError, UpkeepResult};

/// Projection of one unwound `billingHistory` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRow {
    plan: String,
    amount: Decimal,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    payment_date: DateTime<Utc>,
}

/// Log entries are stored with a native BSON date.
#[derive(Debug, Serialize)]
struct LogDocument<'a> {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    timestamp: DateTime<Utc>,
    action: LogAction,
    details: &'a str,
}

pub struct MongoStore {
    client: Client,
    clients: Collection<Document>,
    reports: Collection<Document>,
    logs: Collection<Document>,
}

impl MongoStore {
    /// Connect and verify the deployment answers a ping.
    pub async fn connect(config: &StoreConfig) -> UpkeepResult<Self> {
        let uri = config.mongodb_uri.as_deref().ok_or_else(|| {
            UpkeepError::Config("MONGODB_URI environment variable not set".into())
        })?;

        let client = Client::with_uri_str(uri).await.map_err(UpkeepError::store)?;
        let db = match config.database.as_deref() {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                UpkeepError::Config(
                    "MONGODB_URI names no database; set UPKEEP__STORE__DATABASE or DB_NAME".into(),
                )
            })?,
        };

        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(UpkeepError::store)?;
        info!(database = %db.name(), "MongoDB connection established");

        Ok(Self {
            clients: db.collection(&config.clients_collection),
            reports: db.collection(&config.reports_collection),
            logs: db.collection(&config.logs_collection),
            client,
        })
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> UpkeepResult<Vec<Document>> {
        self.clients
            .aggregate(pipeline, None)
            .await
            .map_err(UpkeepError::store)?
            .try_collect()
            .await
            .map_err(UpkeepError::store)
    }
}

/// `$sum` results come back as whichever numeric type the server picked.
fn count_value(value: Option<&Bson>) -> Option<u64> {
    match value? {
        Bson::Int32(n) => u64::try_from(*n).ok(),
        Bson::Int64(n) => u64::try_from(*n).ok(),
        Bson::Double(n) if *n >= 0.0 => Some(*n as u64),
        _ => None,
    }
}

/// Active clients past their billing date that are neither due nor suspended.
fn overdue_filter(now: bson::DateTime) -> Document {
    let excluded: Vec<&str> = ClientStatus::NOT_TRANSITIONABLE
        .iter()
        .map(|status| status.as_str())
        .collect();
    doc! {
        "nextBillingDate": { "$lt": now },
        "status": { "$nin": excluded },
        "isActive": true,
    }
}

fn due_update(now: bson::DateTime) -> Document {
    doc! {
        "$set": {
            "status": ClientStatus::Due.as_str(),
            "showReminder": true,
            "updatedAt": now,
        }
    }
}

fn group_pipeline(key: GroupKey) -> Vec<Document> {
    vec![
        doc! { "$match": { "isActive": true } },
        doc! { "$group": {
            "_id": format!("${}", key.field()),
            "count": { "$sum": 1 },
        } },
    ]
}

/// match → unwind → optional window → replaceRoot over `billingHistory`.
fn payment_pipeline(since: Option<DateTime<Utc>>) -> Vec<Document> {
    let mut pipeline = vec![
        doc! { "$match": { "isActive": true } },
        doc! { "$unwind": "$billingHistory" },
    ];
    if let Some(cutoff) = since {
        let cutoff = bson::DateTime::from_chrono(cutoff);
        pipeline.push(doc! {
            "$match": { "billingHistory.paymentDate": { "$gte": cutoff } }
        });
    }
    pipeline.push(doc! { "$replaceRoot": { "newRoot": "$billingHistory" } });
    pipeline
}

/// Decode one unwound payment. Entries missing a plan, amount or date are
/// skipped so a single malformed record cannot abort the report.
fn payment_from_row(row: Document) -> Option<PaymentRecord> {
    match bson::from_document::<PaymentRow>(row.clone()) {
        Ok(payment) => Some(PaymentRecord {
            plan: payment.plan,
            amount: payment.amount,
            payment_date: payment.payment_date,
        }),
        Err(e) => {
            warn!(error = %e, row = %row, "Skipping malformed billing history entry");
            None
        }
    }
}

#[async_trait]
impl ClientStore for MongoStore {
    async fn mark_overdue_as_due(&self, now: DateTime<Utc>) -> UpkeepResult<u64> {
        let now = bson::DateTime::from_chrono(now);
        let result = self
            .clients
            .update_many(overdue_filter(now), due_update(now), None)
            .await
            .map_err(UpkeepError::store)?;
        debug!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Overdue update applied"
        );
        Ok(result.modified_count)
    }

    async fn count_active(&self, status: Option<ClientStatus>) -> UpkeepResult<u64> {
        let mut filter = doc! { "isActive": true };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.clients
            .count_documents(filter, None)
            .await
            .map_err(UpkeepError::store)
    }

    async fn group_active_by(&self, key: GroupKey) -> UpkeepResult<Vec<GroupCount>> {
        let mut groups = Vec::new();
        for row in self.aggregate(group_pipeline(key)).await? {
            let (Ok(value), Some(count)) = (row.get_str("_id"), count_value(row.get("count")))
            else {
                warn!(field = key.field(), row = %row, "Skipping group without a string key");
                continue;
            };
            groups.push(GroupCount {
                key: value.to_string(),
                count,
            });
        }
        Ok(groups)
    }

    async fn payment_events(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> UpkeepResult<Vec<PaymentRecord>> {
        let rows = self.aggregate(payment_pipeline(since)).await?;
        Ok(rows.into_iter().filter_map(payment_from_row).collect())
    }

    async fn insert_report(&self, report: &AnalyticsReport) -> UpkeepResult<()> {
        let document = bson::to_document(report).map_err(UpkeepError::store)?;
        self.reports
            .insert_one(document, None)
            .await
            .map_err(UpkeepError::store)?;
        Ok(())
    }

    async fn insert_log(&self, entry: &AutomationLogEntry) -> UpkeepResult<()> {
        let document = bson::to_document(&LogDocument {
            timestamp: entry.timestamp,
            action: entry.action,
            details: &entry.details,
        })
        .map_err(UpkeepError::store)?;
        self.logs
            .insert_one(document, None)
            .await
            .map_err(UpkeepError::store)?;
        Ok(())
    }

    async fn close(&self) -> UpkeepResult<()> {
        self.client.clone().shutdown().await;
        info!("MongoDB connection closed");
        Ok(())
    }
}
