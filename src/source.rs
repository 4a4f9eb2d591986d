use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::record::{DatasetCategory, RawRecord};

/// Boundary to the record store: one list of loosely-typed rows per dataset
/// category. The cleaner is the adapter that turns these into typed records.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn list_records(&self, category: DatasetCategory) -> anyhow::Result<Vec<RawRecord>>;
}

/// Postgres-backed record source. Rows are stored as JSON payloads keyed by
/// category, ordered by their embedded year.
pub struct PgRecordSource {
    pool: PgPool,
    table: String,
}

impl PgRecordSource {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pool: PgPool::connect(url).await?,
            table: "emigration_records".into(),
        })
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl RecordSource for PgRecordSource {
    async fn list_records(&self, category: DatasetCategory) -> anyhow::Result<Vec<RawRecord>> {
        let sql = format!(
            "SELECT payload FROM {} WHERE category = $1 ORDER BY (payload->>'year')::int",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: Value = row.try_get("payload")?;
            match payload {
                Value::Object(map) => records.push(map),
                other => anyhow::bail!("expected a JSON object payload, got {other}"),
            }
        }
        Ok(records)
    }
}
