//! SQLite alert store
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: The API can read while the monitor writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Deduplication
//!
//! A partial unique index over `(device_id, alert_type, protocol, message)
//! WHERE resolved = 0` enforces the one-open-alert-per-fingerprint rule inside
//! the database. `insert_if_absent` inserts with `ON CONFLICT DO NOTHING` and
//! falls back to reading the existing open alert, so two writers racing on
//! the same fault cannot both create one.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{AlertQuery, AlertStats, AlertStore, HealthStatus, InsertOutcome};
use super::error::{StorageError, StorageResult};
use crate::alerts::{Alert, AlertId, AlertProtocol, AlertType, Fingerprint, NewAlert, Severity};

const ALERT_COLUMNS: &str = "id, device_id, device_name, alert_type, protocol, severity, \
     message, resolved, details, created_at, updated_at";

/// SQLite alert store
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for concurrent readers (WAL mode, etc.)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use network_monitoring::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./alerts.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite alert store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Open(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_alert(row: &SqliteRow) -> StorageResult<Alert> {
        let corrupt = |what: &str, e: String| {
            StorageError::InvalidRecord(format!("{what}: {e}"))
        };

        let id: String = row.try_get("id")?;
        let id = AlertId::parse(&id).ok_or_else(|| corrupt("id", id.clone()))?;

        let alert_type: String = row.try_get("alert_type")?;
        let protocol: Option<String> = row.try_get("protocol")?;
        let severity: String = row.try_get("severity")?;
        let details: String = row.try_get("details")?;

        Ok(Alert {
            id,
            device_id: row.try_get("device_id")?,
            device_name: row.try_get("device_name")?,
            alert_type: alert_type.parse::<AlertType>().map_err(|e| corrupt("alert type", e))?,
            protocol: protocol
                .map(|p| p.parse::<AlertProtocol>())
                .transpose()
                .map_err(|e| corrupt("protocol", e))?,
            severity: severity.parse::<Severity>().map_err(|e| corrupt("severity", e))?,
            message: row.try_get("message")?,
            resolved: row.try_get::<i64, _>("resolved")? != 0,
            details: serde_json::from_str(&details)
                .map_err(|e| corrupt("details", e.to_string()))?,
            created_at: Self::millis_to_timestamp(row.try_get("created_at")?),
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }
}

#[async_trait]
impl AlertStore for SqliteBackend {
    #[instrument(skip(self, alert), fields(device_id = %alert.device_id))]
    async fn insert_if_absent(&self, alert: NewAlert) -> StorageResult<InsertOutcome> {
        let fingerprint = alert.fingerprint();
        let mut record = alert.into_alert(Utc::now());

        // Timestamps are stored as millis; hand back what a later read returns
        record.created_at = Self::millis_to_timestamp(Self::timestamp_to_millis(&record.created_at));
        record.updated_at = record.created_at;

        let details = serde_json::to_string(&record.details).map_err(|e| {
            StorageError::InvalidRecord(format!("details not serializable: {e}"))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (
                id, device_id, device_name, alert_type, protocol, severity,
                message, resolved, details, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(record.id.as_str())
        .bind(&record.device_id)
        .bind(&record.device_name)
        .bind(record.alert_type.as_str())
        .bind(record.protocol.map(|p| p.as_str()))
        .bind(record.severity.as_str())
        .bind(&record.message)
        .bind(details)
        .bind(Self::timestamp_to_millis(&record.created_at))
        .bind(Self::timestamp_to_millis(&record.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!("created alert {}", record.id);
            return Ok(InsertOutcome::Created(record));
        }

        match self.find_open(&fingerprint).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(StorageError::Query(format!(
                "insert of alert {} was ignored but no open alert exists for {}",
                record.id, fingerprint
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn find_open(&self, fingerprint: &Fingerprint) -> StorageResult<Option<Alert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE device_id = ? AND alert_type = ? AND protocol IS ? AND message = ? AND resolved = 0 \
             LIMIT 1"
        );

        let row = sqlx::query(&sql)
            .bind(&fingerprint.device_id)
            .bind(fingerprint.alert_type.as_str())
            .bind(fingerprint.protocol.map(|p| p.as_str()))
            .bind(&fingerprint.message)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_alert).transpose()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &AlertId) -> StorageResult<Option<Alert>> {
        let sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?");

        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_alert).transpose()
    }

    #[instrument(skip(self))]
    async fn query(&self, query: AlertQuery) -> StorageResult<Vec<Alert>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE 1 = 1"));

        if let Some(resolved) = query.resolved {
            builder.push(" AND resolved = ").push_bind(resolved as i64);
        }
        if let Some(device_id) = query.device_id {
            builder.push(" AND device_id = ").push_bind(device_id);
        }
        if !query.severities.is_empty() {
            builder.push(" AND severity IN (");
            let mut separated = builder.separated(", ");
            for severity in &query.severities {
                separated.push_bind(severity.as_str());
            }
            separated.push_unseparated(")");
        }
        if let Some(after) = query.created_after {
            builder
                .push(" AND created_at >= ")
                .push_bind(Self::timestamp_to_millis(&after));
        }

        builder.push(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let alerts = rows
            .iter()
            .map(Self::row_to_alert)
            .collect::<StorageResult<Vec<_>>>()?;

        debug!("query returned {} alerts", alerts.len());
        Ok(alerts)
    }

    #[instrument(skip(self))]
    async fn resolve_open(
        &self,
        device_id: &str,
        protocol: Option<AlertProtocol>,
        message: &str,
    ) -> StorageResult<Option<Alert>> {
        let sql = format!(
            "UPDATE alerts SET resolved = 1, updated_at = ? \
             WHERE id = ( \
                 SELECT id FROM alerts \
                 WHERE device_id = ? AND protocol IS ? AND message = ? AND resolved = 0 \
                 LIMIT 1 \
             ) \
             RETURNING {ALERT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(Self::timestamp_to_millis(&Utc::now()))
            .bind(device_id)
            .bind(protocol.map(|p| p.as_str()))
            .bind(message)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_alert).transpose()
    }

    #[instrument(skip(self))]
    async fn resolve_by_id(&self, id: &AlertId) -> StorageResult<Option<Alert>> {
        sqlx::query("UPDATE alerts SET resolved = 1, updated_at = ? WHERE id = ? AND resolved = 0")
            .bind(Self::timestamp_to_millis(&Utc::now()))
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    #[instrument(skip(self))]
    async fn resolve_all_for_device(&self, device_id: &str) -> StorageResult<usize> {
        let result = sqlx::query(
            "UPDATE alerts SET resolved = 1, updated_at = ? WHERE device_id = ? AND resolved = 0",
        )
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &AlertId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<AlertStats> {
        let (total, open): (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(CASE WHEN resolved = 0 THEN 1 ELSE 0 END) FROM alerts",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AlertStats {
            total: total as usize,
            open: open.unwrap_or(0) as usize,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite alert store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite connection pool");
        self.pool.close().await;
        Ok(())
    }
}
