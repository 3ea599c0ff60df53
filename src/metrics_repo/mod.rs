// SQLite store for metrics snapshots (analytics_realtime) and suggestion prefs.

mod prefs;

use crate::clock::now_ms;
use crate::models::MetricsSnapshot;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

const SNAPSHOT_COLUMNS: &str = "id, ts, camera_id, queue_p50_wait_ms, queue_p90_wait_ms, cook_p50_ms, assembly_p50_ms, total_customer_wait_p50_ms, after_order_avg_ms, avg_queue_dwell_ms, abandon_rate_pct, queue_current_count, orders_last_hour, sessions_active";

pub struct MetricsRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl MetricsRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics_realtime (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts INTEGER NOT NULL,
                camera_id INTEGER,
                queue_p50_wait_ms REAL,
                queue_p90_wait_ms REAL,
                cook_p50_ms REAL,
                assembly_p50_ms REAL,
                total_customer_wait_p50_ms REAL,
                after_order_avg_ms REAL,
                avg_queue_dwell_ms REAL,
                abandon_rate_pct REAL,
                queue_current_count REAL,
                orders_last_hour REAL,
                sessions_active REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analytics_ts ON analytics_realtime(ts)")
            .execute(&self.pool)
            .await?;

        prefs::init_prefs_table(&self.pool).await?;

        Ok(())
    }

    /// Inserts one snapshot and returns its row id. Missing `ts` is stamped with now.
    #[instrument(skip(self, s), fields(repo = "metrics", operation = "save_snapshot"))]
    pub async fn save_snapshot(&self, s: &MetricsSnapshot) -> anyhow::Result<i64> {
        let ts = s.ts.unwrap_or_else(now_ms);
        let result = sqlx::query(
            "INSERT INTO analytics_realtime (ts, camera_id, queue_p50_wait_ms, queue_p90_wait_ms, cook_p50_ms, assembly_p50_ms, total_customer_wait_p50_ms, after_order_avg_ms, avg_queue_dwell_ms, abandon_rate_pct, queue_current_count, orders_last_hour, sessions_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(ts)
        .bind(s.camera_id)
        .bind(s.queue_p50_wait_ms)
        .bind(s.queue_p90_wait_ms)
        .bind(s.cook_p50_ms)
        .bind(s.assembly_p50_ms)
        .bind(s.total_customer_wait_p50_ms)
        .bind(s.after_order_avg_ms)
        .bind(s.avg_queue_dwell_ms)
        .bind(s.abandon_rate_pct)
        .bind(s.queue_current_count)
        .bind(s.orders_last_hour)
        .bind(s.sessions_active)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Most recent `limit` snapshots, oldest first.
    #[instrument(skip(self), fields(repo = "metrics", operation = "get_recent"))]
    pub async fn get_recent(&self, limit: u32) -> anyhow::Result<Vec<MetricsSnapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM analytics_realtime ORDER BY ts DESC, id DESC LIMIT $1",
            SNAPSHOT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_snapshot_row(&row)?);
        }
        out.reverse();
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "get_latest"))]
    pub async fn get_latest(&self) -> anyhow::Result<Option<MetricsSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM analytics_realtime ORDER BY ts DESC, id DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_snapshot_row).transpose()
    }

    /// Deletes snapshots older than the retention window. Returns rows removed.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        self.prune_before(now_ms() - self.retention_ms).await
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_before"))]
    pub async fn prune_before(&self, cutoff_ms: i64) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM analytics_realtime WHERE ts < $1")
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn parse_snapshot_row(row: &SqliteRow) -> anyhow::Result<MetricsSnapshot> {
        Ok(MetricsSnapshot {
            id: Some(row.try_get("id")?),
            ts: Some(row.try_get("ts")?),
            camera_id: row.try_get("camera_id")?,
            queue_p50_wait_ms: row.try_get("queue_p50_wait_ms")?,
            queue_p90_wait_ms: row.try_get("queue_p90_wait_ms")?,
            cook_p50_ms: row.try_get("cook_p50_ms")?,
            assembly_p50_ms: row.try_get("assembly_p50_ms")?,
            total_customer_wait_p50_ms: row.try_get("total_customer_wait_p50_ms")?,
            after_order_avg_ms: row.try_get("after_order_avg_ms")?,
            avg_queue_dwell_ms: row.try_get("avg_queue_dwell_ms")?,
            abandon_rate_pct: row.try_get("abandon_rate_pct")?,
            queue_current_count: row.try_get("queue_current_count")?,
            orders_last_hour: row.try_get("orders_last_hour")?,
            sessions_active: row.try_get("sessions_active")?,
        })
    }
}
