// Suggestion prefs: dismissed flag + free-text note per suggestion id.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};
use tracing::instrument;

use super::MetricsRepo;
use crate::clock::now_ms;
use crate::models::SuggestionPref;

pub(super) async fn init_prefs_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suggestion_prefs (
            id TEXT PRIMARY KEY,
            dismissed INTEGER NOT NULL,
            note TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

impl MetricsRepo {
    /// Marks `id` dismissed; an existing note is kept.
    #[instrument(skip(self), fields(repo = "metrics", operation = "dismiss_suggestion"))]
    pub async fn dismiss_suggestion(&self, id: &str) -> anyhow::Result<SuggestionPref> {
        self.set_dismissed(id, true).await
    }

    /// Clears the dismissed flag for `id`; an existing note is kept.
    #[instrument(skip(self), fields(repo = "metrics", operation = "restore_suggestion"))]
    pub async fn restore_suggestion(&self, id: &str) -> anyhow::Result<SuggestionPref> {
        self.set_dismissed(id, false).await
    }

    async fn set_dismissed(&self, id: &str, dismissed: bool) -> anyhow::Result<SuggestionPref> {
        sqlx::query(
            "INSERT INTO suggestion_prefs (id, dismissed, note, updated_at) VALUES ($1, $2, '', $3)
             ON CONFLICT(id) DO UPDATE SET dismissed = excluded.dismissed, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(dismissed)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        self.require_pref(id).await
    }

    /// Replaces the note for `id`; the dismissed flag is kept.
    #[instrument(skip(self, note), fields(repo = "metrics", operation = "update_suggestion_note"))]
    pub async fn update_suggestion_note(
        &self,
        id: &str,
        note: &str,
    ) -> anyhow::Result<SuggestionPref> {
        sqlx::query(
            "INSERT INTO suggestion_prefs (id, dismissed, note, updated_at) VALUES ($1, 0, $2, $3)
             ON CONFLICT(id) DO UPDATE SET note = excluded.note, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(note)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        self.require_pref(id).await
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "get_suggestion_pref"))]
    pub async fn get_suggestion_pref(&self, id: &str) -> anyhow::Result<Option<SuggestionPref>> {
        let row = sqlx::query(
            "SELECT dismissed, note, updated_at FROM suggestion_prefs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_pref_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "get_suggestion_prefs"))]
    pub async fn get_suggestion_prefs(&self) -> anyhow::Result<HashMap<String, SuggestionPref>> {
        let rows = sqlx::query("SELECT id, dismissed, note, updated_at FROM suggestion_prefs")
            .fetch_all(&self.pool)
            .await?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            out.insert(id, parse_pref_row(&row)?);
        }
        Ok(out)
    }

    async fn require_pref(&self, id: &str) -> anyhow::Result<SuggestionPref> {
        self.get_suggestion_pref(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("suggestion pref {} missing after upsert", id))
    }
}

fn parse_pref_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<SuggestionPref> {
    Ok(SuggestionPref {
        dismissed: row.try_get("dismissed")?,
        note: row.try_get("note")?,
        updated_at: row.try_get("updated_at")?,
    })
}
