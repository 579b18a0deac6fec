use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::core::{
    errors::{AppError, AppResult},
    fingerprint::fingerprint,
    types::{DeckSummary, Document},
};

fn parse_timestamp(value: String) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|err| AppError::Database(format!("invalid timestamp {value}: {err}")))
}

pub async fn read_deck(pool: &SqlitePool, project_id: &str) -> AppResult<Document> {
    let row = sqlx::query(
        r#"
        SELECT project_id, title, project_json, fingerprint, updated_at
        FROM decks
        WHERE project_id = ?1
        "#,
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("deck {project_id}")))?;

    map_document(row)
}

/// Stores `project` for `project_id`, replacing whatever was there.
///
/// Concurrent writers are serialized by SQLite; the last one wins.
pub async fn write_deck(
    pool: &SqlitePool,
    project_id: &str,
    title: Option<&str>,
    project: &Value,
) -> AppResult<Document> {
    let project_id = project_id.trim();
    if project_id.is_empty() {
        return Err(AppError::InvalidInput("project id cannot be empty".to_string()));
    }
    let fingerprint = fingerprint(project);
    let project_json = serde_json::to_string(project)?;

    let row = sqlx::query(
        r#"
        INSERT INTO decks (project_id, title, project_json, fingerprint)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(project_id) DO UPDATE SET
          title = COALESCE(excluded.title, decks.title),
          project_json = excluded.project_json,
          fingerprint = excluded.fingerprint,
          updated_at = (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        RETURNING project_id, title, project_json, fingerprint, updated_at
        "#,
    )
    .bind(project_id)
    .bind(title)
    .bind(&project_json)
    .bind(&fingerprint)
    .fetch_one(pool)
    .await?;

    map_document(row)
}

pub async fn list_decks(pool: &SqlitePool) -> AppResult<Vec<DeckSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT project_id, title, fingerprint, updated_at
        FROM decks
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let updated_at: String = row.try_get("updated_at")?;
            Ok(DeckSummary {
                project_id: row.try_get("project_id")?,
                title: row.try_get("title")?,
                fingerprint: row.try_get("fingerprint")?,
                updated_at: parse_timestamp(updated_at)?,
            })
        })
        .collect()
}

pub async fn delete_deck(pool: &SqlitePool, project_id: &str) -> AppResult<bool> {
    let affected = sqlx::query("DELETE FROM decks WHERE project_id = ?1")
        .bind(project_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

fn map_document(row: sqlx::sqlite::SqliteRow) -> AppResult<Document> {
    let project_json: String = row.try_get("project_json")?;
    let updated_at: String = row.try_get("updated_at")?;
    let project: Value = serde_json::from_str(&project_json)
        .map_err(|err| AppError::Database(format!("corrupt deck payload: {err}")))?;
    Ok(Document {
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        project,
        fingerprint: row.try_get("fingerprint")?,
        updated_at: parse_timestamp(updated_at)?,
    })
}
