use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::core::{
    config::NarrationConfig,
    errors::{AppError, AppResult},
    types::{
        AudioClip, CachedClip, ClearNarrationResponse, NarrationItem, SaveNarrationResponse,
        SlideNarration,
    },
};

fn parse_timestamp(value: String) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|err| AppError::Database(format!("invalid timestamp {value}: {err}")))
}

/// Replaces every cached clip of `project_id` with `items`.
///
/// Delete and insert share one transaction, so a concurrent
/// [`get_for_project`] sees either the previous batch or this one.
pub async fn save_batch(
    pool: &SqlitePool,
    project_id: &str,
    items: &[NarrationItem],
    config: &NarrationConfig,
) -> AppResult<SaveNarrationResponse> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM narration_clips WHERE project_id = ?1")
        .bind(project_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for item in items {
        let duration = match item.duration {
            Some(ms) if ms > 0 => ms,
            _ => config.default_duration_ms,
        };
        sqlx::query(
            r#"
            INSERT INTO narration_clips (
              id, project_id, slide_index, element_index, text, audio_data, duration_ms, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(i64::from(item.slide_index))
        .bind(i64::from(item.element_index))
        .bind(&item.text)
        .bind(&item.audio_data)
        .bind(duration)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(project_id, removed, saved = items.len(), "narration batch replaced");
    Ok(SaveNarrationResponse { saved: items.len() })
}

pub async fn list_clips(pool: &SqlitePool, project_id: &str) -> AppResult<Vec<AudioClip>> {
    let rows = sqlx::query(
        r#"
        SELECT project_id, slide_index, element_index, text, audio_data, duration_ms, created_at
        FROM narration_clips
        WHERE project_id = ?1
        ORDER BY slide_index ASC, element_index ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_audio_clip).collect()
}

/// Cached clips for `project_id`, grouped by slide. Empty when nothing is cached.
pub async fn get_for_project(pool: &SqlitePool, project_id: &str) -> AppResult<SlideNarration> {
    let mut grouped = SlideNarration::new();
    for clip in list_clips(pool, project_id).await? {
        grouped
            .entry(clip.slide_index)
            .or_default()
            .push(CachedClip::from(clip));
    }
    for clips in grouped.values_mut() {
        clips.sort_by_key(|clip| clip.element_index);
    }
    Ok(grouped)
}

pub async fn clear_for_project(
    pool: &SqlitePool,
    project_id: &str,
) -> AppResult<ClearNarrationResponse> {
    let cleared = sqlx::query("DELETE FROM narration_clips WHERE project_id = ?1")
        .bind(project_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(ClearNarrationResponse {
        cleared: cleared as usize,
    })
}

pub async fn count_for_project(pool: &SqlitePool, project_id: &str) -> AppResult<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM narration_clips WHERE project_id = ?1")
        .bind(project_id)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("total")?)
}

fn map_audio_clip(row: sqlx::sqlite::SqliteRow) -> AppResult<AudioClip> {
    let created_at: String = row.try_get("created_at")?;
    let slide_index: i64 = row.try_get("slide_index")?;
    let element_index: i64 = row.try_get("element_index")?;
    Ok(AudioClip {
        project_id: row.try_get("project_id")?,
        slide_index: to_index(slide_index)?,
        element_index: to_index(element_index)?,
        text: row.try_get("text")?,
        audio_data: row.try_get("audio_data")?,
        duration: row.try_get("duration_ms")?,
        created_at: parse_timestamp(created_at)?,
    })
}

fn to_index(raw: i64) -> AppResult<u32> {
    u32::try_from(raw).map_err(|_| AppError::Database(format!("invalid clip index {raw}")))
}
