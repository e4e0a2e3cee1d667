use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::audio::SongArtifacts;
use crate::models::job::{JobStatus, NewSongJob, SongJob};
use crate::ports::{StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, user_id, title, theme, style_tags, lyrics, reference_names, \
     external_job_id, status, audio_url, video_url, image_url, duration, error_message, \
     created_at, updated_at, completed_at";

fn job_from_row(row: &PgRow) -> StoreResult<SongJob> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)
        .map_err(|_| StoreError::Corrupt(format!("unknown job status '{status_str}'")))?;

    Ok(SongJob {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        theme: row.try_get("theme")?,
        style_tags: row.try_get("style_tags")?,
        lyrics: row.try_get("lyrics")?,
        reference_names: row.try_get("reference_names")?,
        external_job_id: row.try_get("external_job_id")?,
        status,
        audio_url: row.try_get("audio_url")?,
        video_url: row.try_get("video_url")?,
        image_url: row.try_get("image_url")?,
        duration: row.try_get("duration")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Insert a new pending song job
pub async fn create_job(pool: &PgPool, new: NewSongJob) -> StoreResult<SongJob> {
    let job = SongJob::from_new(new);

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO song_jobs (id, user_id, title, theme, style_tags, lyrics, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending')
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(job.id)
    .bind(job.user_id)
    .bind(&job.title)
    .bind(&job.theme)
    .bind(&job.style_tags)
    .bind(&job.lyrics)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> StoreResult<Option<SongJob>> {
    let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM song_jobs WHERE id = $1"))
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// A user's jobs, newest first
pub async fn list_jobs_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> StoreResult<Vec<SongJob>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS} FROM song_jobs
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Unfinished jobs, oldest first (for worker restarts)
pub async fn list_resumable_jobs(pool: &PgPool, limit: i64) -> StoreResult<Vec<SongJob>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS} FROM song_jobs
        WHERE status IN ('pending', 'generating')
        ORDER BY created_at ASC
        LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// pending -> generating
pub async fn mark_generating(pool: &PgPool, job_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE song_jobs
        SET status = 'generating', updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store drafted lyrics and the references that inspired them
pub async fn save_draft(
    pool: &PgPool,
    job_id: Uuid,
    lyrics: &str,
    reference_names: &[String],
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE song_jobs
        SET lyrics = $2, reference_names = $3, updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(job_id)
    .bind(lyrics)
    .bind(reference_names)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record the external task id; never overwrites an existing one
pub async fn set_external_job_id(
    pool: &PgPool,
    job_id: Uuid,
    external_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE song_jobs
        SET external_job_id = $2, updated_at = NOW()
        WHERE id = $1
          AND external_job_id IS NULL
          AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(job_id)
    .bind(external_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a job completed with its artifacts
pub async fn complete_job(
    pool: &PgPool,
    job_id: Uuid,
    artifacts: &SongArtifacts,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE song_jobs
        SET status = 'completed',
            audio_url = $2,
            video_url = $3,
            image_url = $4,
            duration = $5,
            error_message = NULL,
            completed_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(job_id)
    .bind(&artifacts.audio_url)
    .bind(&artifacts.video_url)
    .bind(&artifacts.image_url)
    .bind(artifacts.duration)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a job failed with a diagnostic message
pub async fn fail_job(pool: &PgPool, job_id: Uuid, message: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE song_jobs
        SET status = 'failed',
            error_message = $2,
            completed_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(job_id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
