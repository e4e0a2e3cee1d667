use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::job::{NewSongJob, SongJob};
use crate::models::song::{CreateSongRequest, CreateSongResponse, SongJobResponse};
use crate::services::queue::QueuedSong;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Stored on a job whose hand-off to the worker failed.
pub const QUEUE_FAILURE_MESSAGE: &str = "Failed to queue song";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// POST /api/v1/songs: create a song job and hand it to the worker.
pub async fn create_song(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateSongRequest>,
) -> Result<(StatusCode, Json<CreateSongResponse>), ApiError> {
    let request = request.normalized();
    request.validate()?;

    let job = state
        .jobs
        .create_job(NewSongJob {
            user_id,
            title: request.title,
            theme: request.theme,
            style_tags: request.style_tags,
            lyrics: request.lyrics,
        })
        .await?;

    if let Err(e) = state.queue.enqueue(&QueuedSong { job_id: job.id }).await {
        tracing::error!(job_id = %job.id, error = %e, "Failed to queue song job");
        if let Err(store_err) = state.jobs.fail_job(job.id, QUEUE_FAILURE_MESSAGE).await {
            tracing::error!(job_id = %job.id, error = %store_err, "Failed to mark unqueued job as failed");
        }
        return Err(e.into());
    }
    metrics::counter!("song_jobs_submitted_total").increment(1);

    tracing::info!(job_id = %job.id, user_id = %user_id, "Song job submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSongResponse {
            job_id: job.id,
            status: job.status,
            message: "Song submitted for generation".to_string(),
        }),
    ))
}

/// GET /api/v1/songs: the caller's jobs, newest first.
pub async fn list_songs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SongJobResponse>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let jobs = state.jobs.list_jobs_for_user(user_id, limit).await?;
    Ok(Json(jobs.into_iter().map(SongJobResponse::from).collect()))
}

/// GET /api/v1/songs/{job_id}: one job, owner only.
pub async fn get_song(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<SongJobResponse>, ApiError> {
    let job = owned_job(&state, user_id, job_id).await?;
    Ok(Json(job.into()))
}

/// POST /api/v1/songs/{job_id}/check-status: one manual poll of the music service.
pub async fn check_song_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<SongJobResponse>, ApiError> {
    owned_job(&state, user_id, job_id).await?;
    let job = state.pipeline.check_status(job_id).await?;

    tracing::info!(job_id = %job_id, status = %job.status, "Manual status check");
    Ok(Json(job.into()))
}

/// Jobs of other users are reported as missing.
async fn owned_job(state: &AppState, user_id: Uuid, job_id: Uuid) -> Result<SongJob, ApiError> {
    match state.jobs.get_job(job_id).await? {
        Some(job) if job.user_id == user_id => Ok(job),
        _ => Err(ApiError::NotFound),
    }
}
