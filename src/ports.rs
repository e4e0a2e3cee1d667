//! Service contracts for every external collaborator of the song pipeline.
//!
//! Production implementations live in `services::gemini`, `services::music_api`
//! and `db::PgStore`; tests substitute in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::audio::{CreateTaskRequest, SongArtifacts, TaskStatus};
use crate::models::job::{NewSongJob, SongJob};
use crate::models::reference::{ReferenceEntry, ScoredReference};
use crate::services::gemini::GeminiError;
use crate::services::music_api::AudioError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Stored row is invalid: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Free text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GeminiError>;
}

/// Prompt to free text. No formatting guarantees.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;
}

/// Asynchronous music generation.
#[async_trait]
pub trait AudioService: Send + Sync {
    /// Submit lyrics; returns the service's task id.
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, AudioError>;

    /// One status check for a task.
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatus, AudioError>;
}

/// Read-only access to the reference lyrics corpus.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Entries whose cosine similarity to `embedding` exceeds `threshold`.
    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredReference>>;

    /// Entries whose name or text contains any keyword, case-insensitively.
    async fn search_keywords(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> StoreResult<Vec<ReferenceEntry>>;

    /// Any entries, no relevance ordering.
    async fn sample(&self, limit: usize) -> StoreResult<Vec<ReferenceEntry>>;
}

/// Persistence for song jobs.
///
/// Every mutating call only affects non-terminal jobs and returns whether a
/// row was actually changed.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, new: NewSongJob) -> StoreResult<SongJob>;

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<SongJob>>;

    async fn list_jobs_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<SongJob>>;

    /// Jobs a restarted worker should pick up again (`pending` or `generating`).
    async fn list_resumable_jobs(&self, limit: i64) -> StoreResult<Vec<SongJob>>;

    /// pending -> generating.
    async fn mark_generating(&self, job_id: Uuid) -> StoreResult<bool>;

    async fn save_draft(
        &self,
        job_id: Uuid,
        lyrics: &str,
        reference_names: &[String],
    ) -> StoreResult<bool>;

    /// Sets the external id only if none is stored yet.
    async fn set_external_job_id(&self, job_id: Uuid, external_id: &str) -> StoreResult<bool>;

    async fn complete_job(&self, job_id: Uuid, artifacts: &SongArtifacts) -> StoreResult<bool>;

    async fn fail_job(&self, job_id: Uuid, message: &str) -> StoreResult<bool>;
}
