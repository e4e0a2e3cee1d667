use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::audio::SongArtifacts;
use crate::models::job::{NewSongJob, SongJob};
use crate::models::reference::{ReferenceEntry, ScoredReference};
use crate::ports::{CorpusStore, JobStore, StoreResult};

pub mod corpus_queries;
pub mod queries;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Postgres-backed job and corpus store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(&self, new: NewSongJob) -> StoreResult<SongJob> {
        queries::create_job(&self.pool, new).await
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<SongJob>> {
        queries::get_job(&self.pool, job_id).await
    }

    async fn list_jobs_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<SongJob>> {
        queries::list_jobs_for_user(&self.pool, user_id, limit).await
    }

    async fn list_resumable_jobs(&self, limit: i64) -> StoreResult<Vec<SongJob>> {
        queries::list_resumable_jobs(&self.pool, limit).await
    }

    async fn mark_generating(&self, job_id: Uuid) -> StoreResult<bool> {
        Ok(queries::mark_generating(&self.pool, job_id).await?)
    }

    async fn save_draft(
        &self,
        job_id: Uuid,
        lyrics: &str,
        reference_names: &[String],
    ) -> StoreResult<bool> {
        Ok(queries::save_draft(&self.pool, job_id, lyrics, reference_names).await?)
    }

    async fn set_external_job_id(&self, job_id: Uuid, external_id: &str) -> StoreResult<bool> {
        Ok(queries::set_external_job_id(&self.pool, job_id, external_id).await?)
    }

    async fn complete_job(&self, job_id: Uuid, artifacts: &SongArtifacts) -> StoreResult<bool> {
        Ok(queries::complete_job(&self.pool, job_id, artifacts).await?)
    }

    async fn fail_job(&self, job_id: Uuid, message: &str) -> StoreResult<bool> {
        Ok(queries::fail_job(&self.pool, job_id, message).await?)
    }
}

#[async_trait]
impl CorpusStore for PgStore {
    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredReference>> {
        Ok(corpus_queries::match_by_embedding(&self.pool, embedding, threshold, limit).await?)
    }

    async fn search_keywords(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> StoreResult<Vec<ReferenceEntry>> {
        Ok(corpus_queries::search_keywords(&self.pool, keywords, limit).await?)
    }

    async fn sample(&self, limit: usize) -> StoreResult<Vec<ReferenceEntry>> {
        Ok(corpus_queries::sample(&self.pool, limit).await?)
    }
}
