use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::ports::JobStore;
use crate::services::{
    drafting::LyricsDrafter,
    gemini::{GeminiClient, GeminiError},
    music_api::{AudioError, MusicApiClient},
    pipeline::SongPipeline,
    polling::CompletionPoller,
    queue::JobQueue,
    retrieval::ReferenceRetriever,
    submission::AudioSubmitter,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<JobQueue>,
    pub pipeline: Arc<SongPipeline>,
    pub auth: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        queue: JobQueue,
        pipeline: Arc<SongPipeline>,
        auth: TokenVerifier,
    ) -> Self {
        Self {
            jobs: Arc::new(PgStore::new(db.clone())),
            db,
            queue: Arc::new(queue),
            pipeline,
            auth: Arc::new(auth),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Failed to build Gemini client: {0}")]
    Gemini(#[from] GeminiError),

    #[error("Failed to build music API client: {0}")]
    Audio(#[from] AudioError),
}

/// Assemble the song pipeline from configuration and a Postgres store.
pub fn build_pipeline(config: &AppConfig, store: PgStore) -> Result<SongPipeline, WiringError> {
    let store = Arc::new(store);

    let gemini = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_api_key,
        &config.embedding_model,
        &config.text_model,
        config.http_timeout(),
    )?);
    let music = Arc::new(MusicApiClient::new(
        &config.music_api_base_url,
        &config.music_api_key,
        config.http_timeout(),
    )?);

    let retriever = ReferenceRetriever::standard(
        gemini.clone(),
        store.clone(),
        config.similarity_threshold,
    );
    let drafter = LyricsDrafter::new(gemini);
    let submitter = AudioSubmitter::new(
        music.clone(),
        config.music_model_version.clone(),
        config.placeholder_fallback,
    );
    let poller = CompletionPoller::new(music, config.backoff_policy(), config.placeholder_delay());

    Ok(SongPipeline::new(
        store,
        retriever,
        drafter,
        submitter,
        poller,
        config.reference_count,
    ))
}
