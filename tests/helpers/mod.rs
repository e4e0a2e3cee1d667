//! In-memory stand-ins for the pipeline's collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use amor::models::audio::{Clip, ClipState, CreateTaskRequest, SongArtifacts, TaskStatus};
use amor::models::job::{JobStatus, NewSongJob, SongJob};
use amor::models::reference::{ReferenceEntry, ScoredReference};
use amor::ports::{
    AudioService, CorpusStore, EmbeddingService, JobStore, StoreError, StoreResult,
    TextGenerationService,
};
use amor::services::drafting::LyricsDrafter;
use amor::services::gemini::GeminiError;
use amor::services::music_api::AudioError;
use amor::services::pipeline::SongPipeline;
use amor::services::polling::{BackoffPolicy, CompletionPoller};
use amor::services::retrieval::{cosine_similarity, ReferenceRetriever};
use amor::services::submission::AudioSubmitter;

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

/// Job store with the same guards and timestamps as the Postgres queries.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, SongJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, job_id: Uuid) -> SongJob {
        self.jobs.lock().unwrap()[&job_id].clone()
    }

    /// Apply `f` to a non-terminal job. Returns whether it ran.
    fn update(&self, job_id: Uuid, f: impl FnOnce(&mut SongJob) -> bool) -> StoreResult<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        if job.status.is_terminal() {
            return Ok(false);
        }
        let changed = f(job);
        if changed {
            job.updated_at = Utc::now();
        }
        Ok(changed)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, new: NewSongJob) -> StoreResult<SongJob> {
        let job = SongJob::from_new(new);
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<SongJob>> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn list_jobs_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<SongJob>> {
        let mut jobs: Vec<SongJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn list_resumable_jobs(&self, limit: i64) -> StoreResult<Vec<SongJob>> {
        let mut jobs: Vec<SongJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| !j.status.is_terminal())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn mark_generating(&self, job_id: Uuid) -> StoreResult<bool> {
        self.update(job_id, |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.status = JobStatus::Generating;
            true
        })
    }

    async fn save_draft(
        &self,
        job_id: Uuid,
        lyrics: &str,
        reference_names: &[String],
    ) -> StoreResult<bool> {
        self.update(job_id, |job| {
            job.lyrics = Some(lyrics.to_string());
            job.reference_names = reference_names.to_vec();
            true
        })
    }

    async fn set_external_job_id(&self, job_id: Uuid, external_id: &str) -> StoreResult<bool> {
        self.update(job_id, |job| {
            if job.external_job_id.is_some() {
                return false;
            }
            job.external_job_id = Some(external_id.to_string());
            true
        })
    }

    async fn complete_job(&self, job_id: Uuid, artifacts: &SongArtifacts) -> StoreResult<bool> {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.audio_url = artifacts.audio_url.clone();
            job.video_url = artifacts.video_url.clone();
            job.image_url = artifacts.image_url.clone();
            job.duration = artifacts.duration;
            job.error_message = None;
            job.completed_at = Some(Utc::now());
            true
        })
    }

    async fn fail_job(&self, job_id: Uuid, message: &str) -> StoreResult<bool> {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(message.to_string());
            job.completed_at = Some(Utc::now());
            true
        })
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Corpus held in a vector; entries without an embedding never match by
/// similarity.
#[derive(Default)]
pub struct MemoryCorpus {
    entries: Vec<(ReferenceEntry, Option<Vec<f32>>)>,
    unavailable: bool,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query fails as if the database were down.
    pub fn unavailable() -> Self {
        Self {
            entries: Vec::new(),
            unavailable: true,
        }
    }

    pub fn with(mut self, name: &str, text: &str, embedding: Option<Vec<f32>>) -> Self {
        self.entries.push((ReferenceEntry::new(name, text), embedding));
        self
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpus {
    async fn match_by_embedding(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredReference>> {
        self.check()?;
        // Unordered; ranking is left to the caller.
        Ok(self
            .entries
            .iter()
            .filter_map(|(entry, stored)| {
                let stored = stored.as_ref()?;
                let similarity = cosine_similarity(embedding, stored);
                (similarity > threshold).then(|| ScoredReference {
                    entry: entry.clone(),
                    similarity,
                })
            })
            .take(limit)
            .collect())
    }

    async fn search_keywords(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> StoreResult<Vec<ReferenceEntry>> {
        self.check()?;
        Ok(self
            .entries
            .iter()
            .map(|(entry, _)| entry)
            .filter(|entry| {
                let name = entry.name.to_lowercase();
                let text = entry.text.to_lowercase();
                keywords
                    .iter()
                    .any(|k| name.contains(k.as_str()) || text.contains(k.as_str()))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn sample(&self, limit: usize) -> StoreResult<Vec<ReferenceEntry>> {
        self.check()?;
        Ok(self
            .entries
            .iter()
            .take(limit)
            .map(|(entry, _)| entry.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Gemini stand-ins
// ---------------------------------------------------------------------------

fn unavailable() -> GeminiError {
    GeminiError::Status {
        status: 503,
        detail: "service unavailable".to_string(),
    }
}

pub struct FakeEmbedder {
    vector: Option<Vec<f32>>,
}

impl FakeEmbedder {
    pub fn returning(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
        }
    }

    pub fn failing() -> Self {
        Self { vector: None }
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, GeminiError> {
        self.vector.clone().ok_or_else(unavailable)
    }
}

pub struct FakeGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationService for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or_else(unavailable)
    }
}

// ---------------------------------------------------------------------------
// Music service stand-in
// ---------------------------------------------------------------------------

/// One scripted answer to a status poll.
#[derive(Debug, Clone)]
pub enum Reply {
    NotReady,
    Running,
    Succeeded { audio_url: String, duration: f64 },
    Failed,
    TransportError,
}

impl Reply {
    pub fn succeeded(audio_url: &str, duration: f64) -> Self {
        Reply::Succeeded {
            audio_url: audio_url.to_string(),
            duration,
        }
    }

    fn into_result(self) -> Result<TaskStatus, AudioError> {
        let clip = |state: ClipState, audio_url: Option<String>, duration: Option<f64>| Clip {
            state,
            audio_url,
            video_url: None,
            image_url: None,
            duration,
            title: None,
        };
        match self {
            Reply::NotReady => Ok(TaskStatus::NotReady),
            Reply::Running => Ok(TaskStatus::from_clips(vec![clip(ClipState::Running, None, None)])),
            Reply::Succeeded {
                audio_url,
                duration,
            } => Ok(TaskStatus::from_clips(vec![clip(
                ClipState::Succeeded,
                Some(audio_url),
                Some(duration),
            )])),
            Reply::Failed => Ok(TaskStatus::from_clips(vec![clip(ClipState::Failed, None, None)])),
            Reply::TransportError => Err(AudioError::Status {
                status: 502,
                detail: "bad gateway".to_string(),
            }),
        }
    }
}

/// Music service whose status answers are played back in order. Once the
/// script runs out, `fallback` is repeated.
pub struct ScriptedAudio {
    task_id: Option<String>,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    submissions: Mutex<Vec<CreateTaskRequest>>,
    polls: AtomicUsize,
}

impl ScriptedAudio {
    pub fn accepting(task_id: &str) -> Self {
        Self {
            task_id: Some(task_id.to_string()),
            script: Mutex::new(VecDeque::new()),
            fallback: Reply::Running,
            submissions: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    /// Every submission fails at the transport level.
    pub fn unreachable() -> Self {
        Self {
            task_id: None,
            fallback: Reply::TransportError,
            ..Self::accepting("")
        }
    }

    pub fn then(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script.lock().unwrap().extend(replies);
        self
    }

    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    pub fn submissions(&self) -> Vec<CreateTaskRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioService for ScriptedAudio {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, AudioError> {
        self.submissions.lock().unwrap().push(request.clone());
        self.task_id.clone().ok_or(AudioError::Status {
            status: 503,
            detail: "connection refused".to_string(),
        })
    }

    async fn fetch_status(&self, _task_id: &str) -> Result<TaskStatus, AudioError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone()).into_result()
    }
}

// ---------------------------------------------------------------------------
// Pipeline assembly
// ---------------------------------------------------------------------------

/// Millisecond-scale schedule so polling tests finish quickly.
pub fn fast_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts,
        interval: Duration::from_millis(1),
        multiplier: 1.5,
        max_delay: Duration::from_millis(5),
        max_elapsed: None,
    }
}

pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub generator: Arc<FakeGenerator>,
    pub audio: Arc<ScriptedAudio>,
    pub pipeline: Arc<SongPipeline>,
}

pub struct HarnessBuilder {
    corpus: MemoryCorpus,
    embedder: FakeEmbedder,
    generator: FakeGenerator,
    audio: ScriptedAudio,
    policy: BackoffPolicy,
    placeholder_fallback: bool,
}

impl HarnessBuilder {
    pub fn new(audio: ScriptedAudio) -> Self {
        Self {
            corpus: MemoryCorpus::new(),
            embedder: FakeEmbedder::failing(),
            generator: FakeGenerator::replying("[Verse 1]\nDil ki baatein\n[Chorus]\nTu hi tu"),
            audio,
            policy: fast_policy(5),
            placeholder_fallback: true,
        }
    }

    pub fn corpus(mut self, corpus: MemoryCorpus) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn embedder(mut self, embedder: FakeEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn generator(mut self, generator: FakeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn placeholder_fallback(mut self, enabled: bool) -> Self {
        self.placeholder_fallback = enabled;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(MemoryJobStore::new());
        let generator = Arc::new(self.generator);
        let audio = Arc::new(self.audio);

        let retriever =
            ReferenceRetriever::standard(Arc::new(self.embedder), Arc::new(self.corpus), 0.1);
        let pipeline = SongPipeline::new(
            store.clone(),
            retriever,
            LyricsDrafter::new(generator.clone()),
            AudioSubmitter::new(audio.clone(), "chirp-v3-5", self.placeholder_fallback),
            CompletionPoller::new(audio.clone(), self.policy, Duration::ZERO),
            3,
        );

        Harness {
            store,
            generator,
            audio,
            pipeline: Arc::new(pipeline),
        }
    }
}

impl Harness {
    pub async fn new_job(&self, theme: &str) -> SongJob {
        self.store
            .create_job(NewSongJob {
                user_id: Uuid::new_v4(),
                title: "Barsaat Ki Raat".to_string(),
                theme: theme.to_string(),
                style_tags: vec!["romantic".to_string()],
                lyrics: None,
            })
            .await
            .unwrap()
    }
}
