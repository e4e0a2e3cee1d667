//! Orchestration of one song job: retrieval, drafting, submission, polling.

use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::job::{JobStatus, SongJob};
use crate::ports::{JobStore, StoreError};
use crate::services::drafting::{LyricsDrafter, FALLBACK_LYRICS};
use crate::services::music_api::AudioError;
use crate::services::polling::{CompletionPoller, PollOutcome, PollStep};
use crate::services::retrieval::ReferenceRetriever;
use crate::services::submission::{AudioSubmitter, Submission};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Status check failed: {0}")]
    Audio(#[from] AudioError),

    #[error("Pipeline task aborted: {0}")]
    Task(#[from] JoinError),
}

/// Handle to a spawned pipeline task.
pub struct PipelineHandle {
    job_id: Uuid,
    handle: JoinHandle<Result<JobStatus, PipelineError>>,
}

impl PipelineHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task; yields the job's final status.
    pub async fn join(self) -> Result<JobStatus, PipelineError> {
        self.handle.await?
    }
}

pub struct SongPipeline {
    jobs: Arc<dyn JobStore>,
    retriever: ReferenceRetriever,
    drafter: LyricsDrafter,
    submitter: AudioSubmitter,
    poller: CompletionPoller,
    reference_count: usize,
}

impl SongPipeline {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        retriever: ReferenceRetriever,
        drafter: LyricsDrafter,
        submitter: AudioSubmitter,
        poller: CompletionPoller,
        reference_count: usize,
    ) -> Self {
        Self {
            jobs,
            retriever,
            drafter,
            submitter,
            poller,
            reference_count,
        }
    }

    /// Run the job in its own task.
    pub fn spawn(self: &Arc<Self>, job_id: Uuid) -> PipelineHandle {
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = pipeline.run(job_id).await;
            if let Err(ref e) = result {
                error!(job_id = %job_id, error = %e, "Song pipeline aborted");
            }
            result
        });
        PipelineHandle { job_id, handle }
    }

    /// Drive a job to a terminal state.
    ///
    /// Safe to call again for an unfinished job: stored lyrics are reused and
    /// a stored external id is polled instead of submitting a new task.
    pub async fn run(&self, job_id: Uuid) -> Result<JobStatus, PipelineError> {
        let job = self.load(job_id).await?;
        if job.status.is_terminal() {
            info!(job_id = %job_id, status = %job.status, "Job already finished");
            return Ok(job.status);
        }

        let started = Instant::now();
        if job.status == JobStatus::Pending {
            self.jobs.mark_generating(job_id).await?;
        }
        info!(job_id = %job_id, title = %job.title, "Generating song");

        let lyrics = match &job.lyrics {
            Some(lyrics) => lyrics.clone(),
            None => {
                let (lyrics, reference_names) = self.prepare_lyrics(&job).await;
                self.jobs.save_draft(job_id, &lyrics, &reference_names).await?;
                lyrics
            }
        };

        let task_id = match &job.external_job_id {
            Some(existing) => {
                info!(job_id = %job_id, task_id = %existing, "Resuming existing music task");
                existing.clone()
            }
            None => match self.submitter.submit(&job.title, &lyrics, &job.style_tags).await {
                Ok(submission) => self.record_submission(job_id, submission).await?,
                Err(e) => {
                    let message = format!("Audio submission failed: {e}");
                    return self.settle(job_id, PollOutcome::Failed(message), started).await;
                }
            },
        };

        let outcome = self.poller.poll_until_done(&task_id).await;
        self.settle(job_id, outcome, started).await
    }

    /// Manual status check for a job shown as generating.
    ///
    /// Applies the same transitions as the polling loop. Jobs that are not
    /// generating or have no external id are returned unchanged.
    pub async fn check_status(&self, job_id: Uuid) -> Result<SongJob, PipelineError> {
        let job = self.load(job_id).await?;
        let task_id = match (&job.status, &job.external_job_id) {
            (JobStatus::Generating, Some(task_id)) => task_id.clone(),
            _ => return Ok(job),
        };

        match self.poller.check_once(&task_id).await? {
            PollStep::Pending => Ok(job),
            PollStep::Done(outcome) => {
                self.apply_outcome(job_id, &outcome).await?;
                self.load(job_id).await
            }
        }
    }

    async fn load(&self, job_id: Uuid) -> Result<SongJob, PipelineError> {
        self.jobs
            .get_job(job_id)
            .await?
            .ok_or(PipelineError::NotFound(job_id))
    }

    /// Retrieval then drafting; drafting errors fall back to fixed lyrics.
    async fn prepare_lyrics(&self, job: &SongJob) -> (String, Vec<String>) {
        let retrieval = self
            .retriever
            .retrieve(&job.theme, self.reference_count)
            .await;
        let names = retrieval.names();

        match self
            .drafter
            .draft(&job.theme, &job.style_tags, &retrieval.references)
            .await
        {
            Ok(lyrics) => {
                info!(job_id = %job.id, tier = %retrieval.tier, "Lyrics drafted");
                (lyrics, names)
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Drafting failed, using fallback lyrics");
                metrics::counter!("drafting_fallback_total").increment(1);
                (FALLBACK_LYRICS.to_string(), names)
            }
        }
    }

    async fn record_submission(
        &self,
        job_id: Uuid,
        submission: Submission,
    ) -> Result<String, PipelineError> {
        let task_id = submission.task_id().to_string();
        if self.jobs.set_external_job_id(job_id, &task_id).await? {
            return Ok(task_id);
        }

        // Another writer stored an id first; follow that one.
        let job = self.load(job_id).await?;
        Ok(job.external_job_id.unwrap_or(task_id))
    }

    async fn apply_outcome(&self, job_id: Uuid, outcome: &PollOutcome) -> Result<bool, PipelineError> {
        let changed = match outcome {
            PollOutcome::Completed(artifacts) => self.jobs.complete_job(job_id, artifacts).await?,
            other => {
                let message = other.error_message().unwrap_or("Song generation failed");
                self.jobs.fail_job(job_id, message).await?
            }
        };

        if changed {
            match outcome {
                PollOutcome::Completed(_) => {
                    metrics::counter!("song_jobs_completed_total").increment(1);
                    info!(job_id = %job_id, "Song completed");
                }
                other => {
                    metrics::counter!("song_jobs_failed_total").increment(1);
                    warn!(job_id = %job_id, error = other.error_message().unwrap_or_default(), "Song failed");
                }
            }
        }
        Ok(changed)
    }

    async fn settle(
        &self,
        job_id: Uuid,
        outcome: PollOutcome,
        started: Instant,
    ) -> Result<JobStatus, PipelineError> {
        let changed = self.apply_outcome(job_id, &outcome).await?;
        metrics::histogram!("song_generation_seconds").record(started.elapsed().as_secs_f64());

        if changed {
            return Ok(match outcome {
                PollOutcome::Completed(_) => JobStatus::Completed,
                _ => JobStatus::Failed,
            });
        }

        // Already settled elsewhere (manual status check).
        Ok(self.load(job_id).await?.status)
    }
}
