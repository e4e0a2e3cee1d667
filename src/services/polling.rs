//! Completion polling for music generation tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::models::audio::{SongArtifacts, TaskStatus};
use crate::ports::AudioService;
use crate::services::music_api::AudioError;
use crate::services::submission::is_placeholder;

/// Message stored when the provider reports a failed clip.
pub const PROVIDER_FAILURE_MESSAGE: &str = "Song generation failed at provider";

/// Artifacts returned for placeholder task ids.
pub const PLACEHOLDER_AUDIO_URL: &str = "https://cdn.amor.app/placeholder/song.mp3";
pub const PLACEHOLDER_VIDEO_URL: &str = "https://cdn.amor.app/placeholder/song.mp4";
pub const PLACEHOLDER_IMAGE_URL: &str = "https://cdn.amor.app/placeholder/cover.jpg";
pub const PLACEHOLDER_DURATION_SECS: f64 = 180.0;

/// Retry schedule for the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Status checks before giving up.
    pub max_attempts: u32,
    /// Wait between checks while the task is still running.
    pub interval: Duration,
    /// Growth factor applied per consecutive transport error.
    pub multiplier: f64,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Optional wall-clock budget for the whole loop.
    pub max_elapsed: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_secs(30),
            multiplier: 1.5,
            max_delay: Duration::from_secs(120),
            max_elapsed: Some(Duration::from_secs(450)),
        }
    }
}

impl BackoffPolicy {
    /// Delay after `consecutive_errors` transport errors in a row (0 = none).
    pub fn delay_for(&self, consecutive_errors: u32) -> Duration {
        if consecutive_errors == 0 {
            return self.interval.min(self.max_delay);
        }
        let exp = consecutive_errors.min(32) as i32;
        let secs = self.interval.as_secs_f64() * self.multiplier.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Terminal result of polling one task.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(SongArtifacts),
    /// The provider reported failure.
    Failed(String),
    /// Budget exhausted while the task was still running.
    TimedOut(String),
    /// Budget exhausted on transport errors.
    PollingFailed(String),
}

impl PollOutcome {
    /// Message stored on the job for every non-success outcome.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PollOutcome::Completed(_) => None,
            PollOutcome::Failed(m) | PollOutcome::TimedOut(m) | PollOutcome::PollingFailed(m) => {
                Some(m)
            }
        }
    }
}

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Pending,
    Done(PollOutcome),
}

pub fn placeholder_artifacts() -> SongArtifacts {
    SongArtifacts {
        audio_url: Some(PLACEHOLDER_AUDIO_URL.to_string()),
        video_url: Some(PLACEHOLDER_VIDEO_URL.to_string()),
        image_url: Some(PLACEHOLDER_IMAGE_URL.to_string()),
        duration: Some(PLACEHOLDER_DURATION_SECS),
    }
}

/// Map a decoded status onto the job state machine.
pub fn evaluate(status: TaskStatus) -> PollStep {
    match status {
        TaskStatus::NotReady | TaskStatus::Running => PollStep::Pending,
        TaskStatus::Succeeded(clips) => match clips.first() {
            Some(clip) => PollStep::Done(PollOutcome::Completed(SongArtifacts::from(clip))),
            None => PollStep::Pending,
        },
        TaskStatus::Failed => PollStep::Done(PollOutcome::Failed(PROVIDER_FAILURE_MESSAGE.to_string())),
    }
}

pub struct CompletionPoller {
    audio: Arc<dyn AudioService>,
    policy: BackoffPolicy,
    placeholder_delay: Duration,
}

impl CompletionPoller {
    pub fn new(audio: Arc<dyn AudioService>, policy: BackoffPolicy, placeholder_delay: Duration) -> Self {
        Self {
            audio,
            policy,
            placeholder_delay,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// One out-of-band status check with the same transition rules as the
    /// loop. Placeholder ids resolve immediately.
    pub async fn check_once(&self, task_id: &str) -> Result<PollStep, AudioError> {
        if is_placeholder(task_id) {
            return Ok(PollStep::Done(PollOutcome::Completed(placeholder_artifacts())));
        }
        let status = self.audio.fetch_status(task_id).await?;
        Ok(evaluate(status))
    }

    /// Poll until the task settles or the budget runs out.
    pub async fn poll_until_done(&self, task_id: &str) -> PollOutcome {
        if is_placeholder(task_id) {
            debug!(task_id = %task_id, "Resolving placeholder task");
            sleep(self.placeholder_delay).await;
            return PollOutcome::Completed(placeholder_artifacts());
        }

        let started = Instant::now();
        let mut consecutive_errors: u32 = 0;
        let mut last_error: Option<String> = None;
        let mut attempts: u32 = 0;

        while attempts < self.policy.max_attempts {
            attempts += 1;

            match self.audio.fetch_status(task_id).await {
                Ok(status) => {
                    consecutive_errors = 0;
                    last_error = None;
                    match evaluate(status) {
                        PollStep::Done(outcome) => {
                            info!(task_id = %task_id, attempts, "Music task settled");
                            return outcome;
                        }
                        PollStep::Pending => {
                            debug!(task_id = %task_id, attempt = attempts, "Music task not ready");
                        }
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        task_id = %task_id,
                        attempt = attempts,
                        consecutive_errors,
                        error = %e,
                        "Status poll failed"
                    );
                    last_error = Some(e.to_string());
                }
            }

            if attempts >= self.policy.max_attempts {
                break;
            }

            let delay = self.policy.delay_for(consecutive_errors);
            if let Some(budget) = self.policy.max_elapsed {
                if started.elapsed() + delay > budget {
                    warn!(task_id = %task_id, attempts, "Polling wall-clock budget exhausted");
                    break;
                }
            }
            sleep(delay).await;
        }

        match last_error {
            Some(error) => PollOutcome::PollingFailed(format!(
                "Polling failed after {attempts} attempts: {error}"
            )),
            None => PollOutcome::TimedOut(format!("Polling timed out after {attempts} attempts")),
        }
    }
}
