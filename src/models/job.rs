use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a song generation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Status only moves forward: pending -> generating -> completed | failed.
    /// A pending job may fail directly (e.g. submission refused).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Generating) | (Pending, Failed) | (Generating, Completed) | (Generating, Failed)
        )
    }
}

/// A user-initiated song generation request and its pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub theme: String,
    pub style_tags: Vec<String>,
    pub lyrics: Option<String>,
    pub reference_names: Vec<String>,
    pub external_job_id: Option<String>,
    pub status: JobStatus,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when creating a job.
#[derive(Debug, Clone)]
pub struct NewSongJob {
    pub user_id: Uuid,
    pub title: String,
    pub theme: String,
    pub style_tags: Vec<String>,
    pub lyrics: Option<String>,
}

impl SongJob {
    /// Fresh `pending` job, as inserted by the job store.
    pub fn from_new(new: NewSongJob) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            theme: new.theme,
            style_tags: new.style_tags,
            lyrics: new.lyrics,
            reference_names: Vec::new(),
            external_job_id: None,
            status: JobStatus::Pending,
            audio_url: None,
            video_url: None,
            image_url: None,
            duration: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
