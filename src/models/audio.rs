use serde::{Deserialize, Serialize};

/// Body of the music service's task creation call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateTaskRequest {
    pub task_type: String,
    pub custom_mode: bool,
    /// Full lyrics; the service calls this field `prompt` in custom mode.
    pub prompt: String,
    pub title: String,
    pub tags: String,
    pub model_version: String,
}

/// Lifecycle state of one generated clip.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClipState {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// One sub-clip of a music generation task.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Clip {
    pub state: ClipState,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Decoded answer of a status poll. Transport problems are reported as
/// errors by the client, never as a variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// The service answered 202: results not available yet.
    NotReady,
    /// Clips exist but none has settled.
    Running,
    /// At least one clip succeeded; holds only the succeeded clips.
    Succeeded(Vec<Clip>),
    /// Some clip failed and none succeeded.
    Failed,
}

impl TaskStatus {
    pub fn from_clips(clips: Vec<Clip>) -> Self {
        let failed = clips.iter().any(|c| c.state == ClipState::Failed);
        let succeeded: Vec<Clip> = clips
            .into_iter()
            .filter(|c| c.state == ClipState::Succeeded)
            .collect();

        if !succeeded.is_empty() {
            TaskStatus::Succeeded(succeeded)
        } else if failed {
            TaskStatus::Failed
        } else {
            TaskStatus::Running
        }
    }
}

/// Artifacts captured when a job completes.
#[derive(Debug, Clone, PartialEq)]
pub struct SongArtifacts {
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<f64>,
}

impl From<&Clip> for SongArtifacts {
    fn from(clip: &Clip) -> Self {
        Self {
            audio_url: clip.audio_url.clone(),
            video_url: clip.video_url.clone(),
            image_url: clip.image_url.clone(),
            duration: clip.duration,
        }
    }
}
