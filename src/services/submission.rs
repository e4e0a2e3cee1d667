use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::audio::CreateTaskRequest;
use crate::ports::AudioService;
use crate::services::music_api::AudioError;

/// Prefix reserved for locally synthesized task ids.
pub const PLACEHOLDER_PREFIX: &str = "mock_";

/// Tags sent when the user chose no style.
pub const DEFAULT_TAGS: &str = "bollywood, romantic, hindi";

const TASK_TYPE: &str = "generate_music";

/// What the submission stage handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The music service accepted the task.
    Accepted(String),
    /// The service refused or was unreachable; a placeholder id stands in.
    Placeholder(String),
}

impl Submission {
    pub fn task_id(&self) -> &str {
        match self {
            Submission::Accepted(id) | Submission::Placeholder(id) => id,
        }
    }
}

pub struct AudioSubmitter {
    audio: Arc<dyn AudioService>,
    model_version: String,
    placeholder_fallback: bool,
}

impl AudioSubmitter {
    pub fn new(
        audio: Arc<dyn AudioService>,
        model_version: impl Into<String>,
        placeholder_fallback: bool,
    ) -> Self {
        Self {
            audio,
            model_version: model_version.into(),
            placeholder_fallback,
        }
    }

    pub fn build_request(&self, title: &str, lyrics: &str, style_tags: &[String]) -> CreateTaskRequest {
        CreateTaskRequest {
            task_type: TASK_TYPE.to_string(),
            custom_mode: true,
            prompt: lyrics.to_string(),
            title: title.to_string(),
            tags: tags_for(style_tags),
            model_version: self.model_version.clone(),
        }
    }

    /// Submit lyrics to the music service.
    ///
    /// Errors only when the service fails and placeholder fallback is disabled.
    pub async fn submit(
        &self,
        title: &str,
        lyrics: &str,
        style_tags: &[String],
    ) -> Result<Submission, AudioError> {
        let request = self.build_request(title, lyrics, style_tags);

        match self.audio.create_task(&request).await {
            Ok(task_id) => {
                info!(task_id = %task_id, "Music task created");
                Ok(Submission::Accepted(task_id))
            }
            Err(e) if self.placeholder_fallback => {
                let task_id = placeholder_task_id();
                warn!(error = %e, task_id = %task_id, "Music submission failed, using placeholder");
                metrics::counter!("audio_placeholder_jobs_total").increment(1);
                Ok(Submission::Placeholder(task_id))
            }
            Err(e) => Err(e),
        }
    }
}

/// Style tags joined for the music service, or [`DEFAULT_TAGS`].
pub fn tags_for(style_tags: &[String]) -> String {
    let tags: Vec<&str> = style_tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        DEFAULT_TAGS.to_string()
    } else {
        tags.join(", ")
    }
}

/// `mock_<unix millis>_<9 random alphanumerics>`.
pub fn placeholder_task_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "{}{}_{}",
        PLACEHOLDER_PREFIX,
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

pub fn is_placeholder(task_id: &str) -> bool {
    task_id.starts_with(PLACEHOLDER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_joined_or_defaulted() {
        assert_eq!(tags_for(&[]), DEFAULT_TAGS);
        assert_eq!(tags_for(&["  ".to_string()]), DEFAULT_TAGS);
        assert_eq!(
            tags_for(&["sufi".to_string(), " acoustic ".to_string()]),
            "sufi, acoustic"
        );
    }

    #[test]
    fn test_placeholder_id_format() {
        let id = placeholder_task_id();
        assert!(is_placeholder(&id));
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(id, placeholder_task_id());
    }

    #[test]
    fn test_real_ids_not_placeholders() {
        assert!(!is_placeholder("4f1c2a9e-task"));
    }
}
