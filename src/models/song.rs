use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{JobStatus, SongJob};

/// Request to generate a new song.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSongRequest {
    #[garde(length(chars, min = 1, max = 200))]
    pub title: String,

    #[garde(length(chars, min = 1, max = 2000))]
    pub theme: String,

    #[serde(default)]
    #[garde(length(max = 10), inner(length(chars, min = 1, max = 50)))]
    pub style_tags: Vec<String>,

    /// Pre-written lyrics skip retrieval and drafting.
    #[serde(default)]
    #[garde(inner(length(chars, min = 1, max = 5000)))]
    pub lyrics: Option<String>,
}

impl CreateSongRequest {
    /// Trim user input; blank lyrics count as absent.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.theme = self.theme.trim().to_string();
        self.style_tags = self
            .style_tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.lyrics = self
            .lyrics
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self
    }
}

/// Response after submitting a song request.
#[derive(Debug, Serialize)]
pub struct CreateSongResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// Job as shown to its owner.
#[derive(Debug, Serialize)]
pub struct SongJobResponse {
    pub job_id: Uuid,
    pub title: String,
    pub theme: String,
    pub style_tags: Vec<String>,
    pub status: JobStatus,
    pub lyrics: Option<String>,
    pub reference_names: Vec<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<f64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SongJob> for SongJobResponse {
    fn from(job: SongJob) -> Self {
        Self {
            job_id: job.id,
            title: job.title,
            theme: job.theme,
            style_tags: job.style_tags,
            status: job.status,
            lyrics: job.lyrics,
            reference_names: job.reference_names,
            audio_url: job.audio_url,
            video_url: job.video_url,
            image_url: job.image_url,
            duration: job.duration,
            error: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, theme: &str, tags: &[&str]) -> CreateSongRequest {
        CreateSongRequest {
            title: title.to_string(),
            theme: theme.to_string(),
            style_tags: tags.iter().map(|t| t.to_string()).collect(),
            lyrics: None,
        }
    }

    #[test]
    fn test_valid_request() {
        let req = request("Pehli Baarish", "first rain of the monsoon", &["romantic", "acoustic"]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let req = request("  ", "theme", &[]).normalized();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_too_many_tags_rejected() {
        let tags: Vec<&str> = std::iter::repeat("pop").take(11).collect();
        assert!(request("t", "theme", &tags).validate().is_err());
    }

    #[test]
    fn test_normalized_drops_blank_tags_and_lyrics() {
        let mut req = request(" Title ", " theme ", &["rock", "  ", " folk "]);
        req.lyrics = Some("   ".to_string());
        let req = req.normalized();
        assert_eq!(req.title, "Title");
        assert_eq!(req.style_tags, vec!["rock", "folk"]);
        assert!(req.lyrics.is_none());
    }
}
