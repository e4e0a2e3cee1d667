use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::models::audio::{Clip, CreateTaskRequest, TaskStatus};
use crate::ports::AudioService;

/// Client for the third-party music generation API.
pub struct MusicApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

/// Task creation answers either `{task_id}` or `{data: {task_id}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreateTaskResponse {
    Flat { task_id: String },
    Wrapped { data: TaskIdData },
}

#[derive(Deserialize)]
struct TaskIdData {
    task_id: String,
}

/// Status bodies carry the clip array bare or under `clips` / `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusResponse {
    Bare(Vec<Clip>),
    Clips { clips: Vec<Clip> },
    Data { data: Vec<Clip> },
}

impl StatusResponse {
    fn into_clips(self) -> Vec<Clip> {
        match self {
            StatusResponse::Bare(clips)
            | StatusResponse::Clips { clips }
            | StatusResponse::Data { data: clips } => clips,
        }
    }
}

impl MusicApiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AudioError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl AudioService for MusicApiClient {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<String, AudioError> {
        let url = format!("{}/api/v1/task", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AudioError::Status {
                status: status.as_u16(),
                detail: body.chars().take(300).collect(),
            });
        }

        parse_task_id(&body)
    }

    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatus, AudioError> {
        let url = format!("{}/api/v1/task/{}", self.base_url, task_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_status(status, &body)
    }
}

fn parse_task_id(body: &str) -> Result<String, AudioError> {
    let parsed: CreateTaskResponse = serde_json::from_str(body)?;
    let task_id = match parsed {
        CreateTaskResponse::Flat { task_id } => task_id,
        CreateTaskResponse::Wrapped { data } => data.task_id,
    };
    if task_id.trim().is_empty() {
        return Err(AudioError::MissingTaskId);
    }
    Ok(task_id)
}

fn parse_status(status: StatusCode, body: &str) -> Result<TaskStatus, AudioError> {
    if status == StatusCode::ACCEPTED {
        return Ok(TaskStatus::NotReady);
    }
    if !status.is_success() {
        return Err(AudioError::Status {
            status: status.as_u16(),
            detail: body.chars().take(300).collect(),
        });
    }

    let parsed: StatusResponse = serde_json::from_str(body)?;
    Ok(TaskStatus::from_clips(parsed.into_clips()))
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Music API returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to decode music API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Music API response did not include a task id")]
    MissingTaskId,
}
