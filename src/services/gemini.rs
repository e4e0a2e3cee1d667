use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{EmbeddingService, TextGenerationService};

/// Client for the Gemini embedding and text generation endpoints.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    text_model: String,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        embedding_model: &str,
        text_model: &str,
        timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            embedding_model: embedding_model.to_string(),
            text_model: text_model.to_string(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, GeminiError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status {
                status: status.as_u16(),
                detail: truncate(&detail, 300),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl EmbeddingService for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GeminiError> {
        let url = self.model_url(&self.embedding_model, "embedContent");
        let body = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let parsed: EmbedResponse = self.post(&url, &body).await?.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl TextGenerationService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = self.model_url(&self.text_model, "generateContent");
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 1024,
            },
        };

        let parsed: GenerateResponse = self.post(&url, &body).await?.json().await?;
        first_candidate_text(parsed).ok_or(GeminiError::EmptyResponse)
    }
}

fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Gemini response contained no usable content")]
    EmptyResponse,
}
