//! Short natural-language descriptions of a file's metadata, produced by a
//! hosted generative model.
//!
//! Summaries are decoration: every failure on this path is logged and
//! replaced by [`FALLBACK_SUMMARY`], never returned to the caller.

use crate::config::SummarizerConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

pub const FALLBACK_SUMMARY: &str = "AI summary unavailable for this file.";

/// What the model gets to see. File contents are never sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub name: String,
    pub formatted_size: String,
    pub mime_type: String,
    pub digest: String,
}

impl SummaryRequest {
    fn prompt(&self) -> String {
        format!(
            "In one or two sentences, describe what kind of file this probably is and what \
             it might be used for. Do not repeat the hash.\n\
             Name: {}\nSize: {}\nType: {}\nSHA3-256: {}",
            self.name, self.formatted_size, self.mime_type, self.digest
        )
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `None` means no summary was requested; failures produce
    /// `Some(FALLBACK_SUMMARY)`.
    async fn summarize(&self, request: &SummaryRequest) -> Option<String>;
}

/// Used when summaries are switched off.
#[derive(Debug, Default)]
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _request: &SummaryRequest) -> Option<String> {
        None
    }
}

#[derive(Error, Debug)]
enum SummarizerError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("response contained no text")]
    EmptyResponse,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
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
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    text: Option<String>,
}

/// Gemini `generateContent` client.
///
/// Holds a snapshot of the configuration; build a fresh one per request via
/// [`summarizer_from_config`] to pick up rotated credentials.
#[derive(Debug)]
pub struct GeminiSummarizer {
    config: SummarizerConfig,
}

impl GeminiSummarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        GeminiSummarizer { config }
    }

    async fn request(&self, request: &SummaryRequest) -> Result<String, SummarizerError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SummarizerError::MissingApiKey)?;

        let client = Client::builder().timeout(self.config.timeout()).build()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let prompt = request.prompt();
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![PartOut { text: &prompt }],
            }],
        };

        debug!(model = %self.config.model, file = %request.name, "requesting summary");
        let resp = client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SummarizerError::Status(resp.status()));
        }

        let parsed: GenerateResponse = resp.json().await?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .ok_or(SummarizerError::EmptyResponse)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Option<String> {
        match self.request(request).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(file = %request.name, error = %e, "summary failed, using fallback");
                Some(FALLBACK_SUMMARY.to_string())
            }
        }
    }
}

/// Build the summarizer for one operation from the stored configuration
/// with `env` overrides applied on top.
pub fn summarizer_from_config(
    config: &SummarizerConfig,
    env: &HashMap<String, String>,
) -> Box<dyn Summarizer> {
    if !config.enabled {
        return Box::new(DisabledSummarizer);
    }
    Box::new(GeminiSummarizer::new(config.refreshed_from(env)))
}
