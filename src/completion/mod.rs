//! Single-turn text completion and the finance assistant built on it

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, Service};

/// Instructions prepended to every assistant question
pub const SYSTEM_PROMPT: &str = "You are financeU, a financial assistant helping with personal finance, budgeting, and investment advice. Stay focused on financial topics only.";

/// Text completion with no server-side conversation memory
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    options: ClientOptions,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client; without an API key every call fails with a config error
    pub fn new(api_key: Option<&str>, client: Client, options: ClientOptions) -> Self {
        Self {
            base_url: options.completion_base_url.trim_end_matches('/').to_string(),
            model: options.completion_model.clone(),
            api_key: api_key.filter(|key| !key.is_empty()).map(str::to_string),
            client,
            options,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("completion API key is missing"))?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = Fetch::post(&self.client, &self.url(), Service::Completion)
            .query(&[("key".to_string(), api_key.to_string())])
            .timeout(self.options.request_timeout)
            .json(&body)?
            .execute::<GenerateResponse>()
            .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::completion("response contained no candidates"))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::completion(format!(
                "empty completion (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Answers finance questions through a [`CompletionService`]
#[derive(Clone)]
pub struct Assistant {
    completion: Arc<dyn CompletionService>,
}

impl Assistant {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// The full prompt sent for `question`
    pub fn prompt_for(question: &str) -> String {
        format!("{}\n\nUser question: {}", SYSTEM_PROMPT, question)
    }

    pub async fn ask(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::invalid_input("question is empty"));
        }
        self.completion
            .complete(&Self::prompt_for(question))
            .await
            .map_err(|e| {
                log::error!("assistant request failed: {}", e);
                e
            })
    }
}
