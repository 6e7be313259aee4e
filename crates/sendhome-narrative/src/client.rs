//! OpenRouter (OpenAI-compatible chat completions) narrative generator.
//!
//! API key: `narrative.api_key` in config, or `OPENROUTER_API_KEY` in `.env`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sendhome_core::config::NarrativeConfig;
use sendhome_core::narrative::DialogueContext;
use sendhome_core::retry::{is_retryable_status, RetryPolicy};
use sendhome_core::{Case, CaseDraft, NarrativeError, NarrativeGenerator, NarrativeResult, Ruling};

use crate::{parse, prompts};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterNarrator {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenRouterNarrator {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &NarrativeConfig) -> Option<Self> {
        let key = config.api_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        let mut narrator = Self::new(key);
        if !config.api_url.trim().is_empty() {
            narrator.api_url = config.api_url.trim().to_string();
        }
        if !config.model.trim().is_empty() {
            narrator.model = config.model.trim().to_string();
        }
        Some(narrator)
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One user prompt in, the first choice's text out.
    async fn complete(&self, prompt: &str, temperature: f32) -> NarrativeResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };
        let body = &body;
        self.retry
            .run(move || self.send(body), is_transient)
            .await
    }

    async fn send(&self, body: &ChatRequest<'_>) -> NarrativeResult<String> {
        let res = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://sendmehome.local")
            .header("X-Title", "Send Me Home")
            .json(body)
            .send()
            .await
            .map_err(|e| NarrativeError::Request(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(NarrativeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| NarrativeError::Malformed(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(NarrativeError::Empty);
        }
        tracing::debug!(model = %self.model, chars = text.len(), "narrative completion");
        Ok(text)
    }
}

fn is_transient(err: &NarrativeError) -> bool {
    match err {
        NarrativeError::Request(_) => true,
        NarrativeError::Api { status, .. } => is_retryable_status(*status),
        _ => false,
    }
}

#[async_trait]
impl NarrativeGenerator for OpenRouterNarrator {
    async fn generate_rules(&self, game_date: &str) -> NarrativeResult<Vec<String>> {
        let text = self
            .complete(&prompts::rules(game_date), prompts::RULES_TEMPERATURE)
            .await?;
        parse::parse_rules(&text)
    }

    async fn generate_cases(
        &self,
        rules: &[String],
        count: usize,
        game_date: &str,
    ) -> NarrativeResult<Vec<CaseDraft>> {
        let text = self
            .complete(
                &prompts::cases(rules, count, game_date),
                prompts::CASES_TEMPERATURE,
            )
            .await?;
        parse::parse_cases(&text)
    }

    async fn generate_dialogue(&self, context: &DialogueContext) -> NarrativeResult<String> {
        self.complete(&prompts::dialogue(context), prompts::DIALOGUE_TEMPERATURE)
            .await
    }

    async fn generate_verdict(&self, case: &Case, decided: Ruling) -> NarrativeResult<String> {
        self.complete(&prompts::verdict(case, decided), prompts::VERDICT_TEMPERATURE)
            .await
    }
}
