//! ElevenLabs text-to-speech.
//!
//! Without an API key every call returns empty audio, which callers treat as
//! "no audio" rather than as a failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sendhome_core::config::VoiceConfig;
use sendhome_core::retry::{is_retryable_status, RetryPolicy};
use sendhome_core::{Emotion, VoiceError, VoiceResult, VoiceSynthesizer};

use crate::settings::VoiceSettings;

pub const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct ElevenLabsSynthesizer {
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            model_id: DEFAULT_MODEL_ID.to_string(),
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        let mut synth = Self::new(config.api_key.clone());
        if !config.api_url.trim().is_empty() {
            synth.base_url = config.api_url.trim().trim_end_matches('/').to_string();
        }
        if !config.model_id.trim().is_empty() {
            synth.model_id = config.model_id.trim().to_string();
        }
        synth
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(
        &self,
        api_key: &str,
        url: &str,
        body: &TextToSpeechRequest<'_>,
    ) -> VoiceResult<Vec<u8>> {
        let res = self
            .client
            .post(url)
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(body)
            .send()
            .await
            .map_err(|e| VoiceError::Request(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let audio = res
            .bytes()
            .await
            .map_err(|e| VoiceError::Request(e.to_string()))?;
        Ok(audio.to_vec())
    }
}

fn is_transient(err: &VoiceError) -> bool {
    match err {
        VoiceError::Request(_) => true,
        VoiceError::Api { status, .. } => is_retryable_status(*status),
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        voice_id: &str,
        text: &str,
        emotion: Option<Emotion>,
    ) -> VoiceResult<Vec<u8>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let emotion = emotion.unwrap_or_default();
        let url = format!("{}/text-to-speech/{}", self.base_url, voice_id);
        let body = TextToSpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings::for_emotion(emotion),
        };
        let (url, body) = (&url, &body);
        let audio = self
            .retry
            .run(move || self.send(api_key, url, body), is_transient)
            .await?;
        tracing::debug!(voice_id, ?emotion, bytes = audio.len(), "synthesized speech");
        Ok(audio)
    }
}
