//! Voice Synthesizer and voice assignment contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type VoiceResult<T> = Result<T, VoiceError>;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("TTS request failed: {0}")]
    Request(String),

    #[error("TTS API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Emotional delivery for synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Angry,
    Furious,
    Sad,
    Nervous,
}

impl Emotion {
    /// Delivery for an NPC personality tag.
    pub fn from_personality(personality: &str) -> Self {
        let p = personality.trim().to_ascii_lowercase();
        match p.as_str() {
            "angry" | "irritated" | "hostile" => Emotion::Angry,
            "furious" | "enraged" => Emotion::Furious,
            "nervous" | "anxious" | "jittery" => Emotion::Nervous,
            "tired" | "sad" | "exhausted" | "weary" => Emotion::Sad,
            "cheerful" | "happy" | "upbeat" => Emotion::Happy,
            _ => Emotion::Neutral,
        }
    }
}

/// Text-to-speech backend. Returning an empty vec is how an unconfigured
/// backend says "no audio"; that is never an error.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        voice_id: &str,
        text: &str,
        emotion: Option<Emotion>,
    ) -> VoiceResult<Vec<u8>>;
}

/// Pure mapping from an NPC display name to a voice id.
pub trait VoiceAssignment: Send + Sync {
    fn assign(&self, display_name: &str) -> String;
}

/// Synthesizer that never produces audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSynthesizer;

#[async_trait]
impl VoiceSynthesizer for SilentSynthesizer {
    async fn synthesize(
        &self,
        _voice_id: &str,
        _text: &str,
        _emotion: Option<Emotion>,
    ) -> VoiceResult<Vec<u8>> {
        Ok(Vec::new())
    }
}
