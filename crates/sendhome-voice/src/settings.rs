//! ElevenLabs voice settings per emotion.
//!
//! - stability: lower is more expressive, higher more monotone
//! - similarity_boost: adherence to the original voice
//! - style: exaggeration of the delivery (v2 models only)

use serde::Serialize;
use sendhome_core::Emotion;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl VoiceSettings {
    pub fn for_emotion(emotion: Emotion) -> Self {
        let (stability, similarity_boost, style) = match emotion {
            Emotion::Neutral => (0.50, 0.75, 0.0),
            Emotion::Happy => (0.35, 0.75, 0.5),
            Emotion::Angry => (0.25, 0.65, 0.75),
            Emotion::Furious => (0.15, 0.60, 0.9),
            Emotion::Sad => (0.50, 0.70, 0.4),
            Emotion::Nervous => (0.30, 0.75, 0.5),
        };
        Self {
            stability,
            similarity_boost,
            style,
            use_speaker_boost: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn furious_is_least_stable() {
        let furious = VoiceSettings::for_emotion(Emotion::Furious);
        for e in [Emotion::Neutral, Emotion::Happy, Emotion::Angry, Emotion::Sad, Emotion::Nervous] {
            assert!(VoiceSettings::for_emotion(e).stability > furious.stability);
        }
        assert_eq!(VoiceSettings::for_emotion(Emotion::Neutral).style, 0.0);
    }
}
