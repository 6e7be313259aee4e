//! Voice Synthesizer backend and NPC voice assignment for Send Me Home.

pub mod elevenlabs;
pub mod pool;
pub mod settings;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use pool::{NameHashVoicePolicy, VoiceGender};
pub use settings::VoiceSettings;
