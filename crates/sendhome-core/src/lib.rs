//! Send Me Home: core game backend.
//!
//! Session lifecycle for the checkpoint game: case generation with progress
//! streaming, the transactional session store, approve/deny resolution, limited
//! secondary checks and NPC dialogue.

pub mod casebook;
pub mod config;
pub mod decision;
pub mod dialogue;
pub mod error;
pub mod fallback;
pub mod model;
pub mod narrative;
pub mod pipeline;
pub mod quota;
pub mod retry;
pub mod service;
pub mod store;
pub mod voice;

pub use config::{GameConfig, ResolutionPolicy};
pub use decision::{DecisionEngine, Resolution, CORRECT_DELTA, WRONG_DELTA};
pub use dialogue::{DialogueRelay, DialogueSegment};
pub use error::{GameError, GameResult};
pub use model::{Case, CaseTruth, Decision, Document, NpcProfile, Outcome, Ruling, Session};
pub use narrative::{CaseDraft, DialogueContext, NarrativeError, NarrativeGenerator, NarrativeResult};
pub use pipeline::{CaseGenerationPipeline, PipelineEvent, ProgressUpdate, SessionReady};
pub use quota::{QuotaManager, SecondaryCheckResult};
pub use retry::RetryPolicy;
pub use service::{CaseBrief, GameService, SessionStatus};
pub use store::{MemorySessionStore, SessionStore, SledSessionStore, StoreError};
pub use voice::{
    Emotion, SilentSynthesizer, VoiceAssignment, VoiceError, VoiceResult, VoiceSynthesizer,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
