//! Narrative Generator contract.
//!
//! Implementations may fail freely; the core absorbs every error into
//! deterministic fallback content (see [`crate::fallback`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Case, CaseTruth, NpcProfile, Ruling};

pub type NarrativeResult<T> = Result<T, NarrativeError>;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("narrative generator not configured")]
    Unconfigured,

    #[error("narrative request failed: {0}")]
    Request(String),

    #[error("narrative API {status}: {body}")]
    Api { status: u16, body: String },

    #[error("empty narrative response")]
    Empty,

    #[error("malformed narrative response: {0}")]
    Malformed(String),
}

/// A case as the generator describes it, before ids, voices and avatars are assigned.
/// Mirrors the two-document schema: identity badge + clearance form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDraft {
    #[serde(default)]
    pub npc: NpcDraft,
    #[serde(default)]
    pub documents: DraftDocuments,
    #[serde(default)]
    pub opening_line: String,
    #[serde(default)]
    pub truth: CaseTruth,
    #[serde(default)]
    pub contradictions: Vec<String>,
    /// Raw generator value; repaired from `truth.should_approve` when invalid.
    #[serde(default)]
    pub correct_decision: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpcDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub demeanor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftDocuments {
    #[serde(default)]
    pub employee_badge: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub clearance_form: std::collections::BTreeMap<String, String>,
}

/// Everything the dialogue generator may see. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueContext {
    pub question: String,
    pub npc: NpcProfile,
    pub truth: CaseTruth,
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// 3–5 short policy strings for the shift.
    async fn generate_rules(&self, game_date: &str) -> NarrativeResult<Vec<String>>;

    /// `count` cases consistent with `rules`, roughly 60% approve / 40% deny.
    async fn generate_cases(
        &self,
        rules: &[String],
        count: usize,
        game_date: &str,
    ) -> NarrativeResult<Vec<CaseDraft>>;

    /// One in-character line answering the question.
    async fn generate_dialogue(&self, context: &DialogueContext) -> NarrativeResult<String>;

    /// Supervisor feedback addressed to the player about their decision.
    async fn generate_verdict(&self, case: &Case, decided: Ruling) -> NarrativeResult<String>;
}
