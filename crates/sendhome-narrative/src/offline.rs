//! Generator used when no API key is configured. Every call reports
//! `Unconfigured`, which the core answers with its procedural content.

use async_trait::async_trait;
use sendhome_core::narrative::DialogueContext;
use sendhome_core::{Case, CaseDraft, NarrativeError, NarrativeGenerator, NarrativeResult, Ruling};

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineNarrator;

#[async_trait]
impl NarrativeGenerator for OfflineNarrator {
    async fn generate_rules(&self, _game_date: &str) -> NarrativeResult<Vec<String>> {
        Err(NarrativeError::Unconfigured)
    }

    async fn generate_cases(
        &self,
        _rules: &[String],
        _count: usize,
        _game_date: &str,
    ) -> NarrativeResult<Vec<CaseDraft>> {
        Err(NarrativeError::Unconfigured)
    }

    async fn generate_dialogue(&self, _context: &DialogueContext) -> NarrativeResult<String> {
        Err(NarrativeError::Unconfigured)
    }

    async fn generate_verdict(&self, _case: &Case, _decided: Ruling) -> NarrativeResult<String> {
        Err(NarrativeError::Unconfigured)
    }
}
