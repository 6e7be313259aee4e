//! Narrative Generator backends for Send Me Home.

pub mod client;
pub mod offline;
pub mod parse;
pub mod prompts;

use std::sync::Arc;

use sendhome_core::config::NarrativeConfig;
use sendhome_core::NarrativeGenerator;

pub use client::OpenRouterNarrator;
pub use offline::OfflineNarrator;

/// OpenRouter when a key is configured, otherwise the offline generator.
pub fn from_config(config: &NarrativeConfig) -> Arc<dyn NarrativeGenerator> {
    match OpenRouterNarrator::from_config(config) {
        Some(narrator) => {
            tracing::info!(model = narrator.model(), "narrative generator: OpenRouter");
            Arc::new(narrator)
        }
        None => {
            tracing::warn!("no narrative API key; using procedural content only");
            Arc::new(OfflineNarrator)
        }
    }
}
