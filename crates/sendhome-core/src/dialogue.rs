//! Dialogue Relay: stateless streaming Q&A with the NPC of a case.
//!
//! Every stream is `Text`, then at most one `Audio`, then exactly one `Done`.
//! Nothing here touches the session store beyond reading the case.

use std::sync::Arc;

use futures_util::stream::BoxStream;

use crate::error::{GameError, GameResult};
use crate::fallback;
use crate::narrative::{DialogueContext, NarrativeGenerator};
use crate::store::SessionStore;
use crate::voice::{Emotion, VoiceSynthesizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueSegment {
    Text(String),
    Audio(Vec<u8>),
    Done,
}

pub struct DialogueRelay {
    store: Arc<dyn SessionStore>,
    narrator: Arc<dyn NarrativeGenerator>,
    synthesizer: Arc<dyn VoiceSynthesizer>,
}

impl DialogueRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        narrator: Arc<dyn NarrativeGenerator>,
        synthesizer: Arc<dyn VoiceSynthesizer>,
    ) -> Self {
        Self {
            store,
            narrator,
            synthesizer,
        }
    }

    /// Validate the request up front, then stream the answer. Generator and
    /// synthesizer failures never end the stream early.
    pub fn ask(
        &self,
        session_id: &str,
        case_id: &str,
        question: &str,
    ) -> GameResult<BoxStream<'static, DialogueSegment>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GameError::InvalidArgument("question must not be empty".to_string()));
        }
        let session = self.store.get(session_id)?;
        let (_, case) = session
            .find_case(case_id)
            .ok_or_else(|| GameError::NotFound(format!("case not found: {}", case_id)))?;

        let context = DialogueContext {
            question: question.to_string(),
            npc: case.npc.clone(),
            truth: case.truth.clone(),
        };
        let emotion = Emotion::from_personality(&case.npc.personality);
        let narrator = Arc::clone(&self.narrator);
        let synthesizer = Arc::clone(&self.synthesizer);
        let case_id = case_id.to_string();

        let stream = async_stream::stream! {
            let text = match narrator.generate_dialogue(&context).await {
                Ok(line) if !line.trim().is_empty() => line.trim().to_string(),
                Ok(_) => fallback::deflection(&context.question).to_string(),
                Err(e) => {
                    tracing::warn!(case_id = %case_id, error = %e, "dialogue generation failed; deflecting");
                    fallback::deflection(&context.question).to_string()
                }
            };
            yield DialogueSegment::Text(text.clone());

            match synthesizer.synthesize(&context.npc.voice_id, &text, Some(emotion)).await {
                Ok(audio) if !audio.is_empty() => {
                    yield DialogueSegment::Audio(audio);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(case_id = %case_id, error = %e, "dialogue synthesis failed"),
            }

            yield DialogueSegment::Done;
        };
        Ok(Box::pin(stream))
    }
}
