//! Decision Engine: resolves a case as approve or deny.
//!
//! ```text
//! AwaitingDecision(c) --resolve--> Resolved(c) --> AwaitingDecision(c + 1)
//!                                              \-> Complete  (c + 1 == len)
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::config::ResolutionPolicy;
use crate::error::{GameError, GameResult};
use crate::fallback;
use crate::model::{Decision, Outcome, Ruling};
use crate::narrative::NarrativeGenerator;
use crate::store::{run_blocking, ResolutionRecord, SessionStore};

pub const CORRECT_DELTA: i64 = 10;
pub const WRONG_DELTA: i64 = -15;

/// What the player gets back after ruling on a case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub case_id: String,
    pub decision: Ruling,
    pub correct: bool,
    pub outcome: Outcome,
    pub score_delta: i64,
    pub total_score: i64,
    pub verdict: String,
    pub contradictions: Vec<String>,
    pub cursor: usize,
    pub session_complete: bool,
}

pub struct DecisionEngine {
    store: Arc<dyn SessionStore>,
    narrator: Arc<dyn NarrativeGenerator>,
    policy: ResolutionPolicy,
}

impl DecisionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        narrator: Arc<dyn NarrativeGenerator>,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            store,
            narrator,
            policy,
        }
    }

    /// Score, count and advance in one store transaction, then ask for a verdict.
    /// Under [`ResolutionPolicy::Lenient`] any case in the session may be named and
    /// the cursor still advances by exactly one.
    pub async fn resolve(
        &self,
        session_id: &str,
        case_id: &str,
        decision: Decision,
    ) -> GameResult<Resolution> {
        let id = session_id.to_string();
        let session = run_blocking(&self.store, move |store| store.get(&id)).await?;
        let (index, case) = session
            .find_case(case_id)
            .ok_or_else(|| GameError::NotFound(format!("case not found: {}", case_id)))?;
        let decided = decision.ruling().ok_or_else(|| {
            GameError::InvalidArgument(
                "secondary_check is not a ruling; use the secondary-check call".to_string(),
            )
        })?;

        let correct = decided == case.correct_decision;
        let score_delta = if correct { CORRECT_DELTA } else { WRONG_DELTA };
        let record = ResolutionRecord {
            case_id: case.case_id.clone(),
            case_index: index,
            score_delta,
            correct,
            require_current: self.policy == ResolutionPolicy::Strict,
        };
        let id = session_id.to_string();
        let progress =
            run_blocking(&self.store, move |store| store.record_resolution(&id, &record)).await?;

        let outcome = Outcome::classify(decided, correct);
        tracing::info!(
            session_id,
            case_id,
            ?outcome,
            score = progress.score,
            cursor = progress.cursor,
            "case resolved"
        );

        let verdict = match self.narrator.generate_verdict(case, decided).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback::template_verdict(case, decided),
            Err(e) => {
                tracing::warn!(session_id, case_id, error = %e, "verdict generation failed; using template");
                fallback::template_verdict(case, decided)
            }
        };

        Ok(Resolution {
            case_id: case.case_id.clone(),
            decision: decided,
            correct,
            outcome,
            score_delta,
            total_score: progress.score,
            verdict,
            contradictions: case.contradictions.clone(),
            cursor: progress.cursor,
            session_complete: progress.is_complete(),
        })
    }
}
