//! `GameService`: the client-facing surface over the pipeline, the decision
//! engine, the quota manager and the dialogue relay.
//!
//! The async calls move store I/O onto the blocking pool themselves. The
//! synchronous ones (`next_case`, `ask`, `secondary_check`, `status`) read or
//! write the store inline, so async callers run them under `spawn_blocking`.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::GameConfig;
use crate::decision::{DecisionEngine, Resolution};
use crate::dialogue::{DialogueRelay, DialogueSegment};
use crate::error::{GameError, GameResult};
use crate::model::{Decision, Document, NpcProfile};
use crate::narrative::NarrativeGenerator;
use crate::pipeline::{self, CaseGenerationPipeline, PipelineEvent, SessionReady};
use crate::quota::{QuotaManager, SecondaryCheckResult};
use crate::store::SessionStore;
use crate::voice::{VoiceAssignment, VoiceSynthesizer};

/// The case at the cursor, without anything the player should not see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseBrief {
    pub session_id: String,
    pub case_id: String,
    pub case_number: usize,
    pub total_cases: usize,
    pub npc: NpcProfile,
    pub documents: Vec<Document>,
    pub opening_line: String,
    #[serde(skip)]
    pub opening_audio: Option<Vec<u8>>,
    pub remaining_secondary_checks: u32,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub game_date: String,
    pub rules: Vec<String>,
    pub cases_completed: usize,
    pub total_cases: usize,
    pub score: i64,
    pub correct_decisions: u32,
    pub incorrect_decisions: u32,
    pub secondary_checks_quota: u32,
    pub remaining_secondary_checks: u32,
    pub completed_cases: Vec<String>,
    pub session_complete: bool,
}

pub struct GameService {
    config: GameConfig,
    store: Arc<dyn SessionStore>,
    pipeline: CaseGenerationPipeline,
    decisions: DecisionEngine,
    quota: QuotaManager,
    dialogue: DialogueRelay,
}

impl GameService {
    pub fn new(
        config: GameConfig,
        store: Arc<dyn SessionStore>,
        narrator: Arc<dyn NarrativeGenerator>,
        synthesizer: Arc<dyn VoiceSynthesizer>,
        voices: Arc<dyn VoiceAssignment>,
    ) -> Self {
        let pipeline = CaseGenerationPipeline::new(
            Arc::clone(&narrator),
            Arc::clone(&synthesizer),
            voices,
            Arc::clone(&store),
        )
        .with_audio_concurrency(config.audio_concurrency)
        .with_secondary_checks_quota(config.secondary_checks_quota);
        let decisions = DecisionEngine::new(
            Arc::clone(&store),
            Arc::clone(&narrator),
            config.resolution_policy,
        );
        let quota = QuotaManager::new(Arc::clone(&store));
        let dialogue = DialogueRelay::new(Arc::clone(&store), narrator, synthesizer);
        Self {
            config,
            store,
            pipeline,
            decisions,
            quota,
            dialogue,
        }
    }

    /// Validated case count for a start request.
    pub fn case_count(&self, requested: i64) -> GameResult<usize> {
        self.config
            .case_count(requested)
            .map_err(GameError::InvalidArgument)
    }

    /// Generate and commit a session dated `game_year_offset` years from today.
    pub async fn start_session(
        &self,
        num_cases: i64,
        events: mpsc::Sender<PipelineEvent>,
    ) -> GameResult<SessionReady> {
        let count = self.case_count(num_cases)?;
        let today = chrono::Local::now().date_naive();
        let game_date = pipeline::game_date(today, self.config.game_year_offset);
        self.pipeline.run(count, &game_date, events).await
    }

    /// Like [`start_session`](Self::start_session) with an explicit game date.
    pub async fn start_session_on(
        &self,
        num_cases: i64,
        game_date: &str,
        events: mpsc::Sender<PipelineEvent>,
    ) -> GameResult<SessionReady> {
        let count = self.case_count(num_cases)?;
        self.pipeline.run(count, game_date, events).await
    }

    pub fn next_case(&self, session_id: &str) -> GameResult<CaseBrief> {
        let session = self.store.get(session_id)?;
        let case = session.current_case().ok_or_else(|| {
            GameError::FailedPrecondition("no more cases in this session".to_string())
        })?;
        Ok(CaseBrief {
            session_id: session.id().to_string(),
            case_id: case.case_id.clone(),
            case_number: session.progress.cursor + 1,
            total_cases: session.progress.total_cases,
            npc: case.npc.clone(),
            documents: case.documents.clone(),
            opening_line: case.opening_line.clone(),
            opening_audio: case.opening_audio.clone(),
            remaining_secondary_checks: session.progress.remaining_secondary_checks,
            score: session.progress.score,
        })
    }

    pub fn ask(
        &self,
        session_id: &str,
        case_id: &str,
        question: &str,
    ) -> GameResult<BoxStream<'static, DialogueSegment>> {
        self.dialogue.ask(session_id, case_id, question)
    }

    pub fn secondary_check(
        &self,
        session_id: &str,
        case_id: &str,
        claimed_id: &str,
    ) -> GameResult<SecondaryCheckResult> {
        self.quota.secondary_check(session_id, case_id, claimed_id)
    }

    pub async fn resolve(
        &self,
        session_id: &str,
        case_id: &str,
        decision: Decision,
    ) -> GameResult<Resolution> {
        self.decisions.resolve(session_id, case_id, decision).await
    }

    pub fn status(&self, session_id: &str) -> GameResult<SessionStatus> {
        let session = self.store.get(session_id)?;
        let p = &session.progress;
        Ok(SessionStatus {
            session_id: session.file.session_id.clone(),
            game_date: session.file.game_date.clone(),
            rules: session.file.rules.clone(),
            cases_completed: p.cursor,
            total_cases: p.total_cases,
            score: p.score,
            correct_decisions: p.correct_decisions,
            incorrect_decisions: p.incorrect_decisions,
            secondary_checks_quota: p.secondary_checks_quota,
            remaining_secondary_checks: p.remaining_secondary_checks,
            completed_cases: p.completed_cases.clone(),
            session_complete: p.is_complete(),
        })
    }
}
