//! Case Generation Pipeline.
//!
//! Rules, then one case batch, then per-case opening-line audio fanned out over a
//! bounded worker pool, then a single commit to the session store. Progress goes
//! out on one ordered channel with strictly increasing `current`, followed by
//! exactly one [`PipelineEvent::Ready`]. Nothing is visible in the store until the
//! commit, and the commit is skipped when the receiver has gone away.

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::casebook;
use crate::error::{GameError, GameResult};
use crate::fallback;
use crate::model::{Case, CaseFile, Session};
use crate::narrative::NarrativeGenerator;
use crate::store::{run_blocking, SessionStore};
use crate::voice::{Emotion, VoiceAssignment, VoiceSynthesizer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Summary of a committed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReady {
    pub session_id: String,
    pub game_date: String,
    pub rules: Vec<String>,
    pub total_cases: usize,
    pub secondary_checks_quota: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Progress(ProgressUpdate),
    Ready(SessionReady),
}

/// `today` shifted forward by `offset_years`, as `YYYY-MM-DD`.
pub fn game_date(today: NaiveDate, offset_years: u32) -> String {
    today
        .checked_add_months(Months::new(offset_years.saturating_mul(12)))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

pub struct CaseGenerationPipeline {
    narrator: Arc<dyn NarrativeGenerator>,
    synthesizer: Arc<dyn VoiceSynthesizer>,
    voices: Arc<dyn VoiceAssignment>,
    store: Arc<dyn SessionStore>,
    audio_concurrency: usize,
    secondary_checks_quota: u32,
}

/// Ordered progress sender. Remembers whether the receiver went away.
struct Progress {
    tx: mpsc::Sender<PipelineEvent>,
    total: usize,
    current: usize,
    closed: bool,
}

impl Progress {
    async fn step(&mut self, message: impl Into<String>) {
        let update = ProgressUpdate {
            current: self.current,
            total: self.total,
            message: message.into(),
        };
        self.current += 1;
        if self.closed {
            return;
        }
        if self.tx.send(PipelineEvent::Progress(update)).await.is_err() {
            tracing::info!("progress receiver dropped; pipeline will not commit");
            self.closed = true;
        }
    }
}

impl CaseGenerationPipeline {
    pub fn new(
        narrator: Arc<dyn NarrativeGenerator>,
        synthesizer: Arc<dyn VoiceSynthesizer>,
        voices: Arc<dyn VoiceAssignment>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            narrator,
            synthesizer,
            voices,
            store,
            audio_concurrency: 6,
            secondary_checks_quota: 3,
        }
    }

    pub fn with_audio_concurrency(mut self, workers: usize) -> Self {
        self.audio_concurrency = workers.max(1);
        self
    }

    pub fn with_secondary_checks_quota(mut self, quota: u32) -> Self {
        self.secondary_checks_quota = quota;
        self
    }

    /// Build and commit a session of exactly `count` cases.
    ///
    /// Progress `current` runs `0..=count + 2` with `total = count + 2`: rules,
    /// cases, one step per recorded opening line, then the commit. Only the commit
    /// can fail the run.
    pub async fn run(
        &self,
        count: usize,
        game_date: &str,
        events: mpsc::Sender<PipelineEvent>,
    ) -> GameResult<SessionReady> {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(session_id = %session_id, count, game_date, "generating session");

        let mut progress = Progress {
            tx: events,
            total: count + 2,
            current: 0,
            closed: false,
        };

        let rules = self.rules(game_date).await;
        progress
            .step(format!("Shift briefing ready ({} rules)", rules.len()))
            .await;

        let mut cases = self.cases(&rules, count, game_date).await;
        progress
            .step(format!("{} workers queued at the checkpoint", cases.len()))
            .await;

        self.record_opening_lines(&mut cases, &mut progress).await;

        if progress.closed {
            tracing::info!(session_id = %session_id, "client gone before commit; discarding session");
            return Err(GameError::Cancelled(
                "client disconnected before the session was saved".to_string(),
            ));
        }

        let file = CaseFile {
            session_id: session_id.clone(),
            game_date: game_date.to_string(),
            rules,
            cases,
        };
        let session = Arc::new(Session::new(file, self.secondary_checks_quota));
        let pending = Arc::clone(&session);
        run_blocking(&self.store, move |store| store.create(&pending))
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "session commit failed");
                GameError::Internal(format!("failed to save session: {}", e))
            })?;
        progress.step("Checkpoint open").await;

        let ready = SessionReady {
            session_id,
            game_date: session.file.game_date.clone(),
            rules: session.file.rules.clone(),
            total_cases: session.progress.total_cases,
            secondary_checks_quota: session.progress.secondary_checks_quota,
        };
        if !progress.closed {
            let _ = progress.tx.send(PipelineEvent::Ready(ready.clone())).await;
        }
        tracing::info!(session_id = %ready.session_id, total_cases = ready.total_cases, "session ready");
        Ok(ready)
    }

    async fn rules(&self, game_date: &str) -> Vec<String> {
        match self.narrator.generate_rules(game_date).await {
            Ok(rules) => {
                let rules: Vec<String> = rules
                    .into_iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect();
                if rules.is_empty() {
                    tracing::warn!("narrator returned no rules; using procedural rules");
                    fallback::procedural_rules(game_date)
                } else {
                    rules
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "rule generation failed; using procedural rules");
                fallback::procedural_rules(game_date)
            }
        }
    }

    async fn cases(&self, rules: &[String], count: usize, game_date: &str) -> Vec<Case> {
        let drafts = match self.narrator.generate_cases(rules, count, game_date).await {
            Ok(drafts) => casebook::normalize_drafts(drafts, count, game_date),
            Err(e) => {
                tracing::warn!(error = %e, count, "case generation failed; using procedural cases");
                fallback::procedural_drafts(count, game_date)
            }
        };
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| casebook::assemble_case(i + 1, draft, self.voices.as_ref()))
            .collect()
    }

    /// Synthesize every opening line with at most `audio_concurrency` requests in
    /// flight. A failed case keeps no audio; the others are unaffected. Jobs that
    /// have not started yet are skipped once the receiver is gone.
    async fn record_opening_lines(&self, cases: &mut [Case], progress: &mut Progress) {
        let total = cases.len();
        let jobs: Vec<_> = cases
            .iter()
            .enumerate()
            .map(|(i, case)| {
                (
                    i,
                    case.npc.voice_id.clone(),
                    case.opening_line.clone(),
                    Emotion::from_personality(&case.npc.personality),
                )
            })
            .collect();

        let receiver_watch = progress.tx.clone();
        let mut recorded = stream::iter(jobs)
            .map(|(i, voice_id, line, emotion)| {
                let synthesizer = Arc::clone(&self.synthesizer);
                let tx = receiver_watch.clone();
                async move {
                    if tx.is_closed() {
                        return (i, None);
                    }
                    match synthesizer.synthesize(&voice_id, &line, Some(emotion)).await {
                        Ok(audio) if !audio.is_empty() => (i, Some(audio)),
                        Ok(_) => (i, None),
                        Err(e) => {
                            tracing::warn!(case = i + 1, error = %e, "opening line synthesis failed");
                            (i, None)
                        }
                    }
                }
            })
            .buffer_unordered(self.audio_concurrency);

        let mut done = 0;
        while let Some((i, audio)) = recorded.next().await {
            done += 1;
            if let Some(case) = cases.get_mut(i) {
                case.opening_audio = audio;
            }
            progress
                .step(format!("Recorded worker {} of {}", done, total))
                .await;
            if progress.closed {
                // Dropping the stream cancels the calls still in flight.
                tracing::info!(recorded = done, total, "client gone; stopping voice synthesis");
                break;
            }
        }
    }
}
