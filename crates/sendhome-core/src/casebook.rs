//! Turns generator drafts into committed cases.
//!
//! The batch is normalised to exactly the requested count, ids are re-assigned
//! `case-1..case-N`, voices and avatars are attached, and an unusable
//! `correct_decision` is derived from the ground truth.

use crate::fallback;
use crate::model::{Case, Document, NpcProfile, Ruling, DOC_CLEARANCE_FORM, DOC_EMPLOYEE_BADGE};
use crate::narrative::CaseDraft;
use crate::voice::VoiceAssignment;

/// Picture marker the generator is told to emit; replaced with [`avatar_url`].
pub const PORTRAIT_PLACEHOLDER: &str = "USE_CASE_ID_AS_SEED";

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/bottts/svg";

/// Content-addressed avatar for a case.
pub fn avatar_url(case_id: &str) -> String {
    format!(
        "{}?seed={}&backgroundColor=1a3a52&scale=90",
        AVATAR_BASE, case_id
    )
}

pub fn case_id(number: usize) -> String {
    format!("case-{}", number)
}

/// Truncate extras and top up a shortfall with procedural drafts.
pub fn normalize_drafts(mut drafts: Vec<CaseDraft>, count: usize, game_date: &str) -> Vec<CaseDraft> {
    if drafts.len() > count {
        tracing::debug!(received = drafts.len(), count, "truncating case batch");
        drafts.truncate(count);
    }
    let have = drafts.len();
    if have < count {
        tracing::warn!(received = have, count, "topping up case batch with procedural cases");
        drafts.extend((have + 1..=count).map(|n| fallback::procedural_draft(n, game_date)));
    }
    drafts
}

/// Build the `number`-th (1-based) case from a draft.
pub fn assemble_case(number: usize, draft: CaseDraft, voices: &dyn VoiceAssignment) -> Case {
    let id = case_id(number);
    let avatar = avatar_url(&id);
    let CaseDraft {
        npc,
        documents,
        opening_line,
        truth,
        contradictions,
        correct_decision,
    } = draft;

    let mut badge = documents.employee_badge;
    let picture = badge.entry("picture".to_string()).or_default();
    if picture.trim().is_empty() || picture.contains(PORTRAIT_PLACEHOLDER) {
        *picture = avatar.clone();
    }

    let name = [npc.name.trim(), badge.get("name").map(|s| s.trim()).unwrap_or("")]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown Worker")
        .to_string();

    let correct_decision = Ruling::parse(&correct_decision)
        .unwrap_or_else(|| Ruling::from_should_approve(truth.should_approve));

    let opening_line = if opening_line.trim().is_empty() {
        "I need to get on that shuttle.".to_string()
    } else {
        opening_line
    };

    Case {
        npc: NpcProfile {
            voice_id: voices.assign(&name),
            name,
            role: npc.role,
            department: npc.department,
            personality: npc.personality,
            demeanor: npc.demeanor,
            portrait_url: avatar,
        },
        documents: vec![
            Document {
                doc_type: DOC_EMPLOYEE_BADGE.to_string(),
                fields: badge,
            },
            Document {
                doc_type: DOC_CLEARANCE_FORM.to_string(),
                fields: documents.clearance_form,
            },
        ],
        case_id: id,
        opening_line,
        opening_audio: None,
        truth,
        contradictions,
        correct_decision,
    }
}
