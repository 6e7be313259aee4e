//! Session and case records.
//!
//! A [`Session`] is the immutable case file (id, game date, rules, cases) plus the
//! mutable [`SessionProgress`]. Cases never change after the pipeline commits; only
//! the progress record is rewritten by the store's mutators.

use serde::{Deserialize, Serialize};

/// Document type tag for the identity badge.
pub const DOC_EMPLOYEE_BADGE: &str = "employee_badge";
/// Document type tag for the clearance form.
pub const DOC_CLEARANCE_FORM: &str = "clearance_form";

/// The ruling a case expects: one of the two terminal decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruling {
    Approve,
    Deny,
}

impl Ruling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ruling::Approve => "approve",
            Ruling::Deny => "deny",
        }
    }

    /// Past-tense verb used in verdict text ("approved" / "denied").
    pub fn past_tense(&self) -> &'static str {
        match self {
            Ruling::Approve => "approved",
            Ruling::Deny => "denied",
        }
    }

    pub fn from_should_approve(should_approve: bool) -> Self {
        if should_approve {
            Ruling::Approve
        } else {
            Ruling::Deny
        }
    }

    /// Lenient parse of generator output ("APPROVE", " deny ").
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("approve") || s.eq_ignore_ascii_case("approved") {
            Some(Ruling::Approve)
        } else if s.eq_ignore_ascii_case("deny") || s.eq_ignore_ascii_case("denied") {
            Some(Ruling::Deny)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision submitted by the player. `SecondaryCheck` is not a ruling and is
/// rejected by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Deny,
    SecondaryCheck,
}

impl Decision {
    pub fn ruling(&self) -> Option<Ruling> {
        match self {
            Decision::Approve => Some(Ruling::Approve),
            Decision::Deny => Some(Ruling::Deny),
            Decision::SecondaryCheck => None,
        }
    }
}

/// How a resolution turned out for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CorrectApprove,
    CorrectDeny,
    WrongApprove,
    WrongDeny,
}

impl Outcome {
    pub fn classify(decided: Ruling, correct: bool) -> Self {
        match (decided, correct) {
            (Ruling::Approve, true) => Outcome::CorrectApprove,
            (Ruling::Deny, true) => Outcome::CorrectDeny,
            (Ruling::Approve, false) => Outcome::WrongApprove,
            (Ruling::Deny, false) => Outcome::WrongDeny,
        }
    }
}

/// NPC personality and appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpcProfile {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub department: String,
    /// "tired", "angry", "nervous", ...
    #[serde(default)]
    pub personality: String,
    /// "evasive", "cooperative", "frustrated", ...
    #[serde(default)]
    pub demeanor: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub portrait_url: String,
}

/// A document on the desk: a type tag and display fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub fields: std::collections::BTreeMap<String, String>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Hidden ground truth for a case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseTruth {
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub actual_term_end: String,
    #[serde(default)]
    pub actual_clearance: String,
    #[serde(default)]
    pub has_incidents: bool,
    #[serde(default)]
    pub has_debrief_issues: bool,
    #[serde(default)]
    pub should_approve: bool,
    #[serde(default)]
    pub reason: String,
}

/// One NPC encounter. Immutable once the session is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub npc: NpcProfile,
    pub documents: Vec<Document>,
    pub opening_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_audio: Option<Vec<u8>>,
    pub truth: CaseTruth,
    #[serde(default)]
    pub contradictions: Vec<String>,
    pub correct_decision: Ruling,
}

impl Case {
    pub fn document(&self, doc_type: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.doc_type == doc_type)
    }
}

/// Mutable progress of a session. The only record the store rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Number of cases resolved so far; index of the current case.
    pub cursor: usize,
    /// Fixed at creation; copied here so mutators can validate without the case file.
    pub total_cases: usize,
    pub score: i64,
    pub correct_decisions: u32,
    pub incorrect_decisions: u32,
    pub secondary_checks_quota: u32,
    pub remaining_secondary_checks: u32,
    #[serde(default)]
    pub completed_cases: Vec<String>,
}

impl SessionProgress {
    pub fn new(total_cases: usize, secondary_checks_quota: u32) -> Self {
        Self {
            cursor: 0,
            total_cases,
            score: 0,
            correct_decisions: 0,
            incorrect_decisions: 0,
            secondary_checks_quota,
            remaining_secondary_checks: secondary_checks_quota,
            completed_cases: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total_cases
    }
}

/// Immutable part of a session, written once at pipeline commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFile {
    pub session_id: String,
    pub game_date: String,
    #[serde(default)]
    pub rules: Vec<String>,
    pub cases: Vec<Case>,
}

/// A full session as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub file: CaseFile,
    pub progress: SessionProgress,
}

impl Session {
    pub fn new(file: CaseFile, secondary_checks_quota: u32) -> Self {
        let progress = SessionProgress::new(file.cases.len(), secondary_checks_quota);
        Self { file, progress }
    }

    pub fn id(&self) -> &str {
        &self.file.session_id
    }

    pub fn cases(&self) -> &[Case] {
        &self.file.cases
    }

    /// Position and case for `case_id`.
    pub fn find_case(&self, case_id: &str) -> Option<(usize, &Case)> {
        self.file
            .cases
            .iter()
            .enumerate()
            .find(|(_, c)| c.case_id == case_id)
    }

    /// The case at the cursor, if the session is not complete.
    pub fn current_case(&self) -> Option<&Case> {
        self.file.cases.get(self.progress.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_taxonomy() {
        assert_eq!(Outcome::classify(Ruling::Approve, true), Outcome::CorrectApprove);
        assert_eq!(Outcome::classify(Ruling::Deny, true), Outcome::CorrectDeny);
        assert_eq!(Outcome::classify(Ruling::Approve, false), Outcome::WrongApprove);
        assert_eq!(Outcome::classify(Ruling::Deny, false), Outcome::WrongDeny);
    }

    #[test]
    fn ruling_parse_is_lenient() {
        assert_eq!(Ruling::parse(" APPROVE "), Some(Ruling::Approve));
        assert_eq!(Ruling::parse("Denied"), Some(Ruling::Deny));
        assert_eq!(Ruling::parse("secondary"), None);
    }

    #[test]
    fn secondary_check_is_not_a_ruling() {
        assert_eq!(Decision::SecondaryCheck.ruling(), None);
        assert_eq!(Decision::Deny.ruling(), Some(Ruling::Deny));
    }

    #[test]
    fn ruling_serializes_lowercase() {
        let json = serde_json::to_string(&Ruling::Deny).unwrap();
        assert_eq!(json, "\"deny\"");
    }
}
