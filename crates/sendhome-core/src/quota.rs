//! Quota Manager: limited, deterministic secondary checks.
//!
//! The disclosure is a pure function of the case's ground truth and the claimed
//! id, so asking the same question twice always gets the same answer.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{GameError, GameResult};
use crate::model::{Case, DOC_EMPLOYEE_BADGE};
use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryCheckResult {
    pub valid: bool,
    pub message: String,
    pub remaining_checks: u32,
}

pub struct QuotaManager {
    store: Arc<dyn SessionStore>,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Spend one check against `case_id`. Rejected with ResourceExhausted, and
    /// nothing spent, once the quota is gone.
    pub fn secondary_check(
        &self,
        session_id: &str,
        case_id: &str,
        claimed_id: &str,
    ) -> GameResult<SecondaryCheckResult> {
        let session = self.store.get(session_id)?;
        let (_, case) = session
            .find_case(case_id)
            .ok_or_else(|| GameError::NotFound(format!("case not found: {}", case_id)))?;

        let progress = self.store.consume_secondary_check(session_id)?;
        let (valid, message) = disclose(case, claimed_id);
        tracing::info!(
            session_id,
            case_id,
            valid,
            remaining = progress.remaining_secondary_checks,
            "secondary check"
        );

        Ok(SecondaryCheckResult {
            valid,
            message,
            remaining_checks: progress.remaining_secondary_checks,
        })
    }
}

/// Registry answer for `claimed_id` against the case's ground truth.
pub fn disclose(case: &Case, claimed_id: &str) -> (bool, String) {
    let claimed = claimed_id.trim();
    let actual = case.truth.employee_id.trim();
    if claimed.is_empty() || actual.is_empty() || !claimed.eq_ignore_ascii_case(actual) {
        let shown = if claimed.is_empty() { "(blank)" } else { claimed };
        return (false, format!("Registry check: no record found for ID {}.", shown));
    }

    let term_end = Some(case.truth.actual_term_end.trim())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            case.document(DOC_EMPLOYEE_BADGE)
                .and_then(|d| d.field("expire_date"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("unknown");
    let clearance = Some(case.truth.actual_clearance.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("none on file");

    (
        true,
        format!(
            "Registry check: ID {} verified. Contract term ends {}. Clearance level: {}.",
            actual, term_end, clearance
        ),
    )
}
