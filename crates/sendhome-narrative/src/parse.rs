//! Lenient parsing of model output: code fences and chatter around the JSON are tolerated.

use serde::Deserialize;
use sendhome_core::{CaseDraft, NarrativeError, NarrativeResult};

#[derive(Deserialize)]
struct CaseBatch {
    #[serde(default)]
    cases: Vec<CaseDraft>,
}

/// Drop a surrounding ```json ... ``` fence.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// The outermost `open ... close` span, when the model wrapped JSON in prose.
fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_rules(text: &str) -> NarrativeResult<Vec<String>> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Err(NarrativeError::Empty);
    }
    let rules: Vec<String> = serde_json::from_str(body)
        .or_else(|e| {
            outer_span(body, '[', ']')
                .ok_or(e)
                .and_then(serde_json::from_str)
        })
        .map_err(|e| NarrativeError::Malformed(format!("rules: {}", e)))?;
    let rules: Vec<String> = rules
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if rules.is_empty() {
        return Err(NarrativeError::Empty);
    }
    Ok(rules)
}

/// `{"cases": [...]}`, or a bare array of cases.
pub fn parse_cases(text: &str) -> NarrativeResult<Vec<CaseDraft>> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Err(NarrativeError::Empty);
    }
    let cases = if body.starts_with('[') {
        serde_json::from_str::<Vec<CaseDraft>>(body)
    } else {
        serde_json::from_str::<CaseBatch>(body)
            .or_else(|e| {
                outer_span(body, '{', '}')
                    .ok_or(e)
                    .and_then(serde_json::from_str::<CaseBatch>)
            })
            .map(|batch| batch.cases)
    }
    .map_err(|e| NarrativeError::Malformed(format!("cases: {}", e)))?;
    if cases.is_empty() {
        return Err(NarrativeError::Empty);
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_fences("```json\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_fences("  [1] "), "[1]");
    }

    #[test]
    fn rules_from_fenced_array() {
        let rules = parse_rules("```json\n[\"Only COMPLETE shifts can board\", \" \"]\n```").unwrap();
        assert_eq!(rules, vec!["Only COMPLETE shifts can board"]);
    }

    #[test]
    fn rules_inside_prose() {
        let rules = parse_rules("Here you go: [\"No ore samples\"] Enjoy!").unwrap();
        assert_eq!(rules, vec!["No ore samples"]);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(parse_rules("no rules today"), Err(NarrativeError::Malformed(_))));
        assert!(matches!(parse_rules("[]"), Err(NarrativeError::Empty)));
        assert!(matches!(parse_cases(""), Err(NarrativeError::Empty)));
        assert!(matches!(parse_cases("{\"cases\": 3}"), Err(NarrativeError::Malformed(_))));
    }

    #[test]
    fn case_batch_with_partial_fields() {
        let text = r#"```json
{
  "cases": [
    {
      "npc": {"name": "Ngozi Lindqvist", "role": "Geologist", "personality": "angry"},
      "documents": {
        "employee_badge": {"name": "Ngozi Lindqvist", "picture": "USE_CASE_ID_AS_SEED"},
        "clearance_form": {"shift_status": "COMPLETE", "cargo1": "Ore samples"}
      },
      "opening_line": "Stamp it.",
      "truth": {"employee_id": "EMP-0042", "should_approve": false, "reason": "Contraband"},
      "correct_decision": "deny"
    },
    {"npc": {"name": "Haruto Petrov"}}
  ]
}
```"#;
        let cases = parse_cases(text).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].npc.personality, "angry");
        assert_eq!(cases[0].documents.clearance_form["cargo1"], "Ore samples");
        assert_eq!(cases[0].truth.employee_id, "EMP-0042");
        assert!(cases[1].correct_decision.is_empty());
    }

    #[test]
    fn bare_case_array() {
        let cases = parse_cases("[{\"opening_line\": \"Hi\"}]").unwrap();
        assert_eq!(cases[0].opening_line, "Hi");
    }
}
