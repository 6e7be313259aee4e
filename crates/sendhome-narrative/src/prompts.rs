//! Prompt builders for the four generation calls.

use sendhome_core::casebook::PORTRAIT_PLACEHOLDER;
use sendhome_core::narrative::DialogueContext;
use sendhome_core::{Case, Ruling};

pub const RULES_TEMPERATURE: f32 = 1.0;
pub const CASES_TEMPERATURE: f32 = 1.0;
pub const DIALOGUE_TEMPERATURE: f32 = 1.2;
pub const VERDICT_TEMPERATURE: f32 = 0.7;

const DOCUMENTS: &str = "Workers carry TWO documents:
1. EMPLOYEE BADGE: name, picture, job_title, issue_date, expire_date, company_name
2. CLEARANCE FORM: name, shift_status (one of: \"COMPLETE\", \"INCOMPLETE\", \"OVERTIME\"), cargo1, cargo2";

const CARGO: &str = "CARGO CATEGORIES:
- ALLOWED: \"Personal clothing\", \"Family photos\", \"Toiletries\", \"Snacks\", \"Music player\", \"Books\", \"Personal tablet\", \"Personal effects\"
- COMPANY PROPERTY (violation): \"Delta-7 drill bit\", \"Company mining equipment\", \"Work helmet\", \"Safety vest\", \"Company radio\", \"Excavation tools\"
- CONTRABAND (violation): \"Ore samples\", \"Mineral specimens\", \"Asteroid fragments\", \"Unauthorized samples\"";

pub fn rules(game_date: &str) -> String {
    format!(
        "You are writing the daily transit rules for a document inspection game set on an \
asteroid mining station. Workers must satisfy them to board the final departure shuttle.

TODAY'S GAME DATE: {game_date}

{DOCUMENTS}

SHIFT STATUS:
- \"COMPLETE\" = shift finished, may go home
- \"INCOMPLETE\" = shift not finished, should be denied
- \"OVERTIME\" = extra hours worked, may go home if the rules allow

{CARGO}

Write 3-4 rules. Each rule is one short sentence (ideally under 60 characters), specific \
about what is allowed or forbidden, and about badge expiry (checked against {game_date}), \
cargo, or shift status.

Examples: \"Only COMPLETE shifts can board\", \"Expired badges = denied, no exceptions\", \
\"Personal items only - no ore samples\".

Return ONLY a JSON array of strings:
[\"rule 1\", \"rule 2\", \"rule 3\"]"
    )
}

pub fn cases(rules: &[String], count: usize, game_date: &str) -> String {
    let rules_text = rules
        .iter()
        .map(|r| format!("- {}", r))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are generating cases for a document inspection game.

TODAY'S GAME DATE: {game_date}

TODAY'S RULES:
{rules_text}

Generate {count} NPC worker cases.

{DOCUMENTS}
The badge picture MUST be exactly \"{PORTRAIT_PLACEHOLDER}\".

{CARGO}
Never use ambiguous items like \"Tools\"; say whether an item is personal or company property.

NAMES: every worker gets a unique, realistic name. Mix first and last names from \
different cultures. No name may repeat within the batch.

About 60% of cases should be APPROVED (compliant with every rule) and about 40% DENIED \
(violating at least one rule). List contradictions between the two documents, if any.

DATES: issue_date is before {game_date}. expire_date is after {game_date} when valid and \
before it when the badge is expired.

Return ONLY valid JSON with this structure:
{{
  \"cases\": [
    {{
      \"npc\": {{\"name\": \"Carlos Mendez\", \"role\": \"Mining Engineer\", \"department\": \"Excavation\", \"personality\": \"tired\", \"demeanor\": \"cooperative\"}},
      \"documents\": {{
        \"employee_badge\": {{\"name\": \"Carlos Mendez\", \"picture\": \"{PORTRAIT_PLACEHOLDER}\", \"job_title\": \"Mining Engineer\", \"issue_date\": \"YYYY-MM-DD\", \"expire_date\": \"YYYY-MM-DD\", \"company_name\": \"Delta-7 Mining Corp\"}},
        \"clearance_form\": {{\"name\": \"Carlos Mendez\", \"shift_status\": \"COMPLETE\", \"cargo1\": \"Personal effects\", \"cargo2\": \"Books\"}}
      }},
      \"opening_line\": \"Hey, I need to catch the shuttle home. My shift's done.\",
      \"truth\": {{\"employee_id\": \"EMP-1234\", \"actual_term_end\": \"YYYY-MM-DD\", \"actual_clearance\": \"B\", \"has_incidents\": false, \"has_debrief_issues\": false, \"should_approve\": true, \"reason\": \"Shift complete, badge valid, cargo approved\"}},
      \"contradictions\": [],
      \"correct_decision\": \"approve\"
    }}
  ]
}}"
    )
}

pub fn dialogue(context: &DialogueContext) -> String {
    let npc = &context.npc;
    let truth = &context.truth;
    format!(
        "You are roleplaying a worker at an asteroid mining station trying to board the final \
departure shuttle.

YOUR CHARACTER:
- Name: {}
- Role: {}
- Department: {}
- Personality: {}
- Demeanor: {}

WHAT ONLY YOU KNOW:
- Employee ID: {}
- Should be approved: {}
- Reason: {}

THE CLERK ASKED: \"{}\"

Answer in character in 1-2 sentences. If the question gets close to a problem with your \
papers, be evasive or defensive. If it matches your documents, answer confidently. Never \
break character and never mention hidden information directly.",
        npc.name,
        npc.role,
        npc.department,
        npc.personality,
        npc.demeanor,
        truth.employee_id,
        truth.should_approve,
        truth.reason,
        context.question
    )
}

pub fn verdict(case: &Case, decided: Ruling) -> String {
    let contradictions = if case.contradictions.is_empty() {
        "None".to_string()
    } else {
        case.contradictions.join("; ")
    };
    format!(
        "You are a transit supervisor reviewing a clerk's document inspection decision.

CASE:
- Worker: {} ({})
- Correct decision: {}
- Clerk's decision: {}
- Ground truth: {}
- Contradictions: {}

Address the CLERK, not the worker. In 1-2 sentences, say whether the call was right and \
what they spotted or missed (e.g. \"Good catch, clerk! That badge expired last month.\" or \
\"Wrong call! Their shift was INCOMPLETE.\"). Be concise and professional.",
        case.npc.name,
        case.npc.role,
        case.correct_decision,
        decided,
        case.truth.reason,
        contradictions
    )
}
