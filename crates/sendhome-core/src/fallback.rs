//! Deterministic stand-ins for generator output.
//!
//! Used whenever the Narrative Generator is unreachable, unconfigured, or returns
//! something unusable. Same inputs always give the same content.

use chrono::{Months, NaiveDate};

use crate::casebook::PORTRAIT_PLACEHOLDER;
use crate::model::{Case, CaseTruth, Ruling};
use crate::narrative::{CaseDraft, DraftDocuments, NpcDraft};

const SHIFT_RULES: [&str; 4] = [
    "Only COMPLETE shifts can board",
    "INCOMPLETE shifts stay on station",
    "OVERTIME workers need manager approval",
    "All shifts must be COMPLETE to depart",
];

const CARGO_RULES: [&str; 5] = [
    "No company equipment leaves the station",
    "Personal items only - no ore samples",
    "No company tools allowed on shuttle",
    "Contraband items = instant denial",
    "Only personal belongings permitted",
];

const BADGE_RULES: [&str; 4] = [
    "Expired badges get denied",
    "Badge must be valid on departure date",
    "No exceptions for expired credentials",
    "Current badges only - check dates",
];

const FIRST_NAMES: [&str; 12] = [
    "Tomasz", "Ngozi", "Haruto", "Ines", "Kwame", "Mirela", "Santiago", "Aigerim", "Dmitri",
    "Lucia", "Farid", "Oona",
];

const LAST_NAMES: [&str; 12] = [
    "Okonkwo", "Lindqvist", "Ferreira", "Nakamura", "Petrov", "Abubakar", "Moreau", "Castillo",
    "Kowalski", "Haddad", "Sato", "Mwangi",
];

const DEFLECTIONS: [&str; 4] = [
    "I... uh... what was the question again?",
    "I'd rather not talk about that.",
    "Look, it's all in the paperwork. Can we move this along?",
    "Sorry, long shift. Everything's on the forms.",
];

const COMPANY_NAME: &str = "Delta-7 Mining Corp";

struct Template {
    job_title: &'static str,
    shift_status: &'static str,
    cargo: [&'static str; 2],
    approve: bool,
    expired_badge: bool,
    mismatched_form: bool,
    personality: &'static str,
    demeanor: &'static str,
    opening_line: &'static str,
    reason: &'static str,
}

/// Six approvals and four denials per ten cases.
const TEMPLATES: [Template; 10] = [
    Template {
        job_title: "Drill Operator",
        shift_status: "COMPLETE",
        cargo: ["Personal clothing", "Snacks"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "tired",
        demeanor: "cooperative",
        opening_line: "Hey, I need to catch the shuttle home. My shift's done.",
        reason: "Shift complete, badge valid, cargo approved",
    },
    Template {
        job_title: "Ore Processor",
        shift_status: "COMPLETE",
        cargo: ["Personal tablet", "Books"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "cheerful",
        demeanor: "cooperative",
        opening_line: "Evening! Last shuttle, right? I've got everything ready.",
        reason: "Shift complete, badge valid, cargo approved",
    },
    Template {
        job_title: "Systems Tech",
        shift_status: "COMPLETE",
        cargo: ["Delta-7 drill bit", "Personal effects"],
        approve: false,
        expired_badge: false,
        mismatched_form: false,
        personality: "nervous",
        demeanor: "evasive",
        opening_line: "Just a few souvenirs, nothing important. Can I go?",
        reason: "Company equipment not allowed off-station",
    },
    Template {
        job_title: "Maintenance Tech",
        shift_status: "OVERTIME",
        cargo: ["Family photos", "Personal clothing"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "tired",
        demeanor: "cooperative",
        opening_line: "Pulled a double. I just want to see my kids.",
        reason: "Overtime shift complete, cargo approved",
    },
    Template {
        job_title: "Geologist",
        shift_status: "COMPLETE",
        cargo: ["Ore samples", "Personal clothing"],
        approve: false,
        expired_badge: false,
        mismatched_form: false,
        personality: "angry",
        demeanor: "frustrated",
        opening_line: "Those samples are for my research. Stamp it already.",
        reason: "Ore samples are contraband",
    },
    Template {
        job_title: "Cargo Loader",
        shift_status: "COMPLETE",
        cargo: ["Toiletries", "Music player"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "calm",
        demeanor: "cooperative",
        opening_line: "Evening, clerk. Should all be in order.",
        reason: "Shift complete, badge valid, cargo approved",
    },
    Template {
        job_title: "Safety Officer",
        shift_status: "INCOMPLETE",
        cargo: ["Music player", "Toiletries"],
        approve: false,
        expired_badge: false,
        mismatched_form: false,
        personality: "nervous",
        demeanor: "evasive",
        opening_line: "My supervisor said it's fine if I leave a bit early.",
        reason: "Shift incomplete - cannot board",
    },
    Template {
        job_title: "Shuttle Mechanic",
        shift_status: "COMPLETE",
        cargo: ["Books", "Snacks"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "tired",
        demeanor: "cooperative",
        opening_line: "Fixed your shuttle this morning, actually. Mind if I ride it?",
        reason: "Shift complete, badge valid, cargo approved",
    },
    Template {
        job_title: "Radio Operator",
        shift_status: "COMPLETE",
        cargo: ["Personal clothing", "Family photos"],
        approve: true,
        expired_badge: false,
        mismatched_form: false,
        personality: "cheerful",
        demeanor: "cooperative",
        opening_line: "Heading home at last. Twelve months is a long rotation.",
        reason: "Shift complete, badge valid, cargo approved",
    },
    Template {
        job_title: "Excavation Lead",
        shift_status: "COMPLETE",
        cargo: ["Personal effects", "Snacks"],
        approve: false,
        expired_badge: true,
        mismatched_form: true,
        personality: "angry",
        demeanor: "frustrated",
        opening_line: "Badge office was closed all week. That's not my problem.",
        reason: "Badge expired before departure date",
    },
];

/// Shift rules derived from the game date. Always three or four entries.
pub fn procedural_rules(game_date: &str) -> Vec<String> {
    let seed = date_seed(game_date);
    let mut rules = vec![SHIFT_RULES[seed % SHIFT_RULES.len()].to_string()];
    if seed % 2 == 0 {
        let second = SHIFT_RULES[(seed / 2 + 1) % SHIFT_RULES.len()];
        if second != rules[0] {
            rules.push(second.to_string());
        }
    }
    rules.push(CARGO_RULES[seed % CARGO_RULES.len()].to_string());
    rules.push(BADGE_RULES[seed % BADGE_RULES.len()].to_string());
    rules
}

/// Exactly `count` case drafts with the 60/40 approve/deny skew.
pub fn procedural_drafts(count: usize, game_date: &str) -> Vec<CaseDraft> {
    (1..=count).map(|n| procedural_draft(n, game_date)).collect()
}

/// The `number`-th (1-based) procedural case.
pub fn procedural_draft(number: usize, game_date: &str) -> CaseDraft {
    let idx = number.saturating_sub(1);
    let t = &TEMPLATES[idx % TEMPLATES.len()];
    let name = format!(
        "{} {}",
        FIRST_NAMES[idx % FIRST_NAMES.len()],
        LAST_NAMES[(idx * 5 + 3 + idx / LAST_NAMES.len()) % LAST_NAMES.len()]
    );

    let date = parse_game_date(game_date);
    let issue = date.checked_sub_months(Months::new(6)).unwrap_or(date);
    let expire = if t.expired_badge {
        date.checked_sub_months(Months::new(1)).unwrap_or(date)
    } else {
        date.checked_add_months(Months::new(6)).unwrap_or(date)
    };

    let form_name = if t.mismatched_form {
        format!("{} {}", FIRST_NAMES[(idx + 1) % FIRST_NAMES.len()], LAST_NAMES[idx % LAST_NAMES.len()])
    } else {
        name.clone()
    };

    let badge = [
        ("name", name.clone()),
        ("picture", PORTRAIT_PLACEHOLDER.to_string()),
        ("job_title", t.job_title.to_string()),
        ("issue_date", issue.format("%Y-%m-%d").to_string()),
        ("expire_date", expire.format("%Y-%m-%d").to_string()),
        ("company_name", COMPANY_NAME.to_string()),
    ];
    let form = [
        ("name", form_name),
        ("shift_status", t.shift_status.to_string()),
        ("cargo1", t.cargo[0].to_string()),
        ("cargo2", t.cargo[1].to_string()),
    ];

    let mut contradictions = Vec::new();
    if t.mismatched_form {
        contradictions.push("Clearance form name does not match the badge".to_string());
    }
    if t.expired_badge {
        contradictions.push("Badge expired before today's departure".to_string());
    }

    CaseDraft {
        npc: NpcDraft {
            name,
            role: t.job_title.to_string(),
            department: "Mining Operations".to_string(),
            personality: t.personality.to_string(),
            demeanor: t.demeanor.to_string(),
        },
        documents: DraftDocuments {
            employee_badge: badge.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            clearance_form: form.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        },
        opening_line: t.opening_line.to_string(),
        truth: CaseTruth {
            employee_id: format!("EMP-{:04}", number),
            actual_term_end: date.format("%Y-%m-%d").to_string(),
            actual_clearance: "A".to_string(),
            has_incidents: false,
            has_debrief_issues: false,
            should_approve: t.approve,
            reason: t.reason.to_string(),
        },
        contradictions,
        correct_decision: Ruling::from_should_approve(t.approve).as_str().to_string(),
    }
}

/// Verdict text built from the case's stored reason.
pub fn template_verdict(case: &Case, decided: Ruling) -> String {
    let reason = case.truth.reason.trim();
    let head = if decided == case.correct_decision {
        "Correct!".to_string()
    } else {
        format!(
            "Incorrect. This worker should have been {}.",
            case.correct_decision.past_tense()
        )
    };
    if reason.is_empty() {
        head
    } else {
        format!("{} {}", head, reason)
    }
}

/// Stock in-character deflection for when dialogue generation fails.
pub fn deflection(question: &str) -> &'static str {
    DEFLECTIONS[question.trim().chars().count() % DEFLECTIONS.len()]
}

/// `YYYY-MM-DD`, or the epoch date when unparsable (keeps fallbacks total).
pub fn parse_game_date(game_date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(game_date.trim(), "%Y-%m-%d").unwrap_or_default()
}

fn date_seed(game_date: &str) -> usize {
    game_date
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
}
