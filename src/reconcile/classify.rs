use serde_json::{Map, Value};

use crate::models::StageId;

type Fragment = Map<String, Value>;

/// One classification rule: a predicate over a parsed fragment and the
/// stage it identifies.
pub struct StageRule {
    pub stage: StageId,
    pub matches: fn(&Fragment) -> bool,
}

/// Classification rules in precedence order. The first matching rule wins,
/// so a fragment carrying both `summary_english` and `quiz_english` is a
/// Summary.
pub const STAGE_RULES: [StageRule; 6] = [
    StageRule {
        stage: StageId::Summary,
        matches: has_summary,
    },
    StageRule {
        stage: StageId::Quiz,
        matches: has_quiz,
    },
    StageRule {
        stage: StageId::FollowUp,
        matches: has_follow_up,
    },
    StageRule {
        stage: StageId::Multilingual,
        matches: has_translations,
    },
    StageRule {
        stage: StageId::Messenger,
        matches: has_interaction_log,
    },
    StageRule {
        stage: StageId::Packager,
        matches: has_package,
    },
];

/// Stage a parsed fragment belongs to, or `None` if no rule matches.
pub fn classify_fragment(fragment: &Fragment) -> Option<StageId> {
    STAGE_RULES
        .iter()
        .find(|rule| (rule.matches)(fragment))
        .map(|rule| rule.stage)
}

fn has_summary(f: &Fragment) -> bool {
    f.contains_key("summary_english")
}

fn has_quiz(f: &Fragment) -> bool {
    f.contains_key("quiz_english")
}

fn has_follow_up(f: &Fragment) -> bool {
    f.contains_key("follow_up_schedule")
}

fn has_translations(f: &Fragment) -> bool {
    f.contains_key("summary_translated") && f.contains_key("quiz_translated")
}

fn has_interaction_log(f: &Fragment) -> bool {
    f.contains_key("interaction_log")
}

fn has_package(f: &Fragment) -> bool {
    let Some(output) = f.get("output").and_then(Value::as_object) else {
        return false;
    };
    ["pdf_summary_path", "ehr_json"]
        .iter()
        .any(|key| output.get(*key).is_some_and(is_present))
}

/// A packaged artifact counts only when it carries a value.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
