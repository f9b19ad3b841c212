//! Output reconciliation: maps the loosely structured aggregate response
//! back onto the six pipeline stages.
//!
//! ```text
//! response → locate fragments → fragment text → strip fence → parse → classify → slot
//! ```
//!
//! Reconciliation never fails. Missing lists, malformed JSON and unmatched
//! fragments all degrade to placeholders so every stage shows something.

pub mod classify;
pub mod parser;

pub use classify::*;
pub use parser::*;

use serde::Serialize;
use serde_json::Value;

use crate::models::{StageId, STAGE_COUNT};

/// What one stage slot holds after reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    /// The parsed fragment assigned to this stage.
    Matched(Value),
    /// No fragment matched this stage.
    Missing { message: String },
}

impl StageOutput {
    pub fn missing(stage: StageId) -> Self {
        Self::Missing {
            message: format!("No output found for {}", stage.agent_name()),
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn as_matched(&self) -> Option<&Value> {
        match self {
            Self::Matched(value) => Some(value),
            Self::Missing { .. } => None,
        }
    }

    /// The slot as a JSON value, as stored on the stage and exported.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Matched(value) => value.clone(),
            Self::Missing { message } => serde_json::json!({ "message": message }),
        }
    }
}

/// Exactly one slot per stage, in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledOutputSet {
    slots: [StageOutput; STAGE_COUNT],
}

impl ReconciledOutputSet {
    /// All six slots as placeholders.
    pub fn empty() -> Self {
        Self {
            slots: (*StageId::all()).map(StageOutput::missing),
        }
    }

    pub fn get(&self, stage: StageId) -> &StageOutput {
        &self.slots[stage.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageOutput)> {
        StageId::all().iter().copied().zip(self.slots.iter())
    }

    pub fn matched_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_matched()).count()
    }

    /// Slot values as a JSON array in stage order (the export shape).
    pub fn to_json(&self) -> Value {
        Value::Array(self.slots.iter().map(StageOutput::to_value).collect())
    }

    fn assign(&mut self, stage: StageId, fragment: Value) {
        let slot = &mut self.slots[stage.index()];
        if slot.is_matched() {
            tracing::warn!(
                stage = stage.agent_name(),
                "Multiple fragments match one stage; keeping the later one"
            );
        }
        *slot = StageOutput::Matched(fragment);
    }
}

/// Reconcile an aggregate response into six stage slots.
pub fn reconcile(response: &Value) -> ReconciledOutputSet {
    let mut set = ReconciledOutputSet::empty();

    let Some(fragments) = locate_fragments(response) else {
        tracing::warn!("No outputs found in orchestration response");
        return set;
    };

    tracing::debug!(count = fragments.len(), "Reconciling response fragments");

    for (index, fragment) in fragments.iter().enumerate() {
        let text = fragment_text(fragment);
        let parsed = parse_fragment_text(text);

        match classify_fragment(&parsed) {
            Some(stage) => {
                tracing::debug!(index, stage = stage.agent_name(), "Fragment matched");
                set.assign(stage, Value::Object(parsed));
            }
            None => {
                let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
                tracing::debug!(index, ?keys, "Fragment matched no stage, dropping");
            }
        }
    }

    tracing::info!(
        matched = set.matched_count(),
        total = STAGE_COUNT,
        "Reconciliation complete"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(text: &str) -> Value {
        json!({ "results": { "message": { "text": text } } })
    }

    fn nested(fragments: Vec<Value>) -> Value {
        json!({ "session_id": "s", "outputs": [{ "inputs": {}, "outputs": fragments }] })
    }

    #[test]
    fn no_outputs_yields_all_placeholders() {
        let set = reconcile(&json!({"detail": "error"}));
        assert_eq!(set, ReconciledOutputSet::empty());
        assert_eq!(
            set.get(StageId::Summary).to_value(),
            json!({"message": "No output found for SummaryBuilderAgent"})
        );
    }

    #[test]
    fn empty_fragment_list_yields_all_placeholders() {
        let set = reconcile(&nested(vec![]));
        assert_eq!(set.matched_count(), 0);
        for (stage, slot) in set.iter() {
            assert_eq!(slot, &StageOutput::missing(stage));
        }
    }

    #[test]
    fn each_signature_lands_in_exactly_one_slot() {
        let signatures = [
            (r#"{"summary_english": "x"}"#, StageId::Summary),
            (r#"{"quiz_english": ["q"]}"#, StageId::Quiz),
            (r#"{"follow_up_schedule": ["f"]}"#, StageId::FollowUp),
            (
                r#"{"summary_translated": "x", "quiz_translated": []}"#,
                StageId::Multilingual,
            ),
            (r#"{"interaction_log": []}"#, StageId::Messenger),
            (r#"{"output": {"ehr_json": {"a": 1}}}"#, StageId::Packager),
        ];
        for (text, expected) in signatures {
            let set = reconcile(&nested(vec![fragment(text)]));
            assert_eq!(set.matched_count(), 1, "{text}");
            for (stage, slot) in set.iter() {
                assert_eq!(slot.is_matched(), stage == expected, "{text} in {stage}");
            }
        }
    }

    #[test]
    fn unmatched_fragment_is_dropped() {
        let set = reconcile(&nested(vec![fragment(r#"{"note": "hello"}"#)]));
        assert_eq!(set.matched_count(), 0);
    }

    #[test]
    fn unparseable_fragment_is_dropped_but_does_not_fail() {
        let set = reconcile(&nested(vec![
            fragment("not json at all"),
            fragment(r#"{"summary_english": "ok"}"#),
        ]));
        assert_eq!(set.matched_count(), 1);
        assert!(set.get(StageId::Summary).is_matched());
    }

    #[test]
    fn later_fragment_overwrites_earlier_for_same_stage() {
        let set = reconcile(&nested(vec![
            fragment(r#"{"summary_english": "first"}"#),
            fragment(r#"{"summary_english": "second"}"#),
        ]));
        assert_eq!(
            set.get(StageId::Summary).as_matched().unwrap()["summary_english"],
            "second"
        );
    }

    #[test]
    fn flat_outputs_and_alternate_text_path() {
        let response = json!({
            "outputs": [
                { "outputs": { "message": { "message": "```json\n{\"quiz_english\": []}\n```" } } }
            ]
        });
        let set = reconcile(&response);
        assert!(set.get(StageId::Quiz).is_matched());
    }

    #[test]
    fn fragments_without_text_are_ignored() {
        let set = reconcile(&nested(vec![json!({"results": {}}), json!(42)]));
        assert_eq!(set.matched_count(), 0);
    }

    #[test]
    fn export_json_has_six_entries_in_order() {
        let set = reconcile(&nested(vec![fragment(r#"{"interaction_log": []}"#)]));
        let exported = set.to_json();
        let arr = exported.as_array().unwrap();
        assert_eq!(arr.len(), STAGE_COUNT);
        assert_eq!(arr[4], json!({"interaction_log": []}));
        assert_eq!(
            arr[5],
            json!({"message": "No output found for DischargePackagerAgent"})
        );
    }

    #[test]
    fn stage_output_serializes_untagged() {
        let matched = serde_json::to_value(StageOutput::Matched(json!({"a": 1}))).unwrap();
        assert_eq!(matched, json!({"a": 1}));
        let missing = serde_json::to_value(StageOutput::missing(StageId::Quiz)).unwrap();
        assert_eq!(
            missing,
            json!({"message": "No output found for ComprehensionQuizAgent"})
        );
    }
}
