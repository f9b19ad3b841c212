use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exchange of the patient messenger's comprehension check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    pub step: String,
    pub message_content: String,
    pub patient_response: Option<String>,
    pub correct: Option<bool>,
    pub clarification: Option<String>,
    pub confirmed_understanding: Option<bool>,
}

impl Interaction {
    fn marker(&self) -> &'static str {
        match self.correct {
            Some(true) => " ✓",
            Some(false) => " ✗",
            None => "",
        }
    }
}

/// Interaction log of a Messenger output, if it has one of the right shape.
pub fn interactions_from(output: &Value) -> Option<Vec<Interaction>> {
    let log = output.get("interaction_log")?;
    serde_json::from_value(log.clone()).ok()
}

/// Two-party view: system prompts, patient replies with a correctness
/// marker, and corrections. Empty log renders as an empty string.
pub fn render_transcript(log: &[Interaction]) -> String {
    log.iter()
        .map(|interaction| {
            let mut lines = vec![format!("System: {}", interaction.message_content)];
            if let Some(response) = interaction
                .patient_response
                .as_deref()
                .filter(|r| !r.is_empty())
            {
                lines.push(format!("    Patient{}: {response}", interaction.marker()));
            }
            if let Some(clarification) = interaction
                .clarification
                .as_deref()
                .filter(|c| !c.is_empty())
            {
                lines.push(format!("Correction: {clarification}"));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange(response: Option<&str>, correct: Option<bool>) -> Interaction {
        Interaction {
            step: "quiz_1".into(),
            message_content: "How often do you take Azithromycin?".into(),
            patient_response: response.map(String::from),
            correct,
            ..Default::default()
        }
    }

    #[test]
    fn correct_answer_gets_check_mark() {
        let text = render_transcript(&[exchange(Some("Once a day"), Some(true))]);
        assert_eq!(
            text,
            "System: How often do you take Azithromycin?\n    Patient ✓: Once a day"
        );
    }

    #[test]
    fn wrong_answer_shows_cross_and_correction() {
        let mut wrong = exchange(Some("Twice a day"), Some(false));
        wrong.clarification = Some("Take it once daily for 5 days.".into());
        let text = render_transcript(&[wrong]);
        assert!(text.contains("Patient ✗: Twice a day"));
        assert!(text.ends_with("Correction: Take it once daily for 5 days."));
    }

    #[test]
    fn system_only_message_has_no_patient_line() {
        let text = render_transcript(&[exchange(None, None)]);
        assert!(!text.contains("Patient"));
    }

    #[test]
    fn unmarked_answer_has_no_marker() {
        let text = render_transcript(&[exchange(Some("ok"), None)]);
        assert!(text.contains("    Patient: ok"));
    }

    #[test]
    fn exchanges_are_separated_by_blank_line() {
        let text = render_transcript(&[exchange(None, None), exchange(None, None)]);
        assert_eq!(text.matches("\n\n").count(), 1);
        assert_eq!(render_transcript(&[]), "");
    }

    #[test]
    fn reads_interaction_log_with_missing_fields() {
        let output = json!({
            "interaction_log": [
                {"step": "intro", "message_content": "Hello Rita"},
                {"message_content": "Q1", "patient_response": "A", "correct": true}
            ]
        });
        let log = interactions_from(&output).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].correct, Some(true));
        assert!(log[0].patient_response.is_none());
    }

    #[test]
    fn non_list_log_is_rejected() {
        assert!(interactions_from(&json!({"interaction_log": "none"})).is_none());
        assert!(interactions_from(&json!({})).is_none());
    }
}
