use serde_json::{Map, Value};

use super::transcript::{interactions_from, render_transcript};
use crate::core_state::FlowState;
use crate::models::{StageId, StageStatus};

/// Human-readable rendering of one stage's reconciled output.
///
/// Placeholders render their message. Outputs that do not have the shape
/// expected for the stage fall back to pretty JSON.
pub fn render_stage(stage: StageId, output: &Value) -> String {
    if let Some(message) = placeholder_message(output) {
        return message.to_string();
    }

    let rendered = match stage {
        StageId::Summary => render_summary(output),
        StageId::Quiz => output.get("quiz_english").and_then(render_questions),
        StageId::FollowUp => render_schedule(output),
        StageId::Multilingual => render_translations(output),
        StageId::Messenger => interactions_from(output).map(|log| render_transcript(&log)),
        StageId::Packager => render_package(output),
    };

    rendered.unwrap_or_else(|| pretty_json(output))
}

/// One line per stage with a status marker, then the progress count.
pub fn render_progress(flow: &FlowState) -> String {
    let mut lines: Vec<String> = flow
        .steps
        .iter()
        .map(|step| {
            let marker = match step.status {
                StageStatus::Pending => "[ ]",
                StageStatus::Running => "[>]",
                StageStatus::Completed => "[✓]",
                StageStatus::Error => "[✗]",
            };
            match &step.error {
                Some(error) => format!("{marker} {} ({error})", step.id.display_name()),
                None => format!("{marker} {}", step.id.display_name()),
            }
        })
        .collect();
    lines.push(flow.progress_label());
    lines.join("\n")
}

pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `{"message": "..."}` and nothing else.
fn placeholder_message(output: &Value) -> Option<&str> {
    let map = output.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("message")?.as_str()
}

fn render_summary(output: &Value) -> Option<String> {
    output
        .get("summary_english")?
        .as_str()
        .map(|s| s.trim().to_string())
}

/// Numbered list. Items are strings or objects with `question` and
/// optional `options` and `answer`.
fn render_questions(questions: &Value) -> Option<String> {
    let items = questions.as_array()?;
    let mut lines = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        match item {
            Value::String(q) => lines.push(format!("{n}. {q}")),
            Value::Object(obj) => {
                let question = obj.get("question").and_then(Value::as_str)?;
                lines.push(format!("{n}. {question}"));
                if let Some(options) = obj.get("options").and_then(Value::as_array) {
                    for (letter, option) in ('a'..='z').zip(options) {
                        lines.push(format!("   {letter}) {}", scalar_text(option)));
                    }
                }
                if let Some(answer) = obj.get("answer").filter(|a| !a.is_null()) {
                    lines.push(format!("   Answer: {}", scalar_text(answer)));
                }
            }
            _ => return None,
        }
    }

    Some(lines.join("\n"))
}

fn render_schedule(output: &Value) -> Option<String> {
    let schedule = output.get("follow_up_schedule")?;
    let items: Vec<String> = match schedule {
        Value::Array(items) => items.iter().map(schedule_entry).collect(),
        Value::String(s) => vec![s.clone()],
        _ => return None,
    };
    Some(
        items
            .iter()
            .map(|item| format!("• {item}"))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Schedule entries are strings or small objects (`{"type": .., "when": ..}`).
fn schedule_entry(item: &Value) -> String {
    match item {
        Value::Object(obj) => obj
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{}: {}", k.replace('_', " "), scalar_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other),
    }
}

fn render_translations(output: &Value) -> Option<String> {
    let summary = output.get("summary_translated")?.as_str()?;
    let quiz = render_questions(output.get("quiz_translated")?)?;

    let mut parts = Vec::new();
    if let Some(language) = ["language", "preferred_language", "target_language"]
        .iter()
        .find_map(|key| output.get(*key).and_then(Value::as_str))
    {
        parts.push(format!("Language: {language}"));
    }
    parts.push(format!("Summary:\n{}", summary.trim()));
    if !quiz.is_empty() {
        parts.push(format!("Quiz:\n{quiz}"));
    }
    Some(parts.join("\n\n"))
}

/// EHR block plus the PDF path reported by the packager.
fn render_package(output: &Value) -> Option<String> {
    let package = output.get("output")?.as_object()?;
    let mut lines = Vec::new();

    if let Some(ehr) = package.get("ehr_json").and_then(ehr_record) {
        lines.push("EHR Record".to_string());
        lines.push(format!("  Patient ID: {}", field_text(&ehr, &["patient_id"])));
        lines.push(format!("  Diagnosis: {}", field_text(&ehr, &["diagnosis"])));
        lines.push(format!("  Medications: {}", field_text(&ehr, &["medications"])));
        lines.push(format!("  Quiz score: {}", field_text(&ehr, &["quiz_score"])));
        lines.push(format!(
            "  Understanding confirmed: {}",
            field_text(
                &ehr,
                &[
                    "understanding_confirmed",
                    "confirmed_understanding",
                    "patient_understood"
                ]
            )
        ));
    }

    if let Some(path) = package
        .get("pdf_summary_path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
    {
        lines.push(format!("PDF: {path}"));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// `ehr_json` arrives either as an object or as a JSON string.
fn ehr_record(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn field_text(record: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))
        .map(scalar_text)
        .unwrap_or_else(|| "n/a".to_string())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
