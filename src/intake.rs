//! Input collection: builds a validated `DischargeRecord` from either raw
//! JSON text or discrete form fields.
//!
//! Validation failures are returned as `IntakeError` values whose `Display`
//! text is shown inline to the user. Nothing here panics or has side effects.

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DischargeContent, DischargeMetadata, DischargeRecord, FollowUpPlan};

/// Follow-up plan attached to records built from the form.
pub const DEFAULT_DOCTOR_VISIT: &str = "Follow-up with attending physician in 7 days";
pub const DEFAULT_LAB_TESTS: &[&str] = &["CBC"];
pub const DEFAULT_ROLE: &str = "user";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Invalid JSON syntax.")]
    InvalidSyntax,

    #[error("Invalid JSON structure. Missing required fields.")]
    MissingRequiredFields,

    #[error("Missing required patient information.")]
    MissingPatientInfo,

    #[error("Failed to parse JSON input.")]
    Unreadable(String),
}

/// Parse and validate a discharge record typed or pasted as JSON.
pub fn parse_record_json(text: &str) -> Result<DischargeRecord, IntakeError> {
    let value: Value = serde_json::from_str(text).map_err(|_| IntakeError::InvalidSyntax)?;
    check_structure(&value)?;

    serde_json::from_value::<DischargeRecord>(value).map_err(|e| {
        tracing::debug!(error = %e, "Discharge JSON passed structure check but is not readable");
        IntakeError::Unreadable(e.to_string())
    })
}

/// Re-check the submission invariant on an already typed record.
pub fn validate(record: &DischargeRecord) -> Result<(), IntakeError> {
    if record.id.trim().is_empty() || record.role.trim().is_empty() {
        return Err(IntakeError::MissingRequiredFields);
    }
    let meta = record.metadata();
    if meta.patient_name.trim().is_empty() || meta.diagnosis.trim().is_empty() {
        return Err(IntakeError::MissingPatientInfo);
    }
    Ok(())
}

fn check_structure(value: &Value) -> Result<(), IntakeError> {
    let metadata = value.get("content").and_then(|c| c.get("metadata"));

    let has_envelope = value.get("id").is_some_and(is_truthy)
        && value.get("role").is_some_and(is_truthy)
        && metadata.is_some_and(is_truthy);
    if !has_envelope {
        return Err(IntakeError::MissingRequiredFields);
    }

    let has_patient = metadata
        .and_then(|m| m.get("patient_name"))
        .is_some_and(is_truthy)
        && metadata.and_then(|m| m.get("diagnosis")).is_some_and(is_truthy);
    if !has_patient {
        return Err(IntakeError::MissingPatientInfo);
    }

    Ok(())
}

/// Present and not null, false, zero or an empty string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Discrete form fields as entered in the structured editor.
#[derive(Debug, Clone, Default)]
pub struct DischargeForm {
    pub name: String,
    pub diagnosis: String,
    pub language: String,
    pub phone: String,
    /// Comma-separated, e.g. "Azithromycin 500mg, Paracetamol 650mg".
    pub medications: String,
    pub instructions: String,
}

impl DischargeForm {
    /// Build a record with a fresh identifier and the default follow-up plan.
    pub fn into_record(self) -> Result<DischargeRecord, IntakeError> {
        let name = self.name.trim().to_string();
        let diagnosis = self.diagnosis.trim().to_string();
        if name.is_empty() || diagnosis.is_empty() {
            return Err(IntakeError::MissingPatientInfo);
        }

        let record = DischargeRecord {
            id: format!("msg-{}", Uuid::new_v4()),
            role: DEFAULT_ROLE.to_string(),
            content: DischargeContent {
                metadata: DischargeMetadata {
                    patient_id: new_patient_id(),
                    patient_name: name,
                    diagnosis,
                    medications: split_medications(&self.medications),
                    instructions: self.instructions.trim().to_string(),
                    follow_ups: FollowUpPlan {
                        doctor_visit: DEFAULT_DOCTOR_VISIT.to_string(),
                        lab_tests: DEFAULT_LAB_TESTS.iter().map(|t| t.to_string()).collect(),
                    },
                    preferred_language: self.language.trim().to_string(),
                    phone: self.phone.trim().to_string(),
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
            extra: Map::new(),
        };

        tracing::debug!(record_id = %record.id, "Discharge record built from form fields");
        Ok(record)
    }
}

fn split_medications(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

fn new_patient_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("PT-{}", simple[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        serde_json::to_string_pretty(&DischargeRecord::sample()).unwrap()
    }

    #[test]
    fn sample_record_parses() {
        let record = parse_record_json(&sample_json()).unwrap();
        assert_eq!(record, DischargeRecord::sample());
    }

    #[test]
    fn extra_metadata_is_forwarded_as_typed() {
        let text = r#"{"id":"m","role":"user","content":{"metadata":{
            "patient_name":"Rita","diagnosis":"Flu","allergies":["penicillin"]}}}"#;
        let record = parse_record_json(text).unwrap();

        let forwarded: Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(
            forwarded["content"]["metadata"]["allergies"],
            serde_json::json!(["penicillin"])
        );
    }

    #[test]
    fn invalid_syntax_is_reported() {
        let err = parse_record_json("{ not json").unwrap_err();
        assert_eq!(err, IntakeError::InvalidSyntax);
        assert_eq!(err.to_string(), "Invalid JSON syntax.");
    }

    #[test]
    fn missing_envelope_fields_are_reported() {
        let err = parse_record_json(r#"{"role":"user","content":{"metadata":{}}}"#).unwrap_err();
        assert_eq!(err, IntakeError::MissingRequiredFields);

        let err = parse_record_json(r#"{"id":"","role":"user","content":{"metadata":{}}}"#)
            .unwrap_err();
        assert_eq!(err, IntakeError::MissingRequiredFields);

        let err = parse_record_json(r#"{"id":"m","role":"user","content":{}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JSON structure. Missing required fields."
        );
    }

    #[test]
    fn missing_patient_name_or_diagnosis_is_reported() {
        let no_name = r#"{"id":"m","role":"user","content":{"metadata":{"diagnosis":"Flu"}}}"#;
        assert_eq!(
            parse_record_json(no_name).unwrap_err(),
            IntakeError::MissingPatientInfo
        );

        let empty_dx = r#"{"id":"m","role":"user",
            "content":{"metadata":{"patient_name":"Rita","diagnosis":""}}}"#;
        let err = parse_record_json(empty_dx).unwrap_err();
        assert_eq!(err.to_string(), "Missing required patient information.");
    }

    #[test]
    fn wrong_field_shape_is_unreadable() {
        let bad_meds = r#"{"id":"m","role":"user",
            "content":{"metadata":{"patient_name":"Rita","diagnosis":"Flu","medications":"x"}}}"#;
        let err = parse_record_json(bad_meds).unwrap_err();
        assert!(matches!(err, IntakeError::Unreadable(_)));
        assert_eq!(err.to_string(), "Failed to parse JSON input.");
    }

    #[test]
    fn validate_rejects_blank_patient_name() {
        let mut record = DischargeRecord::sample();
        record.content.metadata.patient_name = "   ".into();
        assert_eq!(validate(&record), Err(IntakeError::MissingPatientInfo));
        assert_eq!(validate(&DischargeRecord::sample()), Ok(()));
    }

    #[test]
    fn form_builds_record_with_defaults() {
        let form = DischargeForm {
            name: " Rita Mehra ".into(),
            diagnosis: "Pneumonia".into(),
            language: "Hindi".into(),
            phone: "+91-9876543210".into(),
            medications: "Azithromycin 500mg, , Paracetamol 650mg ,".into(),
            instructions: "Rest.".into(),
        };
        let record = form.into_record().unwrap();
        let meta = record.metadata();

        assert!(record.id.starts_with("msg-"));
        assert_eq!(record.role, "user");
        assert_eq!(meta.patient_name, "Rita Mehra");
        assert_eq!(meta.medications, vec!["Azithromycin 500mg", "Paracetamol 650mg"]);
        assert_eq!(meta.follow_ups.doctor_visit, DEFAULT_DOCTOR_VISIT);
        assert_eq!(meta.follow_ups.lab_tests, vec!["CBC"]);
        assert!(meta.patient_id.starts_with("PT-"));
        assert_eq!(meta.patient_id.len(), 11);
        assert_eq!(validate(&record), Ok(()));
    }

    #[test]
    fn form_ids_are_unique() {
        let form = DischargeForm {
            name: "A".into(),
            diagnosis: "B".into(),
            ..Default::default()
        };
        let a = form.clone().into_record().unwrap();
        let b = form.into_record().unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn form_requires_name_and_diagnosis() {
        let form = DischargeForm {
            name: "Rita".into(),
            ..Default::default()
        };
        assert_eq!(form.into_record().unwrap_err(), IntakeError::MissingPatientInfo);
    }
}
