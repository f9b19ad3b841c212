use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patient discharge record as submitted to the orchestration flow.
///
/// The wire shape nests the patient block under `content.metadata`;
/// the remote flow reads it from there. Keys this crate does not model are
/// kept in `extra` and forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeRecord {
    pub id: String,
    pub role: String,
    pub content: DischargeContent,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeContent {
    pub metadata: DischargeMetadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeMetadata {
    pub patient_id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub medications: Vec<String>,
    pub instructions: String,
    pub follow_ups: FollowUpPlan,
    pub preferred_language: String,
    pub phone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpPlan {
    pub doctor_visit: String,
    pub lab_tests: Vec<String>,
}

impl DischargeRecord {
    pub fn metadata(&self) -> &DischargeMetadata {
        &self.content.metadata
    }

    pub fn patient_name(&self) -> &str {
        &self.content.metadata.patient_name
    }

    /// Default record offered by the input editor (and `discharge-agent sample`).
    pub fn sample() -> Self {
        Self {
            id: "msg-001".into(),
            role: "user".into(),
            content: DischargeContent {
                metadata: DischargeMetadata {
                    patient_id: "RM12345".into(),
                    patient_name: "Rita Mehra".into(),
                    diagnosis: "Pneumonia".into(),
                    medications: vec!["Azithromycin 500mg".into(), "Paracetamol 650mg".into()],
                    instructions: "Take rest. Drink fluids. Complete full course of antibiotics."
                        .into(),
                    follow_ups: FollowUpPlan {
                        doctor_visit: "Dr. Roy in 7 days".into(),
                        lab_tests: vec!["Chest X-Ray (repeat)".into(), "CBC".into()],
                    },
                    preferred_language: "Hindi".into(),
                    phone: "+91-9876543210".into(),
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_serializes_with_nested_metadata() {
        let value = serde_json::to_value(DischargeRecord::sample()).unwrap();
        assert_eq!(value["id"], "msg-001");
        assert_eq!(value["content"]["metadata"]["patient_name"], "Rita Mehra");
        assert_eq!(
            value["content"]["metadata"]["follow_ups"]["lab_tests"][1],
            "CBC"
        );
    }

    #[test]
    fn missing_optional_metadata_defaults_to_empty() {
        let json = r#"{
            "id": "msg-9",
            "role": "user",
            "content": { "metadata": { "patient_name": "A", "diagnosis": "B" } }
        }"#;
        let record: DischargeRecord = serde_json::from_str(json).unwrap();
        assert!(record.metadata().medications.is_empty());
        assert_eq!(record.metadata().follow_ups, FollowUpPlan::default());
        assert_eq!(record.patient_name(), "A");
    }

    #[test]
    fn unmodelled_keys_survive_reserialization() {
        let json = r#"{
            "id": "msg-9",
            "role": "user",
            "priority": "high",
            "content": {
                "channel": "ward",
                "metadata": { "patient_name": "A", "diagnosis": "B", "ward": "B2" }
            }
        }"#;
        let record: DischargeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.metadata().extra["ward"], "B2");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["priority"], "high");
        assert_eq!(value["content"]["channel"], "ward");
        assert_eq!(value["content"]["metadata"]["ward"], "B2");
        assert_eq!(value["content"]["metadata"]["patient_name"], "A");
    }

    #[test]
    fn medication_order_is_preserved() {
        let record = DischargeRecord::sample();
        assert_eq!(
            record.metadata().medications,
            vec!["Azithromycin 500mg", "Paracetamol 650mg"]
        );
    }
}
