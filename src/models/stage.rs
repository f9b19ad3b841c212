use serde::{Deserialize, Serialize};

use super::enums::{InvalidEnum, StageStatus};

/// The six fixed agents of the discharge pipeline, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Summary,
    Quiz,
    FollowUp,
    Multilingual,
    Messenger,
    Packager,
}

pub const STAGE_COUNT: usize = 6;

impl StageId {
    pub fn all() -> &'static [StageId; STAGE_COUNT] {
        &[
            Self::Summary,
            Self::Quiz,
            Self::FollowUp,
            Self::Multilingual,
            Self::Messenger,
            Self::Packager,
        ]
    }

    /// Stable identifier used in exports and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Quiz => "quiz",
            Self::FollowUp => "followup",
            Self::Multilingual => "translate",
            Self::Messenger => "messenger",
            Self::Packager => "packager",
        }
    }

    /// Agent name as known to the orchestration flow.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Summary => "SummaryBuilderAgent",
            Self::Quiz => "ComprehensionQuizAgent",
            Self::FollowUp => "FollowUpPlannerAgent",
            Self::Multilingual => "MultilingualAgent",
            Self::Messenger => "PatientMessengerAgent",
            Self::Packager => "DischargePackagerAgent",
        }
    }

    /// "SummaryBuilderAgent" -> "Summary Builder Agent"
    pub fn display_name(&self) -> String {
        let name = self.agent_name();
        let mut out = String::with_capacity(name.len() + 4);
        for (i, ch) in name.chars().enumerate() {
            if i > 0 && ch.is_ascii_uppercase() {
                out.push(' ');
            }
            out.push(ch);
        }
        out
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Summary => 0,
            Self::Quiz => 1,
            Self::FollowUp => 2,
            Self::Multilingual => 3,
            Self::Messenger => 4,
            Self::Packager => 5,
        }
    }
}

impl std::str::FromStr for StageId {
    type Err = InvalidEnum;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| InvalidEnum {
                field: "StageId".into(),
                value: s.into(),
            })
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.agent_name())
    }
}

/// One stage of a run as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: StageId,
    pub name: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineStage {
    pub fn pending(id: StageId) -> Self {
        Self {
            id,
            name: id.agent_name().to_string(),
            status: StageStatus::Pending,
            output: None,
            error: None,
        }
    }

    /// All six stages in pipeline order, pending.
    pub fn initial_set() -> Vec<PipelineStage> {
        StageId::all().iter().copied().map(Self::pending).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_pipeline_order() {
        for (i, stage) in StageId::all().iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn display_name_splits_on_capitals() {
        assert_eq!(StageId::Summary.display_name(), "Summary Builder Agent");
        assert_eq!(StageId::FollowUp.display_name(), "Follow Up Planner Agent");
        assert_eq!(StageId::Packager.display_name(), "Discharge Packager Agent");
    }

    #[test]
    fn ids_parse_from_export_names() {
        for stage in StageId::all() {
            assert_eq!(stage.as_str().parse::<StageId>().unwrap(), *stage);
        }
        let err = "unknown".parse::<StageId>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid StageId value: unknown");
    }

    #[test]
    fn initial_set_is_all_pending() {
        let stages = PipelineStage::initial_set();
        assert_eq!(stages.len(), STAGE_COUNT);
        assert!(stages.iter().all(|s| s.status == StageStatus::Pending));
        assert!(stages.iter().all(|s| s.output.is_none() && s.error.is_none()));
        assert_eq!(stages[4].name, "PatientMessengerAgent");
    }
}
