use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(StageStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Error => "error",
});

str_enum!(RunState {
    Idle => "idle",
    Running => "running",
    Completed => "completed",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stage_status_round_trips_through_str() {
        for status in [
            StageStatus::Pending,
            StageStatus::Running,
            StageStatus::Completed,
            StageStatus::Error,
        ] {
            assert_eq!(StageStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = StageStatus::from_str("paused").unwrap_err();
        assert_eq!(err.field, "StageStatus");
        assert_eq!(err.value, "paused");
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&StageStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let state: RunState = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(state, RunState::Idle);
    }
}
