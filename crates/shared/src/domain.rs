use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(SessionId);
id_newtype!(IssueId);

/// Lifecycle stage of a research session as reported by the backend.
///
/// Values outside the known set are kept verbatim in `Unknown` so a newer
/// backend never breaks deserialization; they present as `Initializing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ResearchStatus {
    #[default]
    Initializing,
    SettingUp,
    Researching,
    CreatingPrd,
    CreatingLinearIssue,
    Completed,
    Failed,
    Unknown(String),
}

impl ResearchStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "initializing" => Self::Initializing,
            "setting_up" => Self::SettingUp,
            "researching" => Self::Researching,
            "creating_prd" => Self::CreatingPrd,
            "creating_linear_issue" => Self::CreatingLinearIssue,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Initializing => "initializing",
            Self::SettingUp => "setting_up",
            Self::Researching => "researching",
            Self::CreatingPrd => "creating_prd",
            Self::CreatingLinearIssue => "creating_linear_issue",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Status used for display; unrecognised values fall back to `Initializing`.
    pub fn presented(&self) -> Self {
        match self {
            Self::Unknown(_) => Self::Initializing,
            known => known.clone(),
        }
    }
}

impl fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResearchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResearchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
