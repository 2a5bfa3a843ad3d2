use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How an event is delivered. The single authoritative field clients branch on;
/// never inferred from other state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Virtual,
    InPerson,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Virtual => "virtual",
            DeliveryMode::InPerson => "in_person",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "virtual" => DeliveryMode::Virtual,
            _ => DeliveryMode::InPerson,
        }
    }
}

impl Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
