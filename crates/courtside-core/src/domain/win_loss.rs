use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Game outcome from the player's team perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinLoss {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
}

impl WinLoss {
    /// Storage code: `W` or `L`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "W",
            Self::Loss => "L",
        }
    }
}

impl Display for WinLoss {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WinLoss {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "W" => Ok(Self::Win),
            "L" => Ok(Self::Loss),
            other => Err(ValidationError::InvalidWinLoss {
                value: other.to_string(),
            }),
        }
    }
}
