//! Traffic authority staff roster.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Director,
    Instructor,
    Agent,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Director => "director",
            StaffRole::Instructor => "instructor",
            StaffRole::Agent => "agent",
        }
    }
}

impl FromStr for StaffRole {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "director" | "diretor" => Ok(StaffRole::Director),
            "instructor" | "instrutor" => Ok(StaffRole::Instructor),
            "agent" | "agente" => Ok(StaffRole::Agent),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown staff role '{}'",
                other
            ))),
        }
    }
}

text_column!(StaffRole);

/// A member of the authority, keyed by their chat-platform user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffMember {
    pub member_id: String,
    pub display_name: String,
    pub role: StaffRole,

    /// In-game driver record of the member, if they have one.
    pub driver_id: Option<String>,
}
