//! Citation and payment records.

use crate::driver::Driver;
use crate::error::LedgerError;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle of a citation. Moves only out of `Pending`, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStatus {
    Pending,
    Paid,
    Appealed,
}

impl CitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationStatus::Pending => "pending",
            CitationStatus::Paid => "paid",
            CitationStatus::Appealed => "appealed",
        }
    }

    /// `pending -> paid` and `pending -> appealed` are the only legal moves.
    pub fn can_transition_to(&self, next: CitationStatus) -> bool {
        matches!(
            (self, next),
            (CitationStatus::Pending, CitationStatus::Paid)
                | (CitationStatus::Pending, CitationStatus::Appealed)
        )
    }
}

impl FromStr for CitationStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(CitationStatus::Pending),
            "paid" => Ok(CitationStatus::Paid),
            "appealed" => Ok(CitationStatus::Appealed),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown citation status '{}'",
                other
            ))),
        }
    }
}

text_column!(CitationStatus);

/// A citation request as submitted by a caller.
///
/// `base_amount` and `points` come from the infraction table (or are given
/// explicitly); the charged amount is decided by the penalty engine.
#[derive(Debug, Clone)]
pub struct NewCitation {
    pub driver_id: String,
    pub vehicle_plate: Option<String>,
    pub agent_id: String,
    pub infraction_code: String,
    pub base_amount: Money,
    pub points: u32,
}

/// A recorded citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// Sequential identifier.
    pub id: i64,

    pub driver_id: String,

    pub vehicle_plate: Option<String>,

    /// Staff member who issued the citation.
    pub agent_id: String,

    pub infraction_code: String,

    /// Amount charged: `base_amount`, or exactly twice it for a repeat offense.
    pub amount: Money,

    pub base_amount: Money,

    pub repeat_offense: bool,

    pub points: u32,

    pub occurred_at: DateTime<Utc>,

    pub status: CitationStatus,
}

/// Result of `record_citation`: the stored citation and the driver as it
/// stands after point accrual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCitation {
    pub citation: Citation,
    pub driver: Driver,
}

/// Money received from a driver: settlement of a citation or a service fee.
/// Exactly one of `citation_id` and `service_code` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: i64,
    pub driver_id: String,
    pub citation_id: Option<i64>,
    pub service_code: Option<String>,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}
