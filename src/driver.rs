//! Driver and license model.
//!
//! A driver's `points` and `status` are only ever changed by the ledger,
//! either through point accrual (which consults the penalty engine) or
//! through an explicit authority override.

use crate::error::LedgerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Driving privilege of a driver.
///
/// ```text
/// inactive --issue_license--> active
/// active --points >= suspension--> suspended
/// active/suspended --points >= revocation--> revoked
/// any --authority override--> suspended | revoked | cancelled
/// suspended/revoked --issue_license--> active   (when reactivation is enabled)
/// ```
///
/// `cancelled` is terminal for every automatic transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Inactive,
    Active,
    Suspended,
    Revoked,
    Cancelled,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Inactive => "inactive",
            LicenseStatus::Active => "active",
            LicenseStatus::Suspended => "suspended",
            LicenseStatus::Revoked => "revoked",
            LicenseStatus::Cancelled => "cancelled",
        }
    }

    /// `true` for statuses that forbid driving and show up in the
    /// restricted-drivers report.
    pub fn is_restricted(&self) -> bool {
        matches!(
            self,
            LicenseStatus::Suspended | LicenseStatus::Revoked | LicenseStatus::Cancelled
        )
    }

    /// `true` once no automatic transition may change the status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LicenseStatus::Cancelled)
    }
}

impl FromStr for LicenseStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inactive" => Ok(LicenseStatus::Inactive),
            "active" => Ok(LicenseStatus::Active),
            "suspended" => Ok(LicenseStatus::Suspended),
            "revoked" => Ok(LicenseStatus::Revoked),
            "cancelled" => Ok(LicenseStatus::Cancelled),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown license status '{}'",
                other
            ))),
        }
    }
}

text_column!(LicenseStatus);

/// A registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Driver {
    /// External registration key (in-game RG).
    pub id: String,

    pub name: String,

    pub status: LicenseStatus,

    /// Sum of the points of every citation ever recorded against the driver.
    pub points: u32,

    pub contact: Option<String>,
}

impl Driver {
    /// A freshly registered driver: no points, no driving privilege yet.
    pub fn new(id: String, name: String, contact: Option<String>) -> Self {
        Driver {
            id,
            name,
            status: LicenseStatus::Inactive,
            points: 0,
            contact,
        }
    }
}

/// Vehicle class a license is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LicenseCategory {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "nautical")]
    Nautical,
    #[serde(rename = "aerial")]
    Aerial,
}

impl LicenseCategory {
    pub const ALL: [LicenseCategory; 7] = [
        LicenseCategory::A,
        LicenseCategory::B,
        LicenseCategory::C,
        LicenseCategory::D,
        LicenseCategory::E,
        LicenseCategory::Nautical,
        LicenseCategory::Aerial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseCategory::A => "A",
            LicenseCategory::B => "B",
            LicenseCategory::C => "C",
            LicenseCategory::D => "D",
            LicenseCategory::E => "E",
            LicenseCategory::Nautical => "nautical",
            LicenseCategory::Aerial => "aerial",
        }
    }
}

impl FromStr for LicenseCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(LicenseCategory::A),
            "b" => Ok(LicenseCategory::B),
            "c" => Ok(LicenseCategory::C),
            "d" => Ok(LicenseCategory::D),
            "e" => Ok(LicenseCategory::E),
            "nautical" | "nautica" | "náutica" => Ok(LicenseCategory::Nautical),
            "aerial" | "aerea" | "aérea" => Ok(LicenseCategory::Aerial),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown license category '{}'",
                other
            ))),
        }
    }
}

text_column!(LicenseCategory);

/// An issued driving credential for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    pub registration_number: String,
    pub driver_id: String,
    pub category: LicenseCategory,
    pub issued_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl License {
    /// Registration numbers are derived, never chosen:
    /// `CNH{driver}{category}{YYYYMMDD}`.
    pub fn registration_number(
        driver_id: &str,
        category: LicenseCategory,
        issued_on: NaiveDate,
    ) -> String {
        format!(
            "CNH{}{}{}",
            driver_id,
            category.as_str().to_uppercase(),
            issued_on.format("%Y%m%d")
        )
    }

    /// Returns `true` if the license is past its expiry date on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.expires_on
    }
}
