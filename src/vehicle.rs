//! Vehicle registry model.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Registration (CRLV) status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Impounded,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Impounded => "impounded",
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(VehicleStatus::Active),
            "impounded" => Ok(VehicleStatus::Impounded),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown vehicle status '{}'",
                other
            ))),
        }
    }
}

text_column!(VehicleStatus);

/// Descriptive attributes supplied at registration. All optional; a chassis
/// number, when present, is unique across the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAttributes {
    pub model: Option<String>,
    pub color: Option<String>,
    pub year: Option<u16>,
    pub chassis: Option<String>,
}

impl VehicleAttributes {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn chassis(mut self, chassis: impl Into<String>) -> Self {
        self.chassis = Some(chassis.into());
        self
    }
}

/// A registered vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    /// Uppercase plate, unique.
    pub plate: String,

    /// Driver id of the current owner.
    pub owner_id: String,

    pub attributes: VehicleAttributes,

    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn is_impounded(&self) -> bool {
        self.status == VehicleStatus::Impounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_builder() {
        let attrs = VehicleAttributes::default()
            .model("Sultan")
            .color("blue")
            .year(2019)
            .chassis("9BWZZZ377VT004251");

        assert_eq!(attrs.model.as_deref(), Some("Sultan"));
        assert_eq!(attrs.color.as_deref(), Some("blue"));
        assert_eq!(attrs.year, Some(2019));
        assert_eq!(attrs.chassis.as_deref(), Some("9BWZZZ377VT004251"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "Impounded".parse::<VehicleStatus>().unwrap(),
            VehicleStatus::Impounded
        );
        assert!("towed".parse::<VehicleStatus>().is_err());
    }
}
