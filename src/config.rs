//! Operator-tunable rules: thresholds, recidivism window, license validity,
//! infraction and service-fee tables.
//!
//! Nothing here is a process-wide global. A [`RulesConfig`] is built once
//! (from defaults or a TOML file) and handed to the ledger at construction.

use crate::driver::LicenseCategory;
use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::validate;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// One row of the infraction table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Infraction {
    pub description: String,
    pub base_amount: Money,
    pub points: u32,
}

/// One row of the service-fee table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceFee {
    pub description: String,
    pub amount: Money,
}

/// Rules consumed by the penalty engine and the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Point total at which a license becomes `suspended`.
    pub suspension_threshold: u32,

    /// Point total at which a license becomes `revoked`.
    pub revocation_threshold: u32,

    /// Length of the trailing recidivism window, in days.
    pub recidivism_window_days: u32,

    /// Validity of a license whose category has no override.
    pub default_license_validity_days: u32,

    /// Per-category validity overrides, keyed by category code.
    pub license_validity_days: BTreeMap<String, u32>,

    /// Whether issuing a license reactivates a suspended or revoked driver.
    pub reactivate_on_issue: bool,

    /// Infraction code -> description, base amount, points.
    pub infractions: BTreeMap<String, Infraction>,

    /// Service code -> description, fee.
    pub fees: BTreeMap<String, ServiceFee>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            suspension_threshold: 20,
            revocation_threshold: 30,
            recidivism_window_days: 365,
            default_license_validity_days: 1825,
            license_validity_days: BTreeMap::new(),
            reactivate_on_issue: true,
            infractions: default_infractions(),
            fees: default_fees(),
        }
    }
}

impl RulesConfig {
    /// Loads and validates rules from a TOML file. Keys that are absent keep
    /// their default value.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LedgerError::not_found("rules file", path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let rules = Self::from_toml_str(&content)?;
        debug!(
            "Loaded rules from {}: {} infractions, {} fees",
            path.display(),
            rules.infractions.len(),
            rules.fees.len()
        );
        Ok(rules)
    }

    /// Parses and validates rules from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let rules: RulesConfig = toml::from_str(content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.suspension_threshold == 0 {
            return Err(LedgerError::Config(
                "suspension_threshold must be positive".to_string(),
            ));
        }
        if self.revocation_threshold <= self.suspension_threshold {
            return Err(LedgerError::Config(format!(
                "revocation_threshold ({}) must exceed suspension_threshold ({})",
                self.revocation_threshold, self.suspension_threshold
            )));
        }
        check_days("recidivism_window_days", self.recidivism_window_days)?;
        check_days(
            "default_license_validity_days",
            self.default_license_validity_days,
        )?;
        for (code, days) in &self.license_validity_days {
            LicenseCategory::from_str(code)
                .map_err(|_| LedgerError::Config(format!("unknown license category '{}'", code)))?;
            check_days(&format!("license validity for '{}'", code), *days)?;
        }
        for (code, infraction) in &self.infractions {
            validate::amount("base amount", infraction.base_amount)
                .map_err(|e| LedgerError::Config(format!("infraction '{}': {}", code, e)))?;
        }
        for (code, fee) in &self.fees {
            validate::amount("fee amount", fee.amount)
                .map_err(|e| LedgerError::Config(format!("fee '{}': {}", code, e)))?;
        }
        Ok(())
    }

    /// Validity period, in days, for licenses of `category`.
    pub fn validity_days(&self, category: LicenseCategory) -> u32 {
        self.license_validity_days
            .iter()
            .find(|(code, _)| LicenseCategory::from_str(code).ok() == Some(category))
            .map(|(_, days)| *days)
            .unwrap_or(self.default_license_validity_days)
    }

    /// Looks up an infraction by code.
    pub fn infraction(&self, code: &str) -> Result<&Infraction> {
        self.infractions
            .get(code.trim())
            .ok_or_else(|| LedgerError::not_found("infraction", code.trim()))
    }

    /// Looks up a service fee by code.
    pub fn fee(&self, code: &str) -> Result<&ServiceFee> {
        self.fees
            .get(code.trim())
            .ok_or_else(|| LedgerError::not_found("fee", code.trim()))
    }
}

/// Longest accepted window or validity period, in days.
pub const MAX_DAYS: u32 = 36_500;

fn check_days(name: &str, days: u32) -> Result<()> {
    if days == 0 || days > MAX_DAYS {
        return Err(LedgerError::Config(format!(
            "{} must be between 1 and {} days (got {})",
            name, MAX_DAYS, days
        )));
    }
    Ok(())
}

fn infraction(description: &str, base_units: i64, points: u32) -> Infraction {
    Infraction {
        description: description.to_string(),
        base_amount: Money::from_units(base_units),
        points,
    }
}

fn fee(description: &str, units: i64) -> ServiceFee {
    ServiceFee {
        description: description.to_string(),
        amount: Money::from_units(units),
    }
}

fn default_infractions() -> BTreeMap<String, Infraction> {
    [
        (
            "excesso_velocidade_leve",
            infraction("Speeding up to 20 km/h over the limit", 150, 3),
        ),
        (
            "excesso_velocidade_medio",
            infraction("Speeding 21 to 40 km/h over the limit", 300, 5),
        ),
        (
            "excesso_velocidade_grave",
            infraction("Speeding more than 40 km/h over the limit", 600, 7),
        ),
        (
            "conducao_sem_cnh",
            infraction("Driving without a license or with an expired one", 800, 7),
        ),
        (
            "documentacao_irregular",
            infraction("Vehicle with irregular or expired documents", 400, 5),
        ),
        (
            "recusa_bafometro",
            infraction("Refusing or fleeing a breathalyzer test", 1000, 10),
        ),
        (
            "direcao_perigosa",
            infraction("Dangerous driving that puts others at risk", 900, 7),
        ),
        (
            "estacionamento_proibido",
            infraction("Parking in a prohibited place", 200, 3),
        ),
        (
            "sem_capacete",
            infraction("Riding a motorcycle without a helmet", 350, 5),
        ),
        (
            "transporte_irregular",
            infraction("Breaking cargo or passenger transport rules", 700, 7),
        ),
    ]
    .into_iter()
    .map(|(code, row)| (code.to_string(), row))
    .collect()
}

fn default_fees() -> BTreeMap<String, ServiceFee> {
    [
        ("primeira_habilitacao", fee("First license issuance", 500)),
        ("renovacao_cnh", fee("License renewal", 300)),
        ("curso_reciclagem", fee("Mandatory course for offending drivers", 250)),
        ("emissao_crlv", fee("Vehicle registration certificate", 200)),
        ("transferencia_propriedade", fee("Vehicle ownership transfer", 400)),
        ("liberacao_veiculo", fee("Release of an impounded vehicle", 600)),
        ("participacao_leilao", fee("Vehicle auction participation", 1500)),
        ("curso_nautica", fee("Nautical license course", 3500)),
        ("curso_aerea", fee("Aerial license course", 5000)),
    ]
    .into_iter()
    .map(|(code, row)| (code.to_string(), row))
    .collect()
}
