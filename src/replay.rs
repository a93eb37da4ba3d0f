//! Batch replay of ledger operations from CSV.
//!
//! Each row is one operation applied through the public [`Ledger`] API.
//! Rows are applied in file order; a row with an `at` timestamp moves the
//! replay clock first, so citations are stamped (and recidivism windows
//! measured) at the time the row says they happened.

use crate::clock::ManualClock;
use crate::driver::{LicenseCategory, LicenseStatus};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::vehicle::VehicleAttributes;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;

/// Raw operation record as read from CSV.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OperationRecord {
    /// register, license, vehicle, citation, status, fee
    pub op: String,

    pub driver: String,

    /// Name, category, model, infraction code, status or service code,
    /// depending on `op`.
    pub value: Option<String>,

    pub plate: Option<String>,

    pub agent: Option<String>,

    /// RFC 3339 instant the operation happened at.
    pub at: Option<String>,
}

/// A parsed operation ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Register {
        driver: String,
        name: String,
    },
    License {
        driver: String,
        category: LicenseCategory,
    },
    Vehicle {
        driver: String,
        plate: String,
        model: Option<String>,
    },
    Citation {
        driver: String,
        code: String,
        plate: Option<String>,
        agent: String,
    },
    Status {
        driver: String,
        status: LicenseStatus,
    },
    Fee {
        driver: String,
        service: String,
    },
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl OperationRecord {
    /// Parses the raw CSV record into a typed operation and its timestamp.
    pub fn parse(&self) -> Result<(Operation, Option<DateTime<Utc>>)> {
        let driver = self.driver.trim().to_string();
        let value = non_blank(&self.value);
        let missing = |what: &str| {
            LedgerError::InvalidInput(format!("'{}' row is missing {}", self.op.trim(), what))
        };

        let op = match self.op.trim().to_lowercase().as_str() {
            "register" => Operation::Register {
                driver,
                name: value.ok_or_else(|| missing("a name"))?.to_string(),
            },
            "license" => Operation::License {
                driver,
                category: LicenseCategory::from_str(value.ok_or_else(|| missing("a category"))?)?,
            },
            "vehicle" => Operation::Vehicle {
                driver,
                plate: non_blank(&self.plate)
                    .ok_or_else(|| missing("a plate"))?
                    .to_string(),
                model: value.map(str::to_string),
            },
            "citation" => Operation::Citation {
                driver,
                code: value.ok_or_else(|| missing("an infraction code"))?.to_string(),
                plate: non_blank(&self.plate).map(str::to_string),
                agent: non_blank(&self.agent)
                    .ok_or_else(|| missing("an agent"))?
                    .to_string(),
            },
            "status" => Operation::Status {
                driver,
                status: LicenseStatus::from_str(value.ok_or_else(|| missing("a status"))?)?,
            },
            "fee" => Operation::Fee {
                driver,
                service: value.ok_or_else(|| missing("a service code"))?.to_string(),
            },
            other => {
                return Err(LedgerError::InvalidInput(format!(
                    "unknown operation '{}'",
                    other
                )))
            }
        };

        let at = match non_blank(&self.at) {
            None => None,
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| {
                        LedgerError::InvalidInput(format!("bad timestamp '{}': {}", raw, e))
                    })?
                    .with_timezone(&Utc),
            ),
        };

        Ok((op, at))
    }
}

/// Applies CSV operation files to a ledger and reports the resulting driver
/// states.
pub struct Replay {
    ledger: Ledger,
    clock: ManualClock,
}

impl Replay {
    /// Wraps `ledger`, replacing its clock with a replay clock that starts at
    /// the ledger's current time.
    pub fn new(ledger: Ledger) -> Self {
        let clock = ManualClock::new(ledger.now());
        let ledger = ledger.with_clock(clock.clone());
        Replay { ledger, clock }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Processes operations from a CSV reader in streaming fashion.
    ///
    /// Invalid or failing rows are logged at warn level and skipped.
    /// Returns the number of rows applied successfully.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut applied = 0;
        for (row_idx, result) in csv_reader.deserialize::<OperationRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };

            match record.parse() {
                Ok((op, at)) => {
                    if let Some(at) = at {
                        self.clock.set(at);
                    }
                    match self.apply(&op) {
                        Ok(()) => applied += 1,
                        Err(e) => warn!("Row {}: {}", row_num, e),
                    }
                }
                Err(e) => warn!("Row {}: {}", row_num, e),
            }
        }

        debug!("Replay applied {} operations", applied);
        Ok(applied)
    }

    /// Applies a single parsed operation.
    pub fn apply(&self, op: &Operation) -> Result<()> {
        match op {
            Operation::Register { driver, name } => {
                self.ledger.create_driver(driver, name, None)?;
            }
            Operation::License { driver, category } => {
                self.ledger.issue_license(driver, *category)?;
            }
            Operation::Vehicle {
                driver,
                plate,
                model,
            } => {
                let attrs = VehicleAttributes {
                    model: model.clone(),
                    ..VehicleAttributes::default()
                };
                self.ledger.register_vehicle(driver, plate, attrs)?;
            }
            Operation::Citation {
                driver,
                code,
                plate,
                agent,
            } => {
                self.ledger
                    .record_infraction(driver, plate.as_deref(), agent, code)?;
            }
            Operation::Status { driver, status } => {
                self.ledger.set_license_status(driver, *status)?;
            }
            Operation::Fee { driver, service } => {
                self.ledger.pay_service_fee(driver, service)?;
            }
        }
        Ok(())
    }

    /// Writes final driver states to CSV, sorted by driver id.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["driver", "name", "status", "points", "citations", "charged"])?;

        for driver in self.ledger.list_drivers()? {
            let citations = self.ledger.citations_for(&driver.id, None)?;
            let charged = Money::checked_sum(citations.iter().map(|c| c.amount)).ok_or_else(|| {
                LedgerError::InvalidInput(format!("total charged to {} overflows", driver.id))
            })?;
            csv_writer.write_record([
                driver.id,
                driver.name,
                driver.status.to_string(),
                driver.points.to_string(),
                citations.len().to_string(),
                charged.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
