//! Read-only reports over the ledger.

use super::drivers::{driver_from_row, DRIVER_COLUMNS};
use super::Ledger;
use crate::driver::{Driver, LicenseStatus};
use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::validate;
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of citations of one infraction code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfractionCount {
    pub infraction_code: String,
    pub count: u64,
}

/// Everything an agent has issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub agent_id: String,
    pub citations: u64,
    pub total_charged: Money,

    /// Most frequent first; ties broken by code.
    pub by_infraction: Vec<InfractionCount>,
}

impl Ledger {
    /// Summarizes the citations issued by `agent_id`. An agent with no
    /// citations gets an empty report rather than an error.
    pub fn agent_report(&self, agent_id: &str) -> Result<AgentReport> {
        let agent_id = validate::identifier("agent id", agent_id)?;
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT infraction_code, amount FROM citations WHERE agent_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![agent_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Money>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for (code, _) in &rows {
                *counts.entry(code.clone()).or_insert(0) += 1;
            }
            let mut by_infraction: Vec<InfractionCount> = counts
                .into_iter()
                .map(|(infraction_code, count)| InfractionCount {
                    infraction_code,
                    count,
                })
                .collect();
            by_infraction.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.infraction_code.cmp(&b.infraction_code))
            });

            let total_charged = Money::checked_sum(rows.iter().map(|(_, amount)| *amount))
                .ok_or_else(|| {
                    LedgerError::InvalidInput(format!("total charged by {} overflows", agent_id))
                })?;

            Ok(AgentReport {
                agent_id: agent_id.clone(),
                citations: rows.len() as u64,
                total_charged,
                by_infraction,
            })
        })
    }

    /// Drivers whose license is suspended, revoked or cancelled, highest
    /// point total first.
    pub fn restricted_drivers(&self) -> Result<Vec<Driver>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM drivers
                 WHERE status IN (?1, ?2, ?3)
                 ORDER BY points DESC, id",
                DRIVER_COLUMNS
            ))?;
            let drivers = stmt
                .query_map(
                    params![
                        LicenseStatus::Suspended,
                        LicenseStatus::Revoked,
                        LicenseStatus::Cancelled
                    ],
                    driver_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(drivers)
        })
    }
}
