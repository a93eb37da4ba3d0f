//! Citations: recording with recidivism escalation, lifecycle, payments.

use super::drivers::{apply_points, require_driver};
use super::vehicles::load_vehicle;
use super::{from_millis, to_millis, Ledger};
use crate::citation::{Citation, CitationStatus, NewCitation, Payment, RecordedCitation};
use crate::error::{LedgerError, Result};
use crate::validate;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) const CITATION_COLUMNS: &str = "id, driver_id, vehicle_plate, agent_id, infraction_code, \
     amount, base_amount, repeat_offense, points, occurred_at, status";

pub(super) fn citation_from_row(row: &Row<'_>) -> rusqlite::Result<Citation> {
    Ok(Citation {
        id: row.get(0)?,
        driver_id: row.get(1)?,
        vehicle_plate: row.get(2)?,
        agent_id: row.get(3)?,
        infraction_code: row.get(4)?,
        amount: row.get(5)?,
        base_amount: row.get(6)?,
        repeat_offense: row.get(7)?,
        points: row.get(8)?,
        occurred_at: from_millis(9, row.get(9)?)?,
        status: row.get(10)?,
    })
}

const PAYMENT_COLUMNS: &str = "id, driver_id, citation_id, service_code, amount, paid_at";

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        driver_id: row.get(1)?,
        citation_id: row.get(2)?,
        service_code: row.get(3)?,
        amount: row.get(4)?,
        paid_at: from_millis(5, row.get(5)?)?,
    })
}

fn load_citation(conn: &Connection, id: i64) -> Result<Citation> {
    conn.query_row(
        &format!("SELECT {} FROM citations WHERE id = ?1", CITATION_COLUMNS),
        params![id],
        citation_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("citation", id.to_string()))
}

/// Validated, normalized form of a [`NewCitation`].
fn normalize(request: NewCitation) -> Result<NewCitation> {
    Ok(NewCitation {
        driver_id: validate::identifier("driver id", &request.driver_id)?,
        vehicle_plate: match request.vehicle_plate.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(validate::plate("plate", raw)?),
        },
        agent_id: validate::identifier("agent id", &request.agent_id)?,
        infraction_code: validate::identifier("infraction code", &request.infraction_code)?,
        base_amount: validate::amount("base amount", request.base_amount)?,
        points: request.points,
    })
}

impl Ledger {
    /// Records a citation and applies its consequences as one unit.
    ///
    /// Within a single transaction this:
    ///
    /// 1. checks that the driver (and the vehicle, when a plate is given)
    ///    exists,
    /// 2. counts the driver's citations with the same infraction code whose
    ///    timestamp lies in `[now - window, now]`,
    /// 3. inserts the citation charged at the base amount, or double it when
    ///    that count is non-zero,
    /// 4. adds the points to the driver and re-derives the license status.
    ///
    /// Concurrent calls serialize on the ledger, so two citations for the
    /// same driver and code never both see "first offense". On error nothing
    /// is persisted.
    pub fn record_citation(&self, request: NewCitation) -> Result<RecordedCitation> {
        let request = normalize(request)?;

        let recorded = self.write(|tx| {
            // Clock is read under the lock: timestamps follow commit order.
            let now = self.now();
            let window_start = self.engine.window_start(now)?;

            require_driver(tx, &request.driver_id)?;
            if let Some(plate) = &request.vehicle_plate {
                load_vehicle(tx, plate)?;
            }

            let prior_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM citations
                 WHERE driver_id = ?1 AND infraction_code = ?2
                   AND occurred_at >= ?3 AND occurred_at <= ?4",
                params![
                    request.driver_id,
                    request.infraction_code,
                    to_millis(window_start),
                    to_millis(now)
                ],
                |row| row.get(0),
            )?;
            let assessment = self
                .engine
                .assess(request.base_amount, request.points, prior_count.max(0) as u64)?;

            tx.execute(
                "INSERT INTO citations (driver_id, vehicle_plate, agent_id, infraction_code,
                     amount, base_amount, repeat_offense, points, occurred_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    request.driver_id,
                    request.vehicle_plate,
                    request.agent_id,
                    request.infraction_code,
                    assessment.amount,
                    request.base_amount,
                    assessment.repeat_offense,
                    assessment.points,
                    to_millis(now),
                    CitationStatus::Pending
                ],
            )?;
            let citation_id = tx.last_insert_rowid();

            let driver = apply_points(tx, &self.engine, &request.driver_id, assessment.points)?;
            let citation = load_citation(tx, citation_id)?;

            Ok(RecordedCitation { citation, driver })
        })?;

        info!(
            "Citation #{} for {}: {} charged {}{} (+{} points, total {}, license {})",
            recorded.citation.id,
            recorded.citation.driver_id,
            recorded.citation.infraction_code,
            recorded.citation.amount,
            if recorded.citation.repeat_offense {
                " (repeat offense)"
            } else {
                ""
            },
            recorded.citation.points,
            recorded.driver.points,
            recorded.driver.status
        );
        Ok(recorded)
    }

    /// Records an infraction from the configured table: base amount and
    /// points come from the rules, everything else as in
    /// [`Ledger::record_citation`].
    ///
    /// Fails with `NotFound` for an infraction code missing from the table.
    pub fn record_infraction(
        &self,
        driver_id: &str,
        vehicle_plate: Option<&str>,
        agent_id: &str,
        infraction_code: &str,
    ) -> Result<RecordedCitation> {
        let infraction = self.rules.infraction(infraction_code)?;
        self.record_citation(NewCitation {
            driver_id: driver_id.to_string(),
            vehicle_plate: vehicle_plate.map(str::to_string),
            agent_id: agent_id.to_string(),
            infraction_code: infraction_code.trim().to_string(),
            base_amount: infraction.base_amount,
            points: infraction.points,
        })
    }

    pub fn get_citation(&self, id: i64) -> Result<Citation> {
        self.read(|conn| load_citation(conn, id))
    }

    /// Citations against a driver in id order, optionally filtered by status.
    pub fn citations_for(
        &self,
        driver_id: &str,
        status: Option<CitationStatus>,
    ) -> Result<Vec<Citation>> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        self.read(|conn| {
            require_driver(conn, &driver_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM citations
                 WHERE driver_id = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY id",
                CITATION_COLUMNS
            ))?;
            let citations = stmt
                .query_map(params![driver_id, status], citation_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(citations)
        })
    }

    /// Advances a citation's status. Only `pending -> paid` and
    /// `pending -> appealed` are accepted; anything else is
    /// `InvalidTransition`. Paying writes a payment record for the charged
    /// amount in the same transaction.
    pub fn set_citation_status(&self, id: i64, status: CitationStatus) -> Result<Citation> {
        let citation = self.write(|tx| {
            let now = self.now();
            let mut citation = load_citation(tx, id)?;
            if !citation.status.can_transition_to(status) {
                return Err(LedgerError::InvalidTransition {
                    entity: "citation",
                    from: citation.status.to_string(),
                    to: status.to_string(),
                });
            }

            tx.execute(
                "UPDATE citations SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            if status == CitationStatus::Paid {
                tx.execute(
                    "INSERT INTO payments (driver_id, citation_id, amount, paid_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![citation.driver_id, id, citation.amount, to_millis(now)],
                )?;
            }

            citation.status = status;
            Ok(citation)
        })?;

        debug!("Citation #{} is now {}", citation.id, citation.status);
        Ok(citation)
    }

    /// Charges a driver the configured fee for a service (first license,
    /// renewal, vehicle release, ...) and records the payment.
    ///
    /// Fails with `NotFound` for an unknown driver or a fee code missing from
    /// the rules.
    pub fn pay_service_fee(&self, driver_id: &str, service_code: &str) -> Result<Payment> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        let service_code = validate::identifier("service code", service_code)?;
        let fee = self.rules.fee(&service_code)?;

        let payment = self.write(|tx| {
            let now = self.now();
            require_driver(tx, &driver_id)?;
            tx.execute(
                "INSERT INTO payments (driver_id, service_code, amount, paid_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![driver_id, service_code, fee.amount, to_millis(now)],
            )?;
            let payment = tx.query_row(
                &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
                params![tx.last_insert_rowid()],
                payment_from_row,
            )?;
            Ok(payment)
        })?;

        info!(
            "Driver {} paid {} for {} ({})",
            payment.driver_id, payment.amount, service_code, fee.description
        );
        Ok(payment)
    }

    /// Payments made by a driver, oldest first.
    pub fn payments_for(&self, driver_id: &str) -> Result<Vec<Payment>> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        self.read(|conn| {
            require_driver(conn, &driver_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM payments WHERE driver_id = ?1 ORDER BY id",
                PAYMENT_COLUMNS
            ))?;
            let payments = stmt
                .query_map(params![driver_id], payment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(payments)
        })
    }
}
