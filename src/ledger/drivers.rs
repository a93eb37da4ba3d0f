//! Driver registration, point accrual, license status and issuance.

use super::Ledger;
use crate::driver::{Driver, License, LicenseCategory, LicenseStatus};
use crate::error::{LedgerError, Result};
use crate::penalty::PenaltyEngine;
use crate::validate;
use chrono::Duration;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) const DRIVER_COLUMNS: &str = "id, name, status, points, contact";

pub(super) fn driver_from_row(row: &Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        id: row.get(0)?,
        name: row.get(1)?,
        status: row.get(2)?,
        points: row.get(3)?,
        contact: row.get(4)?,
    })
}

fn license_from_row(row: &Row<'_>) -> rusqlite::Result<License> {
    Ok(License {
        registration_number: row.get(0)?,
        driver_id: row.get(1)?,
        category: row.get(2)?,
        issued_on: row.get(3)?,
        expires_on: row.get(4)?,
    })
}

pub(super) fn load_driver(conn: &Connection, id: &str) -> Result<Driver> {
    conn.query_row(
        &format!("SELECT {} FROM drivers WHERE id = ?1", DRIVER_COLUMNS),
        params![id],
        driver_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("driver", id))
}

pub(super) fn driver_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM drivers WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub(super) fn require_driver(conn: &Connection, id: &str) -> Result<()> {
    if driver_exists(conn, id)? {
        Ok(())
    } else {
        Err(LedgerError::not_found("driver", id))
    }
}

/// Adds `delta` points and re-derives the status. Must run inside the
/// caller's transaction.
pub(super) fn apply_points(
    conn: &Connection,
    engine: &PenaltyEngine,
    id: &str,
    delta: u32,
) -> Result<Driver> {
    let mut driver = load_driver(conn, id)?;

    let points = driver.points.checked_add(delta).ok_or_else(|| {
        LedgerError::InvalidInput(format!(
            "adding {} points to driver {} overflows the point total",
            delta, id
        ))
    })?;
    let status = engine.status_after(driver.status, points);

    conn.execute(
        "UPDATE drivers SET points = ?1, status = ?2 WHERE id = ?3",
        params![points, status, id],
    )?;

    if status != driver.status {
        info!(
            "Driver {} reached {} points: license {} -> {}",
            id, points, driver.status, status
        );
    }

    driver.points = points;
    driver.status = status;
    Ok(driver)
}

impl Ledger {
    /// Registers a new driver with no points and an `inactive` license.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    pub fn create_driver(&self, id: &str, name: &str, contact: Option<&str>) -> Result<Driver> {
        let id = validate::identifier("driver id", id)?;
        let name = validate::text("driver name", name)?;
        let contact = validate::optional_text("contact", contact)?;
        let driver = Driver::new(id, name, contact);

        self.write(|tx| {
            if driver_exists(tx, &driver.id)? {
                return Err(LedgerError::already_exists("driver", driver.id.as_str()));
            }
            tx.execute(
                "INSERT INTO drivers (id, name, status, points, contact)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    driver.id,
                    driver.name,
                    driver.status,
                    driver.points,
                    driver.contact
                ],
            )?;
            Ok(())
        })?;

        debug!("Registered driver {} ({})", driver.id, driver.name);
        Ok(driver)
    }

    pub fn get_driver(&self, id: &str) -> Result<Driver> {
        let id = validate::identifier("driver id", id)?;
        self.read(|conn| load_driver(conn, &id))
    }

    /// All drivers, sorted by id.
    pub fn list_drivers(&self) -> Result<Vec<Driver>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM drivers ORDER BY id",
                DRIVER_COLUMNS
            ))?;
            let drivers = stmt
                .query_map([], driver_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(drivers)
        })
    }

    /// Atomically adds `delta` to the driver's point total and recomputes the
    /// license status. A `cancelled` status is left alone.
    pub fn adjust_points(&self, id: &str, delta: u32) -> Result<Driver> {
        let id = validate::identifier("driver id", id)?;
        self.write(|tx| apply_points(tx, &self.engine, &id, delta))
    }

    /// Authority override: sets the license status directly, independent of
    /// point thresholds.
    pub fn set_license_status(&self, id: &str, status: LicenseStatus) -> Result<Driver> {
        let id = validate::identifier("driver id", id)?;
        let driver = self.write(|tx| {
            let mut driver = load_driver(tx, &id)?;
            tx.execute(
                "UPDATE drivers SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            driver.status = status;
            Ok(driver)
        })?;

        info!("Driver {} license status set to {}", driver.id, status);
        Ok(driver)
    }

    /// Issues a license of `category` dated today, expiring after the
    /// configured validity for that category.
    ///
    /// Also updates the driver's status: see
    /// [`PenaltyEngine::status_on_issue`] and `reactivate_on_issue`.
    pub fn issue_license(&self, driver_id: &str, category: LicenseCategory) -> Result<License> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        let validity = i64::from(self.rules.validity_days(category));

        let license = self.write(|tx| {
            let issued_on = self.now().date_naive();
            let expires_on = issued_on
                .checked_add_signed(Duration::days(validity))
                .ok_or_else(|| {
                    LedgerError::InvalidInput(format!(
                        "license validity of {} days is out of range",
                        validity
                    ))
                })?;
            let license = License {
                registration_number: License::registration_number(&driver_id, category, issued_on),
                driver_id: driver_id.clone(),
                category,
                issued_on,
                expires_on,
            };

            let driver = load_driver(tx, &license.driver_id)?;

            let taken: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM licenses WHERE registration_number = ?1",
                    params![license.registration_number],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(LedgerError::already_exists(
                    "license",
                    license.registration_number.as_str(),
                ));
            }

            tx.execute(
                "INSERT INTO licenses (registration_number, driver_id, category, issued_on, expires_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    license.registration_number,
                    license.driver_id,
                    license.category,
                    license.issued_on,
                    license.expires_on
                ],
            )?;

            let status = self
                .engine
                .status_on_issue(driver.status, self.rules.reactivate_on_issue);
            if status != driver.status {
                tx.execute(
                    "UPDATE drivers SET status = ?1 WHERE id = ?2",
                    params![status, driver.id],
                )?;
                info!(
                    "Driver {} license status {} -> {} on issuance",
                    driver.id, driver.status, status
                );
            }
            Ok(license)
        })?;

        debug!(
            "Issued license {} ({}) to {}",
            license.registration_number, license.category, license.driver_id
        );
        Ok(license)
    }

    /// Licenses held by a driver, oldest first.
    pub fn licenses_for(&self, driver_id: &str) -> Result<Vec<License>> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        self.read(|conn| {
            require_driver(conn, &driver_id)?;
            let mut stmt = conn.prepare(
                "SELECT registration_number, driver_id, category, issued_on, expires_on
                 FROM licenses WHERE driver_id = ?1
                 ORDER BY issued_on, registration_number",
            )?;
            let licenses = stmt
                .query_map(params![driver_id], license_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(licenses)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RulesConfig;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ledger() -> Ledger {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 9, 14, 0, 0).unwrap());
        Ledger::in_memory(RulesConfig::default())
            .unwrap()
            .with_clock(clock)
    }

    #[test]
    fn test_create_and_get_driver() {
        let ledger = ledger();
        let created = ledger.create_driver(" RG1 ", "Ana Souza", Some("555-0101")).unwrap();
        assert_eq!(created.id, "RG1");

        let fetched = ledger.get_driver("RG1").unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, LicenseStatus::Inactive);
        assert_eq!(fetched.contact.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_duplicate_driver_rejected() {
        let ledger = ledger();
        ledger.create_driver("RG1", "Ana", None).unwrap();
        let err = ledger.create_driver("RG1", "Other", None).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(ledger.get_driver("RG1").unwrap().name, "Ana");
    }

    #[test]
    fn test_get_unknown_driver() {
        assert!(ledger().get_driver("RG404").unwrap_err().is_not_found());
    }

    #[test]
    fn test_malformed_id_is_invalid_input() {
        let err = ledger().create_driver("bad id", "X", None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_issue_license_dates_and_activation() {
        let ledger = ledger();
        ledger.create_driver("RG1", "Ana", None).unwrap();

        let license = ledger.issue_license("RG1", LicenseCategory::B).unwrap();
        assert_eq!(license.registration_number, "CNHRG1B20260309");
        assert_eq!(license.issued_on, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!(
            license.expires_on,
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap() + Duration::days(1825)
        );
        assert_eq!(ledger.get_driver("RG1").unwrap().status, LicenseStatus::Active);
        assert_eq!(ledger.licenses_for("RG1").unwrap(), vec![license]);
    }

    #[test]
    fn test_same_day_reissue_collides() {
        let ledger = ledger();
        ledger.create_driver("RG1", "Ana", None).unwrap();
        ledger.issue_license("RG1", LicenseCategory::A).unwrap();
        let err = ledger.issue_license("RG1", LicenseCategory::A).unwrap_err();
        assert!(err.is_already_exists());
        ledger.issue_license("RG1", LicenseCategory::B).unwrap();
        assert_eq!(ledger.licenses_for("RG1").unwrap().len(), 2);
    }

    #[test]
    fn test_issue_license_unknown_driver() {
        let ledger = ledger();
        assert!(ledger
            .issue_license("RG404", LicenseCategory::B)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_adjust_points_thresholds() {
        let ledger = ledger();
        ledger.create_driver("RG1", "Ana", None).unwrap();
        ledger.issue_license("RG1", LicenseCategory::B).unwrap();

        let d = ledger.adjust_points("RG1", 19).unwrap();
        assert_eq!(d.status, LicenseStatus::Active);
        let d = ledger.adjust_points("RG1", 0).unwrap();
        assert_eq!((d.points, d.status), (19, LicenseStatus::Active));
        let d = ledger.adjust_points("RG1", 1).unwrap();
        assert_eq!((d.points, d.status), (20, LicenseStatus::Suspended));
        let d = ledger.adjust_points("RG1", 10).unwrap();
        assert_eq!((d.points, d.status), (30, LicenseStatus::Revoked));
        assert_eq!(ledger.get_driver("RG1").unwrap(), d);
    }

    #[test]
    fn test_cancelled_survives_point_updates() {
        let ledger = ledger();
        ledger.create_driver("RG1", "Ana", None).unwrap();
        ledger.set_license_status("RG1", LicenseStatus::Cancelled).unwrap();
        let d = ledger.adjust_points("RG1", 35).unwrap();
        assert_eq!((d.points, d.status), (35, LicenseStatus::Cancelled));
    }

    #[test]
    fn test_set_status_unknown_driver() {
        assert!(ledger()
            .set_license_status("RG404", LicenseStatus::Suspended)
            .unwrap_err()
            .is_not_found());
    }
}
