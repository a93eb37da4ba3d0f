//! Vehicle registration, transfer and impoundment.

use super::drivers::require_driver;
use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::validate;
use crate::vehicle::{Vehicle, VehicleAttributes, VehicleStatus};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

const VEHICLE_COLUMNS: &str = "plate, owner_id, model, color, year, chassis, status";

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        plate: row.get(0)?,
        owner_id: row.get(1)?,
        attributes: VehicleAttributes {
            model: row.get(2)?,
            color: row.get(3)?,
            year: row.get(4)?,
            chassis: row.get(5)?,
        },
        status: row.get(6)?,
    })
}

pub(super) fn load_vehicle(conn: &Connection, plate: &str) -> Result<Vehicle> {
    conn.query_row(
        &format!("SELECT {} FROM vehicles WHERE plate = ?1", VEHICLE_COLUMNS),
        params![plate],
        vehicle_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("vehicle", plate))
}

fn normalize_attributes(attrs: VehicleAttributes) -> Result<VehicleAttributes> {
    Ok(VehicleAttributes {
        model: validate::optional_text("model", attrs.model.as_deref())?,
        color: validate::optional_text("color", attrs.color.as_deref())?,
        year: attrs.year,
        chassis: match attrs.chassis.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(validate::plate("chassis", raw)?),
        },
    })
}

impl Ledger {
    /// Registers a vehicle under `owner_id`. The plate is stored uppercase.
    ///
    /// Fails with `AlreadyExists` if the plate or chassis is already
    /// registered; the existing record is left untouched.
    pub fn register_vehicle(
        &self,
        owner_id: &str,
        plate: &str,
        attrs: VehicleAttributes,
    ) -> Result<Vehicle> {
        let vehicle = Vehicle {
            plate: validate::plate("plate", plate)?,
            owner_id: validate::identifier("owner id", owner_id)?,
            attributes: normalize_attributes(attrs)?,
            status: VehicleStatus::Active,
        };

        self.write(|tx| {
            require_driver(tx, &vehicle.owner_id)?;

            let plate_taken: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM vehicles WHERE plate = ?1",
                    params![vehicle.plate],
                    |row| row.get(0),
                )
                .optional()?;
            if plate_taken.is_some() {
                return Err(LedgerError::already_exists("vehicle plate", vehicle.plate.as_str()));
            }

            if let Some(chassis) = &vehicle.attributes.chassis {
                let chassis_taken: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM vehicles WHERE chassis = ?1",
                        params![chassis],
                        |row| row.get(0),
                    )
                    .optional()?;
                if chassis_taken.is_some() {
                    return Err(LedgerError::already_exists("vehicle chassis", chassis.as_str()));
                }
            }

            tx.execute(
                "INSERT INTO vehicles (plate, owner_id, model, color, year, chassis, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    vehicle.plate,
                    vehicle.owner_id,
                    vehicle.attributes.model,
                    vehicle.attributes.color,
                    vehicle.attributes.year,
                    vehicle.attributes.chassis,
                    vehicle.status
                ],
            )?;
            Ok(())
        })?;

        debug!("Registered vehicle {} to {}", vehicle.plate, vehicle.owner_id);
        Ok(vehicle)
    }

    pub fn get_vehicle(&self, plate: &str) -> Result<Vehicle> {
        let plate = validate::plate("plate", plate)?;
        self.read(|conn| load_vehicle(conn, &plate))
    }

    /// Vehicles currently owned by a driver, sorted by plate.
    pub fn vehicles_for(&self, owner_id: &str) -> Result<Vec<Vehicle>> {
        let owner_id = validate::identifier("owner id", owner_id)?;
        self.read(|conn| {
            require_driver(conn, &owner_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM vehicles WHERE owner_id = ?1 ORDER BY plate",
                VEHICLE_COLUMNS
            ))?;
            let vehicles = stmt
                .query_map(params![owner_id], vehicle_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(vehicles)
        })
    }

    /// Reassigns ownership. Both the vehicle and the new owner must exist.
    pub fn transfer_vehicle(&self, plate: &str, new_owner_id: &str) -> Result<Vehicle> {
        let plate = validate::plate("plate", plate)?;
        let new_owner_id = validate::identifier("owner id", new_owner_id)?;

        let vehicle = self.write(|tx| {
            let mut vehicle = load_vehicle(tx, &plate)?;
            require_driver(tx, &new_owner_id)?;
            tx.execute(
                "UPDATE vehicles SET owner_id = ?1 WHERE plate = ?2",
                params![new_owner_id, plate],
            )?;
            vehicle.owner_id = new_owner_id.clone();
            Ok(vehicle)
        })?;

        info!("Vehicle {} transferred to {}", vehicle.plate, vehicle.owner_id);
        Ok(vehicle)
    }

    /// Impounds or releases a vehicle.
    pub fn set_vehicle_status(&self, plate: &str, status: VehicleStatus) -> Result<Vehicle> {
        let plate = validate::plate("plate", plate)?;

        let vehicle = self.write(|tx| {
            let mut vehicle = load_vehicle(tx, &plate)?;
            tx.execute(
                "UPDATE vehicles SET status = ?1 WHERE plate = ?2",
                params![status, plate],
            )?;
            vehicle.status = status;
            Ok(vehicle)
        })?;

        info!("Vehicle {} is now {}", vehicle.plate, vehicle.status);
        Ok(vehicle)
    }
}
