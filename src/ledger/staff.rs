//! Staff roster persistence.

use super::drivers::require_driver;
use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::staff::{StaffMember, StaffRole};
use crate::validate;
use log::info;
use rusqlite::{params, OptionalExtension, Row};

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<StaffMember> {
    Ok(StaffMember {
        member_id: row.get(0)?,
        display_name: row.get(1)?,
        role: row.get(2)?,
        driver_id: row.get(3)?,
    })
}

impl Ledger {
    /// Adds a staff member. A linked `driver_id` must reference an existing
    /// driver.
    pub fn add_staff_member(
        &self,
        member_id: &str,
        display_name: &str,
        role: StaffRole,
        driver_id: Option<&str>,
    ) -> Result<StaffMember> {
        let member = StaffMember {
            member_id: validate::identifier("member id", member_id)?,
            display_name: validate::text("display name", display_name)?,
            role,
            driver_id: match driver_id.map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(validate::identifier("driver id", raw)?),
            },
        };

        self.write(|tx| {
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM staff_members WHERE member_id = ?1",
                    params![member.member_id],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(LedgerError::already_exists(
                    "staff member",
                    member.member_id.as_str(),
                ));
            }
            if let Some(driver_id) = &member.driver_id {
                require_driver(tx, driver_id)?;
            }
            tx.execute(
                "INSERT INTO staff_members (member_id, display_name, role, driver_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    member.member_id,
                    member.display_name,
                    member.role,
                    member.driver_id
                ],
            )?;
            Ok(())
        })?;

        info!("Added {} {} ({})", member.role, member.member_id, member.display_name);
        Ok(member)
    }

    pub fn get_staff_member(&self, member_id: &str) -> Result<StaffMember> {
        let member_id = validate::identifier("member id", member_id)?;
        self.read(|conn| {
            conn.query_row(
                "SELECT member_id, display_name, role, driver_id
                 FROM staff_members WHERE member_id = ?1",
                params![member_id],
                member_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("staff member", member_id.as_str()))
        })
    }

    /// Staff sorted by member id, optionally only those holding `role`.
    pub fn list_staff(&self, role: Option<StaffRole>) -> Result<Vec<StaffMember>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT member_id, display_name, role, driver_id
                 FROM staff_members
                 WHERE ?1 IS NULL OR role = ?1
                 ORDER BY member_id",
            )?;
            let members = stmt
                .query_map(params![role], member_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(members)
        })
    }

    /// Removes a staff member. Citations they issued keep their agent id.
    pub fn remove_staff_member(&self, member_id: &str) -> Result<()> {
        let member_id = validate::identifier("member id", member_id)?;
        self.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM staff_members WHERE member_id = ?1",
                params![member_id],
            )?;
            if removed == 0 {
                return Err(LedgerError::not_found("staff member", member_id.as_str()));
            }
            Ok(())
        })?;

        info!("Removed staff member {}", member_id);
        Ok(())
    }
}
