//! Courses and enrollments.

use super::drivers::require_driver;
use super::Ledger;
use crate::course::{Course, Enrollment, EnrollmentStatus};
use crate::error::{LedgerError, Result};
use crate::validate;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        theory_hours: row.get(2)?,
        practice_hours: row.get(3)?,
        requirements: row.get(4)?,
    })
}

fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        driver_id: row.get(0)?,
        course_id: row.get(1)?,
        course_name: row.get(2)?,
        enrolled_on: row.get(3)?,
        status: row.get(4)?,
    })
}

fn course_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM courses WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("course", name))
}

fn load_enrollment(conn: &Connection, driver_id: &str, course_id: i64) -> Result<Option<Enrollment>> {
    let enrollment = conn
        .query_row(
            "SELECT e.driver_id, e.course_id, c.name, e.enrolled_on, e.status
             FROM enrollments e JOIN courses c ON c.id = e.course_id
             WHERE e.driver_id = ?1 AND e.course_id = ?2",
            params![driver_id, course_id],
            enrollment_from_row,
        )
        .optional()?;
    Ok(enrollment)
}

impl Ledger {
    /// All offered courses, in id order.
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, theory_hours, practice_hours, requirements
                 FROM courses ORDER BY id",
            )?;
            let courses = stmt
                .query_map([], course_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(courses)
        })
    }

    /// Enrolls a driver in the course called `course_name`, dated today.
    pub fn enroll(&self, driver_id: &str, course_name: &str) -> Result<Enrollment> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        let course_name = validate::text("course name", course_name)?;
        let enrolled_on = self.now().date_naive();

        let enrollment = self.write(|tx| {
            require_driver(tx, &driver_id)?;
            let course_id = course_id(tx, &course_name)?;
            if load_enrollment(tx, &driver_id, course_id)?.is_some() {
                return Err(LedgerError::already_exists(
                    "enrollment",
                    format!("{} in {}", driver_id, course_name),
                ));
            }
            tx.execute(
                "INSERT INTO enrollments (driver_id, course_id, enrolled_on, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![driver_id, course_id, enrolled_on, EnrollmentStatus::InProgress],
            )?;
            Ok(Enrollment {
                driver_id: driver_id.clone(),
                course_id,
                course_name: course_name.clone(),
                enrolled_on,
                status: EnrollmentStatus::InProgress,
            })
        })?;

        info!("Driver {} enrolled in {}", enrollment.driver_id, enrollment.course_name);
        Ok(enrollment)
    }

    /// Grades an enrollment. Only `in_progress -> approved | failed` is
    /// accepted.
    pub fn set_enrollment_status(
        &self,
        driver_id: &str,
        course_name: &str,
        status: EnrollmentStatus,
    ) -> Result<Enrollment> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        let course_name = validate::text("course name", course_name)?;

        let enrollment = self.write(|tx| {
            let course_id = course_id(tx, &course_name)?;
            let mut enrollment = load_enrollment(tx, &driver_id, course_id)?.ok_or_else(|| {
                LedgerError::not_found("enrollment", format!("{} in {}", driver_id, course_name))
            })?;
            if !enrollment.status.can_transition_to(status) {
                return Err(LedgerError::InvalidTransition {
                    entity: "enrollment",
                    from: enrollment.status.to_string(),
                    to: status.to_string(),
                });
            }
            tx.execute(
                "UPDATE enrollments SET status = ?1 WHERE driver_id = ?2 AND course_id = ?3",
                params![status, driver_id, course_id],
            )?;
            enrollment.status = status;
            Ok(enrollment)
        })?;

        info!(
            "Driver {} {} in {}",
            enrollment.driver_id, enrollment.status, enrollment.course_name
        );
        Ok(enrollment)
    }

    /// A driver's enrollments, in course order.
    pub fn enrollments_for(&self, driver_id: &str) -> Result<Vec<Enrollment>> {
        let driver_id = validate::identifier("driver id", driver_id)?;
        self.read(|conn| {
            require_driver(conn, &driver_id)?;
            let mut stmt = conn.prepare(
                "SELECT e.driver_id, e.course_id, c.name, e.enrolled_on, e.status
                 FROM enrollments e JOIN courses c ON c.id = e.course_id
                 WHERE e.driver_id = ?1 ORDER BY e.course_id",
            )?;
            let enrollments = stmt
                .query_map(params![driver_id], enrollment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(enrollments)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::course::DEFAULT_COURSES;

    fn ledger() -> Ledger {
        let ledger = Ledger::in_memory(RulesConfig::default()).unwrap();
        ledger.create_driver("RG1", "Ana", None).unwrap();
        ledger
    }

    #[test]
    fn test_default_courses_seeded() {
        let courses = ledger().list_courses().unwrap();
        assert_eq!(courses.len(), DEFAULT_COURSES.len());
        assert_eq!(courses[1].name, "License B");
        assert_eq!(courses[1].practice_hours, 60);
    }

    #[test]
    fn test_enroll_and_grade() {
        let ledger = ledger();
        let e = ledger.enroll("RG1", "License B").unwrap();
        assert_eq!(e.status, EnrollmentStatus::InProgress);

        let graded = ledger
            .set_enrollment_status("RG1", "License B", EnrollmentStatus::Approved)
            .unwrap();
        assert_eq!(graded.status, EnrollmentStatus::Approved);

        let err = ledger
            .set_enrollment_status("RG1", "License B", EnrollmentStatus::Failed)
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(
            ledger.enrollments_for("RG1").unwrap()[0].status,
            EnrollmentStatus::Approved
        );
    }

    #[test]
    fn test_enroll_failures() {
        let ledger = ledger();
        assert!(ledger.enroll("RG1", "Underwater License").unwrap_err().is_not_found());
        assert!(ledger.enroll("RG9", "License A").unwrap_err().is_not_found());

        ledger.enroll("RG1", "License A").unwrap();
        assert!(ledger.enroll("RG1", "License A").unwrap_err().is_already_exists());
        assert!(ledger
            .set_enrollment_status("RG1", "License C", EnrollmentStatus::Approved)
            .unwrap_err()
            .is_not_found());
    }
}
