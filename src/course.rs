//! Training courses and driver enrollments.

use crate::error::LedgerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A course offered by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub theory_hours: u32,
    pub practice_hours: u32,
    pub requirements: String,
}

/// Courses seeded into every new ledger: (name, theory hours, practice
/// hours, approval requirements).
pub const DEFAULT_COURSES: [(&str, u32, u32, &str); 7] = [
    (
        "License A",
        60,
        30,
        "Theory exam (at least 7 of 10 correct) + practical course without falls",
    ),
    (
        "License B",
        60,
        60,
        "Theory exam (at least 70% correct) + practical course without infractions",
    ),
    (
        "License C",
        60,
        90,
        "Theory exam (at least 8 of 10 correct) + practical test without infractions",
    ),
    (
        "License D",
        60,
        90,
        "Theory exam (at least 8 of 10 correct) + practical test without infractions",
    ),
    (
        "License E",
        60,
        90,
        "Theory exam (at least 8 of 10 correct) + practical test without infractions",
    ),
    (
        "Nautical License",
        45,
        30,
        "Theory exam (at least 6 correct) + practical navigation without collisions",
    ),
    (
        "Aerial License",
        90,
        60,
        "Theory exam (at least 8 correct) + safe and controlled practical flight",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    InProgress,
    Approved,
    Failed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::InProgress => "in_progress",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Failed => "failed",
        }
    }

    /// An enrollment is graded once: `in_progress -> approved | failed`.
    pub fn can_transition_to(&self, next: EnrollmentStatus) -> bool {
        *self == EnrollmentStatus::InProgress && next != EnrollmentStatus::InProgress
    }
}

impl FromStr for EnrollmentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in_progress" => Ok(EnrollmentStatus::InProgress),
            "approved" => Ok(EnrollmentStatus::Approved),
            "failed" => Ok(EnrollmentStatus::Failed),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown enrollment status '{}'",
                other
            ))),
        }
    }
}

text_column!(EnrollmentStatus);

/// A driver's participation in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub driver_id: String,
    pub course_id: i64,
    pub course_name: String,
    pub enrolled_on: NaiveDate,
    pub status: EnrollmentStatus,
}
