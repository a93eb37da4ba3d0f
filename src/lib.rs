//! # Traffic Ledger
//!
//! The rules engine and durable ledger behind a role-playing-game traffic
//! authority: drivers and their licenses, vehicles, citations, payments,
//! staff and training courses.
//!
//! ## Design Principles
//!
//! - **Penalty points drive license status**: every citation adds its points
//!   and the status is re-derived from the total (`suspended` at 20,
//!   `revoked` at 30 by default); `cancelled` is never overwritten.
//! - **Recidivism doubles the fine**: a prior citation with the same code in
//!   the trailing window (365 days by default) charges exactly twice the
//!   base amount, never more.
//! - **Atomic citations**: history scan, insert and point update commit
//!   together or not at all.
//! - **Injected rules**: thresholds and tables come from [`RulesConfig`],
//!   never from globals.
//!
//! ## Example
//!
//! ```
//! use traffic_ledger::{Ledger, LicenseCategory, LicenseStatus, RulesConfig};
//!
//! let ledger = Ledger::in_memory(RulesConfig::default()).unwrap();
//! ledger.create_driver("RG1", "Ana", None).unwrap();
//! ledger.issue_license("RG1", LicenseCategory::B).unwrap();
//!
//! let first = ledger.record_infraction("RG1", None, "agent7", "recusa_bafometro").unwrap();
//! assert_eq!(first.citation.amount.to_string(), "1000.00");
//!
//! let second = ledger.record_infraction("RG1", None, "agent7", "recusa_bafometro").unwrap();
//! assert_eq!(second.citation.amount.to_string(), "2000.00");
//! assert_eq!(second.driver.points, 20);
//! assert_eq!(second.driver.status, LicenseStatus::Suspended);
//! ```

#[macro_use]
mod macros;

pub mod citation;
pub mod clock;
pub mod config;
pub mod course;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod money;
pub mod penalty;
pub mod replay;
pub mod staff;
pub mod validate;
pub mod vehicle;

pub use citation::{Citation, CitationStatus, NewCitation, Payment, RecordedCitation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Infraction, RulesConfig, ServiceFee};
pub use course::{Course, Enrollment, EnrollmentStatus};
pub use driver::{Driver, License, LicenseCategory, LicenseStatus};
pub use error::{LedgerError, Result};
pub use ledger::{AgentReport, InfractionCount, Ledger};
pub use money::Money;
pub use penalty::{Assessment, PenaltyEngine};
pub use replay::{Operation, OperationRecord, Replay};
pub use staff::{StaffMember, StaffRole};
pub use vehicle::{Vehicle, VehicleAttributes, VehicleStatus};
