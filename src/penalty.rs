//! Penalty engine: recidivism, fine escalation and point-driven license
//! status.
//!
//! The engine is pure. It never touches storage; the ledger feeds it the
//! number of prior same-code citations inside the window and applies the
//! answer within its own transaction.

use crate::config::RulesConfig;
use crate::driver::LicenseStatus;
use crate::error::{LedgerError, Result};
use crate::money::Money;
use chrono::{DateTime, Duration, Utc};

/// Outcome of assessing one infraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    /// Amount to charge.
    pub amount: Money,

    /// Whether a prior citation with the same code fell inside the window.
    pub repeat_offense: bool,

    /// Points the citation carries.
    pub points: u32,
}

/// Decision logic for fines and license status.
///
/// # Invariants
///
/// - The charged amount is `base` or exactly `2 * base`, never any other
///   multiple, however many priors exist.
/// - `status_after` is a function of the point total alone, except that
///   `cancelled` is never left and totals below the suspension threshold
///   leave the current status untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyEngine {
    suspension_threshold: u32,
    revocation_threshold: u32,
    window: Duration,
}

impl PenaltyEngine {
    pub fn new(rules: &RulesConfig) -> Self {
        PenaltyEngine {
            suspension_threshold: rules.suspension_threshold,
            revocation_threshold: rules.revocation_threshold,
            window: Duration::days(i64::from(rules.recidivism_window_days)),
        }
    }

    /// Inclusive lower bound of the recidivism window ending at `now`.
    /// Prior citations count when `window_start(now) <= occurred_at <= now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(self.window).ok_or_else(|| {
            LedgerError::InvalidInput(format!(
                "recidivism window of {} days before {} is out of range",
                self.window.num_days(),
                now
            ))
        })
    }

    /// Any prior occurrence inside the window makes a repeat offense.
    pub fn is_repeat(&self, prior_count: u64) -> bool {
        prior_count > 0
    }

    /// Charged amount for `base`, doubled once for a repeat offense.
    pub fn charge(&self, base: Money, repeat_offense: bool) -> Result<Money> {
        if !repeat_offense {
            return Ok(base);
        }
        base.checked_doubled().ok_or_else(|| {
            LedgerError::InvalidInput(format!("doubling a fine of {} overflows", base))
        })
    }

    /// Assesses a new infraction given the number of prior same-code
    /// citations inside the window.
    pub fn assess(&self, base: Money, points: u32, prior_count: u64) -> Result<Assessment> {
        let repeat_offense = self.is_repeat(prior_count);
        Ok(Assessment {
            amount: self.charge(base, repeat_offense)?,
            repeat_offense,
            points,
        })
    }

    /// License status after the point total became `points`.
    pub fn status_after(&self, current: LicenseStatus, points: u32) -> LicenseStatus {
        if current.is_terminal() {
            return current;
        }
        if points >= self.revocation_threshold {
            LicenseStatus::Revoked
        } else if points >= self.suspension_threshold {
            LicenseStatus::Suspended
        } else {
            current
        }
    }

    /// Status a driver ends up in when a license is issued.
    ///
    /// With `reactivate` set, issuing always restores `active` (a cancelled
    /// driver included, since issuance is an explicit authority action).
    /// Without it, only an `inactive` driver becomes `active`.
    pub fn status_on_issue(&self, current: LicenseStatus, reactivate: bool) -> LicenseStatus {
        if reactivate || current == LicenseStatus::Inactive {
            LicenseStatus::Active
        } else {
            current
        }
    }
}
