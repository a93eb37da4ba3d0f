//! Durable ledger of drivers, licenses, vehicles, citations and the
//! supporting records around them.
//!
//! The ledger owns a single SQLite connection behind a mutex. Every public
//! operation takes the lock and runs inside one `IMMEDIATE` transaction, so
//! writes are serialized and composite operations such as
//! [`Ledger::record_citation`] are all-or-nothing: an error anywhere rolls
//! back every statement issued by that call.

mod citations;
mod courses;
mod drivers;
mod reports;
mod schema;
mod staff;
mod vehicles;

pub use reports::{AgentReport, InfractionCount};

use crate::clock::{Clock, SystemClock};
use crate::config::RulesConfig;
use crate::error::{LedgerError, Result};
use crate::penalty::PenaltyEngine;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The traffic authority's ledger.
///
/// `Ledger` is `Send + Sync`; share it between callers with an `Arc`.
pub struct Ledger {
    conn: Mutex<Connection>,
    rules: RulesConfig,
    engine: PenaltyEngine,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Opens (or creates) a ledger stored in the SQLite file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, rules: RulesConfig) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening ledger at {}", path.display());
        Self::from_connection(Connection::open(path)?, rules)
    }

    /// Creates a ledger that lives only as long as the process.
    pub fn in_memory(rules: RulesConfig) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, rules)
    }

    fn from_connection(conn: Connection, rules: RulesConfig) -> Result<Self> {
        rules.validate()?;
        schema::init(&conn)?;
        let engine = PenaltyEngine::new(&rules);
        Ok(Ledger {
            conn: Mutex::new(conn),
            rules,
            engine,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used for citation timestamps, issue dates and the
    /// recidivism window.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn engine(&self) -> &PenaltyEngine {
        &self.engine
    }

    /// Current instant according to the ledger's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs `f` inside a write transaction, committing only if it succeeds.
    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` against a consistent snapshot.
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&*tx)?;
        tx.finish()?;
        Ok(value)
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 8, 15, 30).unwrap();
        assert_eq!(from_millis(0, to_millis(at)).unwrap(), at);
    }

    #[test]
    fn test_rejects_invalid_rules() {
        let rules = RulesConfig {
            revocation_threshold: 5,
            ..RulesConfig::default()
        };
        assert!(matches!(
            Ledger::in_memory(rules),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = Ledger::open(&path, RulesConfig::default()).unwrap();
            ledger.create_driver("RG1", "Ana", None).unwrap();
        }

        let ledger = Ledger::open(&path, RulesConfig::default()).unwrap();
        assert_eq!(ledger.get_driver("RG1").unwrap().name, "Ana");
    }

    #[test]
    fn test_ledger_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Ledger>();
    }
}
