//! Scenario tests for the ledger: recidivism, point accrual, license status
//! and citation lifecycle, driven through the public API.

use chrono::{Duration, TimeZone, Utc};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use traffic_ledger::{
    CitationStatus, Clock, Ledger, LedgerError, LicenseCategory, LicenseStatus, ManualClock, Money,
    NewCitation, RecordedCitation, RulesConfig, VehicleAttributes,
};

fn dec(s: &str) -> Money {
    Money::from_str(s).unwrap()
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Ledger on a manual clock with one licensed driver, `D1`.
fn setup() -> (Ledger, ManualClock) {
    let clock = ManualClock::new(start());
    let ledger = Ledger::in_memory(RulesConfig::default())
        .unwrap()
        .with_clock(clock.clone());
    ledger.create_driver("D1", "Driver One", None).unwrap();
    ledger.issue_license("D1", LicenseCategory::B).unwrap();
    (ledger, clock)
}

fn cite(ledger: &Ledger, driver: &str, code: &str, base: &str, points: u32) -> RecordedCitation {
    ledger
        .record_citation(NewCitation {
            driver_id: driver.to_string(),
            vehicle_plate: None,
            agent_id: "A1".to_string(),
            infraction_code: code.to_string(),
            base_amount: dec(base),
            points,
        })
        .unwrap()
}

// ==================== RECIDIVISM ====================

#[test]
fn test_first_citation_charges_base() {
    let (ledger, _) = setup();

    let r = cite(&ledger, "D1", "X", "100.0", 5);
    assert_eq!(r.citation.amount, dec("100.00"));
    assert!(!r.citation.repeat_offense);
    assert_eq!(r.citation.status, CitationStatus::Pending);
    assert_eq!(r.driver.points, 5);
    assert_eq!(r.driver.status, LicenseStatus::Active);
}

#[test]
fn test_second_within_window_doubles() {
    let (ledger, clock) = setup();

    cite(&ledger, "D1", "X", "100.0", 5);
    clock.advance(Duration::days(30));
    let r = cite(&ledger, "D1", "X", "100.0", 5);

    assert_eq!(r.citation.amount, dec("200.00"));
    assert_eq!(r.citation.base_amount, dec("100.00"));
    assert!(r.citation.repeat_offense);
    assert_eq!(r.driver.points, 10);
    assert_eq!(ledger.get_driver("D1").unwrap().points, 10);
}

#[test]
fn test_third_within_window_still_only_doubles() {
    let (ledger, clock) = setup();

    cite(&ledger, "D1", "X", "100.0", 1);
    clock.advance(Duration::days(1));
    cite(&ledger, "D1", "X", "100.0", 1);
    clock.advance(Duration::days(1));
    let third = cite(&ledger, "D1", "X", "100.0", 1);

    assert_eq!(third.citation.amount, dec("200.00"));
}

#[test]
fn test_other_code_is_not_a_repeat() {
    let (ledger, _) = setup();

    cite(&ledger, "D1", "X", "100.0", 1);
    let r = cite(&ledger, "D1", "Y", "80.0", 1);
    assert_eq!(r.citation.amount, dec("80.00"));
    assert!(!r.citation.repeat_offense);
}

#[test]
fn test_other_driver_is_not_a_repeat() {
    let (ledger, _) = setup();
    ledger.create_driver("D2", "Driver Two", None).unwrap();

    cite(&ledger, "D1", "X", "100.0", 1);
    let r = cite(&ledger, "D2", "X", "100.0", 1);
    assert_eq!(r.citation.amount, dec("100.00"));
}

#[test]
fn test_window_lower_bound_is_inclusive() {
    let (ledger, clock) = setup();

    cite(&ledger, "D1", "X", "100.0", 1);
    clock.advance(Duration::days(365));
    let r = cite(&ledger, "D1", "X", "100.0", 1);
    assert!(r.citation.repeat_offense);
    assert_eq!(r.citation.amount, dec("200.00"));
}

#[test]
fn test_prior_older_than_window_does_not_count() {
    let (ledger, clock) = setup();

    cite(&ledger, "D1", "X", "100.0", 1);
    clock.advance(Duration::days(365) + Duration::milliseconds(1));
    let r = cite(&ledger, "D1", "X", "100.0", 1);
    assert!(!r.citation.repeat_offense);
    assert_eq!(r.citation.amount, dec("100.00"));
}

#[test]
fn test_configured_window_is_honored() {
    let rules = RulesConfig {
        recidivism_window_days: 30,
        ..RulesConfig::default()
    };
    let clock = ManualClock::new(start());
    let ledger = Ledger::in_memory(rules).unwrap().with_clock(clock.clone());
    ledger.create_driver("D1", "Driver One", None).unwrap();

    cite(&ledger, "D1", "X", "100.0", 1);
    clock.advance(Duration::days(31));
    assert!(!cite(&ledger, "D1", "X", "100.0", 1).citation.repeat_offense);
}

#[test]
fn test_citation_stamped_with_clock() {
    let (ledger, clock) = setup();
    clock.advance(Duration::hours(3));

    let r = cite(&ledger, "D1", "X", "10", 1);
    assert_eq!(r.citation.occurred_at, start() + Duration::hours(3));
    assert_eq!(ledger.get_citation(r.citation.id).unwrap(), r.citation);
}

// ==================== POINTS AND STATUS ====================

#[test]
fn test_points_are_exact_sum_of_citations() {
    let (ledger, clock) = setup();
    ledger.set_license_status("D1", LicenseStatus::Cancelled).unwrap();

    let values = [3, 5, 7, 0, 10, 1, 4];
    for (i, points) in values.iter().enumerate() {
        clock.advance(Duration::minutes(1));
        cite(&ledger, "D1", &format!("CODE{}", i % 3), "50", *points);
    }

    let driver = ledger.get_driver("D1").unwrap();
    let recorded: u32 = ledger
        .citations_for("D1", None)
        .unwrap()
        .iter()
        .map(|c| c.points)
        .sum();
    assert_eq!(driver.points, values.iter().sum::<u32>());
    assert_eq!(driver.points, recorded);
}

#[test]
fn test_crossing_twenty_suspends_immediately() {
    let (ledger, _) = setup();

    assert_eq!(cite(&ledger, "D1", "A", "10", 7).driver.status, LicenseStatus::Active);
    assert_eq!(cite(&ledger, "D1", "B", "10", 7).driver.status, LicenseStatus::Active);
    let r = cite(&ledger, "D1", "C", "999.99", 6);
    assert_eq!(r.driver.points, 20);
    assert_eq!(r.driver.status, LicenseStatus::Suspended);
    assert_eq!(r.citation.amount, dec("999.99"));
}

#[test]
fn test_reaching_thirty_revokes() {
    let (ledger, _) = setup();

    cite(&ledger, "D1", "A", "10", 25);
    let r = cite(&ledger, "D1", "B", "10", 5);
    assert_eq!(r.driver.points, 30);
    assert_eq!(r.driver.status, LicenseStatus::Revoked);
}

#[test]
fn test_nineteen_points_zero_update_keeps_status() {
    let (ledger, _) = setup();

    cite(&ledger, "D1", "A", "10", 19);
    let r = cite(&ledger, "D1", "B", "10", 0);
    assert_eq!(r.driver.points, 19);
    assert_eq!(r.driver.status, LicenseStatus::Active);
}

#[test]
fn test_cancelled_is_terminal_for_citations() {
    let (ledger, _) = setup();
    ledger.set_license_status("D1", LicenseStatus::Cancelled).unwrap();

    let r = cite(&ledger, "D1", "A", "10", 40);
    assert_eq!(r.driver.points, 40);
    assert_eq!(r.driver.status, LicenseStatus::Cancelled);
}

#[test]
fn test_override_below_threshold_survives_citation() {
    let (ledger, _) = setup();
    ledger.set_license_status("D1", LicenseStatus::Suspended).unwrap();

    let r = cite(&ledger, "D1", "A", "10", 2);
    assert_eq!(r.driver.status, LicenseStatus::Suspended);
}

#[test]
fn test_reissue_reactivates_by_default() {
    let (ledger, clock) = setup();
    cite(&ledger, "D1", "A", "10", 22);
    assert_eq!(ledger.get_driver("D1").unwrap().status, LicenseStatus::Suspended);

    clock.advance(Duration::days(1));
    ledger.issue_license("D1", LicenseCategory::B).unwrap();
    let driver = ledger.get_driver("D1").unwrap();
    assert_eq!(driver.status, LicenseStatus::Active);
    assert_eq!(driver.points, 22);
}

#[test]
fn test_reissue_without_reactivation_keeps_suspension() {
    let rules = RulesConfig {
        reactivate_on_issue: false,
        ..RulesConfig::default()
    };
    let ledger = Ledger::in_memory(rules)
        .unwrap()
        .with_clock(ManualClock::new(start()));
    ledger.create_driver("D1", "Driver One", None).unwrap();
    ledger.issue_license("D1", LicenseCategory::A).unwrap();
    assert_eq!(ledger.get_driver("D1").unwrap().status, LicenseStatus::Active);

    cite(&ledger, "D1", "A", "10", 21);
    ledger.issue_license("D1", LicenseCategory::B).unwrap();
    assert_eq!(ledger.get_driver("D1").unwrap().status, LicenseStatus::Suspended);
}

// ==================== FAILURES LEAVE NO STATE ====================

#[test]
fn test_unknown_driver_persists_nothing() {
    let (ledger, _) = setup();

    let err = ledger
        .record_citation(NewCitation {
            driver_id: "GHOST".to_string(),
            vehicle_plate: None,
            agent_id: "A1".to_string(),
            infraction_code: "X".to_string(),
            base_amount: dec("100"),
            points: 5,
        })
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ledger.agent_report("A1").unwrap().citations, 0);
}

#[test]
fn test_unknown_plate_rolls_back() {
    let (ledger, _) = setup();

    let err = ledger
        .record_citation(NewCitation {
            driver_id: "D1".to_string(),
            vehicle_plate: Some("ZZZ0000".to_string()),
            agent_id: "A1".to_string(),
            infraction_code: "X".to_string(),
            base_amount: dec("100"),
            points: 5,
        })
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ledger.get_driver("D1").unwrap().points, 0);
    assert!(ledger.citations_for("D1", None).unwrap().is_empty());
}

#[test]
fn test_point_overflow_rolls_back_citation() {
    let (ledger, _) = setup();
    ledger.adjust_points("D1", u32::MAX - 1).unwrap();

    let err = ledger
        .record_citation(NewCitation {
            driver_id: "D1".to_string(),
            vehicle_plate: None,
            agent_id: "A1".to_string(),
            infraction_code: "X".to_string(),
            base_amount: dec("100"),
            points: 5,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert!(ledger.citations_for("D1", None).unwrap().is_empty());
    assert_eq!(ledger.get_driver("D1").unwrap().points, u32::MAX - 1);
}

#[test]
fn test_negative_amount_rejected() {
    let (ledger, _) = setup();

    let err = ledger
        .record_citation(NewCitation {
            driver_id: "D1".to_string(),
            vehicle_plate: None,
            agent_id: "A1".to_string(),
            infraction_code: "X".to_string(),
            base_amount: dec("-100"),
            points: 5,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}

#[test]
fn test_unknown_infraction_code() {
    let (ledger, _) = setup();
    let err = ledger
        .record_infraction("D1", None, "A1", "flying_too_low")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_record_infraction_uses_table_and_vehicle() {
    let (ledger, _) = setup();
    ledger
        .register_vehicle("D1", "abc1d23", VehicleAttributes::default().model("Sultan"))
        .unwrap();

    let r = ledger
        .record_infraction("D1", Some("abc1d23"), "A1", "excesso_velocidade_medio")
        .unwrap();
    assert_eq!(r.citation.amount, dec("300.00"));
    assert_eq!(r.citation.points, 5);
    assert_eq!(r.citation.vehicle_plate.as_deref(), Some("ABC1D23"));
}

// ==================== CITATION LIFECYCLE ====================

#[test]
fn test_pay_writes_one_payment() {
    let (ledger, clock) = setup();
    cite(&ledger, "D1", "X", "100", 1);
    let repeat = cite(&ledger, "D1", "X", "100", 1);

    clock.advance(Duration::days(2));
    let paid = ledger
        .set_citation_status(repeat.citation.id, CitationStatus::Paid)
        .unwrap();
    assert_eq!(paid.status, CitationStatus::Paid);

    let payments = ledger.payments_for("D1").unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].citation_id, Some(repeat.citation.id));
    assert_eq!(payments[0].service_code, None);
    assert_eq!(payments[0].amount, dec("200.00"));
    assert_eq!(payments[0].paid_at, start() + Duration::days(2));

    let err = ledger
        .set_citation_status(repeat.citation.id, CitationStatus::Paid)
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(ledger.payments_for("D1").unwrap().len(), 1);
}

#[test]
fn test_no_transition_out_of_final_states() {
    let (ledger, _) = setup();
    let a = cite(&ledger, "D1", "X", "10", 1).citation.id;
    let b = cite(&ledger, "D1", "Y", "10", 1).citation.id;

    ledger.set_citation_status(a, CitationStatus::Appealed).unwrap();
    ledger.set_citation_status(b, CitationStatus::Paid).unwrap();

    for (id, to) in [
        (a, CitationStatus::Paid),
        (a, CitationStatus::Pending),
        (b, CitationStatus::Appealed),
        (b, CitationStatus::Pending),
    ] {
        assert!(ledger.set_citation_status(id, to).unwrap_err().is_invalid_transition());
    }
    assert_eq!(ledger.get_citation(a).unwrap().status, CitationStatus::Appealed);
    assert_eq!(ledger.get_citation(b).unwrap().status, CitationStatus::Paid);
}

#[test]
fn test_appeal_does_not_refund_points() {
    let (ledger, _) = setup();
    let r = cite(&ledger, "D1", "X", "10", 6);
    ledger
        .set_citation_status(r.citation.id, CitationStatus::Appealed)
        .unwrap();
    assert_eq!(ledger.get_driver("D1").unwrap().points, 6);
}

#[test]
fn test_status_change_unknown_citation() {
    let (ledger, _) = setup();
    assert!(ledger
        .set_citation_status(404, CitationStatus::Paid)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_citations_filtered_by_status() {
    let (ledger, _) = setup();
    let a = cite(&ledger, "D1", "X", "10", 1).citation.id;
    cite(&ledger, "D1", "Y", "10", 1);
    ledger.set_citation_status(a, CitationStatus::Paid).unwrap();

    let pending = ledger
        .citations_for("D1", Some(CitationStatus::Pending))
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].infraction_code, "Y");
    assert_eq!(ledger.citations_for("D1", None).unwrap().len(), 2);
}

// ==================== VEHICLES ====================

#[test]
fn test_duplicate_plate_does_not_alter_existing() {
    let (ledger, _) = setup();
    ledger.create_driver("D2", "Driver Two", None).unwrap();
    let first = ledger
        .register_vehicle(
            "D1",
            "XYZ9876",
            VehicleAttributes::default().model("Banshee").year(2020),
        )
        .unwrap();

    let err = ledger
        .register_vehicle("D2", "xyz9876", VehicleAttributes::default().model("Other"))
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(ledger.get_vehicle("XYZ9876").unwrap(), first);
}

// ==================== REPORTS ====================

#[test]
fn test_agent_report_totals() {
    let (ledger, _) = setup();
    ledger.create_driver("D2", "Driver Two", None).unwrap();

    ledger.record_infraction("D1", None, "A9", "sem_capacete").unwrap();
    ledger.record_infraction("D1", None, "A9", "sem_capacete").unwrap();
    ledger.record_infraction("D2", None, "A9", "estacionamento_proibido").unwrap();
    ledger.record_infraction("D2", None, "B1", "sem_capacete").unwrap();

    let report = ledger.agent_report("A9").unwrap();
    assert_eq!(report.citations, 3);
    assert_eq!(report.total_charged, dec("1250.00"));
    assert_eq!(report.by_infraction[0].infraction_code, "sem_capacete");
    assert_eq!(report.by_infraction[0].count, 2);
    assert_eq!(report.by_infraction[1].infraction_code, "estacionamento_proibido");
}

#[test]
fn test_restricted_drivers_ordering() {
    let (ledger, _) = setup();
    for id in ["D2", "D3", "D4"] {
        ledger.create_driver(id, "Someone", None).unwrap();
    }
    ledger.adjust_points("D1", 21).unwrap();
    ledger.adjust_points("D2", 35).unwrap();
    ledger.set_license_status("D3", LicenseStatus::Cancelled).unwrap();
    ledger.adjust_points("D4", 5).unwrap();

    let ids: Vec<String> = ledger
        .restricted_drivers()
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["D2", "D1", "D3"]);
}

// ==================== CONCURRENCY ====================

#[test]
fn test_concurrent_same_code_citations_serialize() {
    let ledger = Arc::new(Ledger::in_memory(RulesConfig::default()).unwrap());
    ledger.create_driver("D1", "Driver One", None).unwrap();
    ledger.issue_license("D1", LicenseCategory::B).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger
                    .record_citation(NewCitation {
                        driver_id: "D1".to_string(),
                        vehicle_plate: None,
                        agent_id: "A1".to_string(),
                        infraction_code: "X".to_string(),
                        base_amount: Money::from_units(100),
                        points: 1,
                    })
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<RecordedCitation> = workers.into_iter().map(|h| h.join().unwrap()).collect();

    let first_offenses = results.iter().filter(|r| !r.citation.repeat_offense).count();
    assert_eq!(first_offenses, 1);
    for r in &results {
        let expected = if r.citation.repeat_offense { "200.00" } else { "100.00" };
        assert_eq!(r.citation.amount.to_string(), expected);
    }
    assert_eq!(ledger.get_driver("D1").unwrap().points, 8);
}

#[test]
fn test_concurrent_different_drivers_do_not_interfere() {
    let ledger = Arc::new(Ledger::in_memory(RulesConfig::default()).unwrap());
    for i in 0..4 {
        ledger
            .create_driver(&format!("D{}", i), "Driver", None)
            .unwrap();
    }

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..5 {
                    ledger
                        .record_infraction(&format!("D{}", i), None, "A1", "sem_capacete")
                        .unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    for i in 0..4 {
        let driver = ledger.get_driver(&format!("D{}", i)).unwrap();
        assert_eq!(driver.points, 25);
        assert_eq!(driver.status, LicenseStatus::Suspended);
    }
}

/// Moves forward one millisecond on every read.
struct TickingClock {
    ticks: AtomicI64,
}

impl Clock for TickingClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        start() + Duration::milliseconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

#[test]
fn test_concurrent_payments_are_stamped_in_commit_order() {
    let ledger = Ledger::in_memory(RulesConfig::default())
        .unwrap()
        .with_clock(TickingClock {
            ticks: AtomicI64::new(0),
        });
    ledger.create_driver("D1", "Driver One", None).unwrap();
    let ids: Vec<i64> = (0..8)
        .map(|i| cite(&ledger, "D1", &format!("C{}", i), "10", 0).citation.id)
        .collect();

    let ledger = Arc::new(ledger);
    let workers: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger.set_citation_status(id, CitationStatus::Paid).unwrap();
                ledger.pay_service_fee("D1", "renovacao_cnh").unwrap();
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let payments = ledger.payments_for("D1").unwrap();
    assert_eq!(payments.len(), 16);
    for pair in payments.windows(2) {
        assert!(
            pair[0].paid_at < pair[1].paid_at,
            "payment #{} stamped after #{}",
            pair[0].id,
            pair[1].id
        );
    }
}

// ==================== OUT-OF-RANGE INPUT ====================

#[test]
fn test_oversized_window_rejected_at_construction() {
    let rules = RulesConfig {
        recidivism_window_days: u32::MAX,
        ..RulesConfig::default()
    };
    assert!(matches!(
        Ledger::in_memory(rules),
        Err(LedgerError::Config(_))
    ));
}

#[test]
fn test_oversized_fine_rejected_and_ledger_stays_usable() {
    let (ledger, _) = setup();
    let request = |base: &str| NewCitation {
        driver_id: "D1".to_string(),
        vehicle_plate: None,
        agent_id: "A1".to_string(),
        infraction_code: "X".to_string(),
        base_amount: dec(base),
        points: 1,
    };

    let err = ledger
        .record_citation(request("70000000000000000000000000000"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert!(ledger.citations_for("D1", None).unwrap().is_empty());

    // The largest accepted fine still doubles on a repeat.
    ledger.record_citation(request("1000000000000")).unwrap();
    let repeat = ledger.record_citation(request("1000000000000")).unwrap();
    assert_eq!(repeat.citation.amount, dec("2000000000000.00"));
    assert_eq!(
        ledger.agent_report("A1").unwrap().total_charged,
        dec("3000000000000.00")
    );
    assert_eq!(ledger.get_driver("D1").unwrap().points, 2);
}

// ==================== SERVICE FEES ====================

#[test]
fn test_service_fee_payment() {
    let (ledger, clock) = setup();
    clock.advance(Duration::hours(1));

    let payment = ledger.pay_service_fee("D1", "liberacao_veiculo").unwrap();
    assert_eq!(payment.amount, dec("600.00"));
    assert_eq!(payment.service_code.as_deref(), Some("liberacao_veiculo"));
    assert_eq!(payment.citation_id, None);
    assert_eq!(payment.paid_at, start() + Duration::hours(1));
    assert_eq!(ledger.payments_for("D1").unwrap(), vec![payment]);
}

#[test]
fn test_service_fee_failures_record_nothing() {
    let (ledger, _) = setup();

    assert!(ledger
        .pay_service_fee("D1", "free_lunch")
        .unwrap_err()
        .is_not_found());
    assert!(ledger
        .pay_service_fee("GHOST", "renovacao_cnh")
        .unwrap_err()
        .is_not_found());
    assert!(ledger.payments_for("D1").unwrap().is_empty());
}
