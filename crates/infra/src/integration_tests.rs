//! Integration tests for the full recording pipeline.
//!
//! Tests: MovementDraft → ValidationGate → MovementLedger → LedgerStore → queries
//!
//! Verifies:
//! - Operator scenarios produce the expected balances and rejections
//! - Stored ledgers reload through replay validation
//! - Failed saves never roll back the in-memory ledger
//! - Reloading replaces whatever was in memory
//! - Concurrent withdrawals never overdraw a location

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use medstock_catalog::{InMemoryCatalog, NewMedication};
    use medstock_core::{FixedClock, LocationCode, MedicationId, MovementId, StockDate};
    use medstock_inventory::{Demand, MovementDraft, Nature, RejectionKind, StockMovement};

    use crate::executor::WithdrawalExecutor;
    use crate::ledger_store::{CsvLedgerStore, InMemoryLedgerStore, LedgerStore, RowFault};
    use crate::service::{ServiceError, StockService};

    type TestService<S> = StockService<S, InMemoryCatalog, FixedClock>;

    const PARACETAMOL: MedicationId = MedicationId::new(1);
    const DIPIRONA: MedicationId = MedicationId::new(2);
    const INSULINA: MedicationId = MedicationId::new(3);

    fn date(s: &str) -> StockDate {
        StockDate::parse(s).unwrap()
    }

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add(NewMedication::named("Paracetamol"));
        catalog.add(NewMedication::named("Dipirona"));
        catalog.add(NewMedication::named("Insulina NPH").refrigerated(true));
        catalog
    }

    fn service_at<S: LedgerStore>(store: S, today: &str) -> TestService<S> {
        StockService::new(store, catalog(), FixedClock(date(today)))
    }

    fn setup() -> (TestService<Arc<InMemoryLedgerStore>>, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        (service_at(store.clone(), "10/01/2025"), store)
    }

    fn rejection_kind(err: ServiceError) -> RejectionKind {
        match err {
            ServiceError::Rejected(rejection) => rejection.kind(),
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    fn stored(id: u64, date_: &str, med: MedicationId, nature: Nature, loc: &str, expiry: Option<&str>, qty: u32) -> StockMovement {
        StockMovement {
            id: MovementId::new(id),
            date: date(date_),
            medication_id: med,
            nature,
            location: LocationCode::parse(loc).unwrap(),
            expiry: expiry.map(date),
            quantity: qty,
        }
    }

    #[test]
    fn exclusive_location_and_availability() {
        let (service, store) = setup();

        let first = service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 100))
            .unwrap();
        assert_eq!(first.id, MovementId::new(1));

        let conflict = service
            .record(&MovementDraft::receipt("02/01/2025", DIPIRONA, "A0001", "01/01/2030", 10))
            .unwrap_err();
        assert_eq!(rejection_kind(conflict), RejectionKind::LocationConflict);

        service
            .record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 30))
            .unwrap();
        let balance = service.balance_by_medication(None).unwrap();
        assert_eq!(balance.get(&PARACETAMOL), Some(&70));

        let short = service
            .record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 80))
            .unwrap_err();
        assert_eq!(rejection_kind(short), RejectionKind::InsufficientStock);

        // Rejections leave ledger and store untouched.
        assert_eq!(service.snapshot().unwrap().len(), 2);
        assert_eq!(store.saved().unwrap().len(), 2);
    }

    #[test]
    fn refrigerated_medication_needs_refrigerated_location() {
        let (service, _) = setup();

        let err = service
            .record(&MovementDraft::receipt("05/01/2025", INSULINA, "A0002", "01/01/2026", 5))
            .unwrap_err();
        assert_eq!(rejection_kind(err), RejectionKind::RefrigerationViolation);

        service
            .record(&MovementDraft::receipt("05/01/2025", INSULINA, "G0002", "01/01/2026", 5))
            .unwrap();
    }

    #[test]
    fn fefo_plan_then_execute() {
        let (service, _) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/06/2025", 20))
            .unwrap();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "B0002", "01/07/2025", 40))
            .unwrap();

        let plan = service.plan(&Demand::from([(PARACETAMOL, 50)])).unwrap();
        let lines: Vec<_> = plan
            .lines
            .iter()
            .map(|l| (l.location.as_str(), l.quantity, l.expiry.to_string()))
            .collect();
        assert_eq!(
            lines,
            vec![("A0001", 20, "01/06/2025".to_string()), ("B0002", 30, "01/07/2025".to_string())]
        );
        assert_eq!(plan.shortfall(PARACETAMOL), 0);

        let report = WithdrawalExecutor::new(&service).execute_plan(&plan);
        assert!(report.all_recorded());

        let detailed = service.detailed_balance(None).unwrap();
        let b0002 = LocationCode::parse("B0002").unwrap();
        assert_eq!(detailed.get(&b0002, PARACETAMOL, date("01/07/2025")), 10);
        assert_eq!(service.balance_by_medication(None).unwrap().get(&PARACETAMOL), Some(&10));
    }

    #[test]
    fn execution_revalidates_each_line() {
        let (service, _) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/06/2025", 20))
            .unwrap();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "B0002", "01/07/2025", 40))
            .unwrap();
        let plan = service.plan(&Demand::from([(PARACETAMOL, 50)])).unwrap();

        // Someone else empties most of B0002 between planning and execution.
        service
            .record(&MovementDraft::withdrawal("10/01/2025", PARACETAMOL, "B0002", 35))
            .unwrap();

        let report = WithdrawalExecutor::new(&service).execute_plan(&plan);

        assert_eq!(report.recorded().count(), 1);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.location.as_str(), "B0002");
        assert!(matches!(
            failures[0].1,
            ServiceError::Rejected(r) if r.kind() == RejectionKind::InsufficientStock
        ));
    }

    #[test]
    fn failed_save_keeps_movement_in_memory() {
        let (service, store) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 10))
            .unwrap();

        store.set_fail_saves(true);
        let err = service
            .record(&MovementDraft::withdrawal("02/01/2025", PARACETAMOL, "A0001", 4))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Persistence { id, .. } if id == MovementId::new(2)));
        assert_eq!(service.snapshot().unwrap().len(), 2);
        assert_eq!(store.saved().unwrap().len(), 1);

        store.set_fail_saves(false);
        service
            .record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 1))
            .unwrap();
        assert_eq!(store.saved().unwrap().len(), 3);
        assert_eq!(service.balance_by_medication(None).unwrap().get(&PARACETAMOL), Some(&5));
    }

    #[test]
    fn load_replays_and_discards_invalid_rows() {
        let store = InMemoryLedgerStore::with_movements(vec![
            // Expired since it was recorded: kept on replay.
            stored(1, "01/01/2024", PARACETAMOL, Nature::Receipt, "A0001", Some("01/06/2024"), 10),
            stored(2, "02/01/2024", PARACETAMOL, Nature::Withdrawal, "A0001", None, 50),
            stored(1, "03/01/2024", DIPIRONA, Nature::Receipt, "B0001", Some("01/01/2030"), 5),
            stored(5, "04/01/2024", MedicationId::new(99), Nature::Receipt, "C0001", Some("01/01/2030"), 5),
            stored(7, "05/01/2024", DIPIRONA, Nature::Receipt, "D0001", Some("01/01/2030"), 8),
        ]);
        let service = service_at(store, "10/01/2025");

        let report = service.load().unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.discarded, 3);
        let lines: Vec<_> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(matches!(report.errors[1].fault, RowFault::Ledger(_)));
        assert!(matches!(&report.errors[2].fault, RowFault::Rejected(r) if r.kind() == RejectionKind::UnknownMedication));

        let next = service
            .record(&MovementDraft::withdrawal("10/01/2025", DIPIRONA, "D0001", 3))
            .unwrap();
        assert_eq!(next.id, MovementId::new(8));
        assert_eq!(service.expired_count(None).unwrap(), 1);
    }

    #[test]
    fn csv_ledger_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist_estoque.csv");

        let first = service_at(CsvLedgerStore::new(&path), "10/01/2025");
        first.load().unwrap();
        first
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 100))
            .unwrap();
        first
            .record(&MovementDraft::receipt("02/01/2025", INSULINA, "G0001", "01/03/2025", 12))
            .unwrap();
        first
            .record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 30))
            .unwrap();
        let before = first.snapshot().unwrap();
        drop(first);

        // Later: the insulin batch has expired, the ledger still loads in full.
        let second = service_at(CsvLedgerStore::new(&path), "01/04/2025");
        let report = second.load().unwrap();
        assert_eq!(report.loaded, 3);
        assert_eq!(report.discarded, 0);
        assert_eq!(second.snapshot().unwrap(), before);

        let expired = second.expired(None).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].medication_id, INSULINA);
        assert_eq!(expired[0].quantity, 12);

        let moved = second
            .record(&MovementDraft::withdrawal("01/04/2025", PARACETAMOL, "A0001", 10))
            .unwrap();
        assert_eq!(moved.id, MovementId::new(4));
    }

    #[test]
    fn dispose_expired_withdraws_each_batch() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let early = service_at(store.clone(), "10/01/2025");
        early
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/06/2025", 20))
            .unwrap();
        early
            .record(&MovementDraft::receipt("01/01/2025", INSULINA, "G0001", "01/05/2025", 6))
            .unwrap();
        early
            .record(&MovementDraft::receipt("01/01/2025", DIPIRONA, "B0001", "01/01/2030", 9))
            .unwrap();

        let later = service_at(store.clone(), "01/08/2025");
        later.load().unwrap();
        assert_eq!(later.expired_count(None).unwrap(), 2);

        let report = WithdrawalExecutor::new(&later).dispose_expired(None).unwrap();

        assert!(report.all_recorded());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(later.expired_count(None).unwrap(), 0);
        let balance = later.balance_by_medication(None).unwrap();
        assert_eq!(balance.get(&PARACETAMOL), Some(&0));
        assert_eq!(balance.get(&DIPIRONA), Some(&9));
        assert_eq!(store.saved().unwrap().len(), 5);
    }

    #[test]
    fn history_and_purge() {
        let (service, store) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 10))
            .unwrap();
        service
            .record(&MovementDraft::receipt("05/01/2025", DIPIRONA, "B0001", "01/01/2030", 10))
            .unwrap();
        service
            .record(&MovementDraft::withdrawal("08/01/2025", DIPIRONA, "B0001", 2))
            .unwrap();

        let window = service
            .history(Some(date("02/01/2025")), Some(date("08/01/2025")))
            .unwrap();
        let ids: Vec<_> = window.iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(service.history(None, None).unwrap().len(), 3);
        assert!(matches!(
            service.history(Some(date("09/01/2025")), Some(date("01/01/2025"))),
            Err(ServiceError::Domain(_))
        ));

        let removed = service.purge(MovementId::new(3)).unwrap();
        assert_eq!(removed.quantity, 2);
        assert_eq!(store.saved().unwrap().len(), 2);
        assert!(matches!(service.purge(MovementId::new(3)), Err(ServiceError::Ledger(_))));

        // Identifiers are not reused after a purge.
        let next = service
            .record(&MovementDraft::withdrawal("09/01/2025", DIPIRONA, "B0001", 1))
            .unwrap();
        assert_eq!(next.id, MovementId::new(4));
    }

    #[test]
    fn concurrent_withdrawals_never_overdraw() {
        let (service, store) = setup();
        service
            .record(&MovementDraft::receipt("10/01/2025", PARACETAMOL, "A0001", "01/01/2030", 100))
            .unwrap();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                thread::spawn(move || {
                    (0..10)
                        .filter(|_| {
                            service
                                .record(&MovementDraft::withdrawal("10/01/2025", PARACETAMOL, "A0001", 3))
                                .is_ok()
                        })
                        .count()
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(accepted, 33);
        assert_eq!(service.balance_by_medication(None).unwrap().get(&PARACETAMOL), Some(&1));
        let ids: Vec<_> = store.saved().unwrap().iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, (1..=34).collect::<Vec<_>>());
    }

    #[test]
    fn current_stock_lists_positive_lines() {
        let (service, _) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 10))
            .unwrap();
        service
            .record(&MovementDraft::receipt("01/01/2025", DIPIRONA, "B0001", "01/01/2030", 4))
            .unwrap();
        service
            .record(&MovementDraft::withdrawal("02/01/2025", DIPIRONA, "B0001", 4))
            .unwrap();

        let stock = service.current_stock(None).unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].medication_id, PARACETAMOL);
        assert_eq!(stock[0].latest_expiry, Some(date("01/01/2030")));

        let as_of_first_day = service.balance_by_location(Some(date("01/01/2025"))).unwrap();
        let b0001 = LocationCode::parse("B0001").unwrap();
        assert_eq!(as_of_first_day[&b0001].get(&DIPIRONA), Some(&4));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Receive { med: u32, loc: usize, expiry_year: u16, qty: u32 },
        Withdraw { med: u32, loc: usize, tag: Option<u16>, qty: u32 },
    }

    const LOCATIONS: [&str; 3] = ["A0001", "G0001", "B0002"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..=3, 0usize..3, 2026u16..=2028, 1u32..40)
                .prop_map(|(med, loc, expiry_year, qty)| Op::Receive { med, loc, expiry_year, qty }),
            (1u32..=3, 0usize..3, prop::option::of(2026u16..=2028), 1u32..50)
                .prop_map(|(med, loc, tag, qty)| Op::Withdraw { med, loc, tag, qty }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: every movement accepted live is accepted again on reload, even
        /// after all batches have expired, with identical identifiers and balances.
        #[test]
        fn accepted_ledger_reloads_unchanged(ops in prop::collection::vec(op_strategy(), 1..30)) {
            let store = Arc::new(InMemoryLedgerStore::new());
            let live = service_at(store.clone(), "31/01/2025");

            for (i, op) in ops.iter().enumerate() {
                let date = format!("{:02}/01/2025", i + 1);
                let draft = match *op {
                    Op::Receive { med, loc, expiry_year, qty } => MovementDraft::receipt(
                        date,
                        MedicationId::new(med),
                        LOCATIONS[loc],
                        format!("01/06/{expiry_year}"),
                        qty,
                    ),
                    Op::Withdraw { med, loc, tag, qty } => {
                        let draft = MovementDraft::withdrawal(date, MedicationId::new(med), LOCATIONS[loc], qty);
                        match tag {
                            Some(year) => draft.with_expiry(format!("01/06/{year}")),
                            None => draft,
                        }
                    }
                };
                let _ = live.record(&draft);
            }

            // Planning can take everything in stock and never more.
            let balance = live.balance_by_medication(None).unwrap();
            let demand: Demand = (1..=3).map(|med| (MedicationId::new(med), 10_000)).collect();
            let plan = live.plan(&demand).unwrap();
            for med in demand.keys() {
                let on_hand = balance.get(med).copied().unwrap_or(0);
                prop_assert_eq!(i64::from(plan.allocated(*med)), on_hand);
            }

            let reloaded = service_at(store.clone(), "01/01/2031");
            let report = reloaded.load().unwrap();

            prop_assert_eq!(report.discarded, 0);
            prop_assert_eq!(reloaded.snapshot().unwrap(), live.snapshot().unwrap());
            prop_assert_eq!(
                reloaded.balance_by_medication(None).unwrap(),
                live.balance_by_medication(None).unwrap()
            );
        }
    }

    #[test]
    fn tagged_withdrawal_of_unknown_batch_is_rejected() {
        let (service, _) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 10))
            .unwrap();

        let err = service
            .record(&MovementDraft::withdrawal("02/01/2025", PARACETAMOL, "A0001", 10).with_expiry("01/01/2031"))
            .unwrap_err();
        assert_eq!(rejection_kind(err), RejectionKind::InsufficientStock);

        service
            .record(&MovementDraft::withdrawal("02/01/2025", PARACETAMOL, "A0001", 10).with_expiry("01/01/2030"))
            .unwrap();
        let plan = service.plan(&Demand::from([(PARACETAMOL, 5)])).unwrap();
        assert!(plan.lines.is_empty());
        assert_eq!(plan.shortfall(PARACETAMOL), 5);
        service
            .record(&MovementDraft::receipt("03/01/2025", DIPIRONA, "A0001", "01/01/2029", 4))
            .unwrap();
    }

    #[test]
    fn reloading_replaces_what_was_in_memory() {
        let (service, store) = setup();
        service
            .record(&MovementDraft::receipt("01/01/2025", PARACETAMOL, "A0001", "01/01/2030", 10))
            .unwrap();
        service
            .record(&MovementDraft::withdrawal("02/01/2025", PARACETAMOL, "A0001", 3))
            .unwrap();

        let first = service.load().unwrap();
        assert_eq!(first.replaced, 2);
        assert_eq!(first.loaded, 2);

        // Unsaved movement is dropped by the next reload.
        store.set_fail_saves(true);
        let _ = service.record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 1));
        store.set_fail_saves(false);

        let second = service.load().unwrap();
        assert_eq!(second.replaced, 3);
        assert_eq!(second.loaded, 2);
        assert_eq!(second.discarded, 0);
        assert_eq!(service.snapshot().unwrap(), store.saved().unwrap());

        let next = service
            .record(&MovementDraft::withdrawal("03/01/2025", PARACETAMOL, "A0001", 1))
            .unwrap();
        assert_eq!(next.id, MovementId::new(3));
    }
}
