//! Expired batches that still hold stock.

use std::collections::BTreeSet;

use serde::Serialize;

use medstock_core::{LocationCode, MedicationId, StockDate};

use crate::balance::StockAggregator;
use crate::movement::StockMovement;

/// A batch past its expiry with a positive balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredBatch {
    pub location: LocationCode,
    pub medication_id: MedicationId,
    pub expiry: StockDate,
    pub quantity: i64,
}

/// Batches whose expiry is before `as_of` and whose balance (as of `as_of`) is positive.
///
/// One line per batch, in the order the batch was first received. Read-only.
pub fn find_expired_with_stock(movements: &[StockMovement], as_of: StockDate) -> Vec<ExpiredBatch> {
    let detailed = StockAggregator::new(movements).as_of(as_of).detailed_balance();
    let mut seen = BTreeSet::new();

    movements
        .iter()
        .filter(|m| m.is_receipt())
        .filter_map(|m| m.expiry.map(|expiry| (m, expiry)))
        .filter(|(_, expiry)| *expiry < as_of)
        .filter_map(|(m, expiry)| {
            let quantity = detailed.get(&m.location, m.medication_id, expiry);
            let first_time = seen.insert((&m.location, m.medication_id, expiry));
            (quantity > 0 && first_time).then(|| ExpiredBatch {
                location: m.location.clone(),
                medication_id: m.medication_id,
                expiry,
                quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::test_support::movement;
    use crate::movement::Nature::{Receipt, Withdrawal};

    fn date(s: &str) -> StockDate {
        StockDate::parse(s).unwrap()
    }

    #[test]
    fn reports_expired_batches_with_remaining_stock() {
        let movements = vec![
            movement(1, "01/01/2024", 1, Receipt, "A0001", Some("01/06/2024"), 50),
            movement(2, "02/01/2024", 2, Receipt, "B0001", Some("01/06/2024"), 20),
            movement(3, "03/01/2024", 2, Withdrawal, "B0001", None, 20),
            movement(4, "04/01/2024", 1, Receipt, "C0001", Some("01/01/2030"), 10),
            movement(5, "05/01/2024", 1, Withdrawal, "A0001", None, 15),
        ];

        let expired = find_expired_with_stock(&movements, date("16/10/2026"));
        assert_eq!(
            expired,
            vec![ExpiredBatch {
                location: LocationCode::parse("A0001").unwrap(),
                medication_id: MedicationId::new(1),
                expiry: date("01/06/2024"),
                quantity: 35,
            }]
        );
    }

    #[test]
    fn batch_expiring_on_as_of_day_is_not_expired() {
        let movements = vec![movement(1, "01/01/2024", 1, Receipt, "A0001", Some("01/06/2024"), 5)];
        assert!(find_expired_with_stock(&movements, date("01/06/2024")).is_empty());
        assert_eq!(find_expired_with_stock(&movements, date("02/06/2024")).len(), 1);
    }

    #[test]
    fn restocked_batch_is_reported_once() {
        let movements = vec![
            movement(1, "01/01/2024", 1, Receipt, "A0001", Some("01/06/2024"), 5),
            movement(2, "02/01/2024", 1, Receipt, "A0001", Some("01/06/2024"), 5),
        ];
        let expired = find_expired_with_stock(&movements, date("01/01/2025"));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].quantity, 10);
    }

    #[test]
    fn movements_after_as_of_are_ignored() {
        let movements = vec![
            movement(1, "01/01/2024", 1, Receipt, "A0001", Some("01/02/2024"), 5),
            movement(2, "01/03/2024", 1, Withdrawal, "A0001", None, 5),
        ];
        assert_eq!(find_expired_with_stock(&movements, date("15/02/2024")).len(), 1);
        assert!(find_expired_with_stock(&movements, date("15/03/2024")).is_empty());
    }
}
