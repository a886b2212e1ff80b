//! Point-in-time balances derived by folding the ledger.
//!
//! Every view is a pure function of a movement slice and an optional as-of cutoff;
//! nothing here mutates the ledger. Maps are ordered so repeated calls over the same
//! snapshot yield identical results.

use std::collections::BTreeMap;

use serde::Serialize;

use medstock_core::{LocationCode, MedicationId, StockDate};

use crate::movement::{Nature, StockMovement};

/// Signed balance per medication.
pub type MedicationBalance = BTreeMap<MedicationId, i64>;

/// Signed balance per location and medication.
pub type LocationBalance = BTreeMap<LocationCode, BTreeMap<MedicationId, i64>>;

/// One batch position: a (location, medication, expiry) triple and its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchBalance {
    pub location: LocationCode,
    pub medication_id: MedicationId,
    pub expiry: StockDate,
    pub quantity: i64,
}

/// Signed balance per location, medication and expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailedBalance(BTreeMap<LocationCode, BTreeMap<MedicationId, BTreeMap<StockDate, i64>>>);

impl DetailedBalance {
    pub fn as_map(&self) -> &BTreeMap<LocationCode, BTreeMap<MedicationId, BTreeMap<StockDate, i64>>> {
        &self.0
    }

    /// Balance of one batch; zero when the batch never existed.
    pub fn get(&self, location: &LocationCode, medication_id: MedicationId, expiry: StockDate) -> i64 {
        self.0
            .get(location)
            .and_then(|meds| meds.get(&medication_id))
            .and_then(|expiries| expiries.get(&expiry))
            .copied()
            .unwrap_or(0)
    }

    /// Every batch, including depleted and negative ones, ordered by location,
    /// medication, then expiry.
    pub fn batches(&self) -> impl Iterator<Item = BatchBalance> + '_ {
        self.0.iter().flat_map(|(location, meds)| {
            meds.iter().flat_map(move |(medication_id, expiries)| {
                expiries.iter().map(move |(expiry, quantity)| BatchBalance {
                    location: location.clone(),
                    medication_id: *medication_id,
                    expiry: *expiry,
                    quantity: *quantity,
                })
            })
        })
    }

    /// Batches with a positive balance.
    pub fn positive_batches(&self) -> impl Iterator<Item = BatchBalance> + '_ {
        self.batches().filter(|b| b.quantity > 0)
    }

    /// The (medication, expiry) pairs a location currently holds with positive balance.
    pub fn held_at(&self, location: &LocationCode) -> Vec<(MedicationId, StockDate)> {
        self.0
            .get(location)
            .into_iter()
            .flat_map(|meds| {
                meds.iter().flat_map(|(medication_id, expiries)| {
                    expiries
                        .iter()
                        .filter(|(_, quantity)| **quantity > 0)
                        .map(|(expiry, _)| (*medication_id, *expiry))
                })
            })
            .collect()
    }

    fn entry(&mut self, location: &LocationCode, medication_id: MedicationId) -> &mut BTreeMap<StockDate, i64> {
        self.0
            .entry(location.clone())
            .or_default()
            .entry(medication_id)
            .or_default()
    }
}

/// A row of the "current stock" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLine {
    pub location: LocationCode,
    pub medication_id: MedicationId,
    pub quantity: i64,
    /// Expiry of the most recently dated receipt for this location and medication.
    pub latest_expiry: Option<StockDate>,
}

/// Balance views over a ledger snapshot.
#[derive(Debug, Clone, Copy)]
pub struct StockAggregator<'a> {
    movements: &'a [StockMovement],
    as_of: Option<StockDate>,
}

impl<'a> StockAggregator<'a> {
    /// Aggregate over every movement, without a date cutoff.
    pub fn new(movements: &'a [StockMovement]) -> Self {
        Self {
            movements,
            as_of: None,
        }
    }

    /// Only count movements dated on or before `date`.
    pub fn as_of(mut self, date: StockDate) -> Self {
        self.as_of = Some(date);
        self
    }

    fn counted(&self) -> impl Iterator<Item = &'a StockMovement> + 'a {
        let as_of = self.as_of;
        self.movements
            .iter()
            .filter(move |m| as_of.is_none_or(|cutoff| m.date <= cutoff))
    }

    pub fn balance_by_medication(&self) -> MedicationBalance {
        let mut balance = MedicationBalance::new();
        for m in self.counted() {
            *balance.entry(m.medication_id).or_default() += m.signed_quantity();
        }
        balance
    }

    pub fn balance_by_location(&self) -> LocationBalance {
        let mut balance = LocationBalance::new();
        for m in self.counted() {
            *balance
                .entry(m.location.clone())
                .or_default()
                .entry(m.medication_id)
                .or_default() += m.signed_quantity();
        }
        balance
    }

    /// Balance of one medication at one location.
    pub fn available(&self, medication_id: MedicationId, location: &LocationCode) -> i64 {
        self.counted()
            .filter(|m| m.medication_id == medication_id && &m.location == location)
            .map(StockMovement::signed_quantity)
            .sum()
    }

    /// Balance per batch.
    ///
    /// Receipts credit their own expiry. Withdrawals tagged with an expiry debit that
    /// batch; untagged withdrawals debit the batch the location holds for that
    /// medication at that point in the fold (the positive batch, or failing that the
    /// latest receipt's).
    pub fn detailed_balance(&self) -> DetailedBalance {
        let mut detailed = DetailedBalance::default();
        let mut last_receipt: BTreeMap<(&LocationCode, MedicationId), StockDate> = BTreeMap::new();

        for m in self.counted() {
            match (m.nature, m.expiry) {
                (_, Some(expiry)) => {
                    *detailed
                        .entry(&m.location, m.medication_id)
                        .entry(expiry)
                        .or_default() += m.signed_quantity();
                    if m.nature == Nature::Receipt {
                        last_receipt.insert((&m.location, m.medication_id), expiry);
                    }
                }
                (Nature::Withdrawal, None) => {
                    let expiries = detailed.entry(&m.location, m.medication_id);
                    let held = expiries
                        .iter()
                        .find(|(_, quantity)| **quantity > 0)
                        .map(|(expiry, _)| *expiry)
                        .or_else(|| last_receipt.get(&(&m.location, m.medication_id)).copied());

                    match held {
                        Some(expiry) => *expiries.entry(expiry).or_default() -= i64::from(m.quantity),
                        None => tracing::debug!(
                            movement_id = %m.id,
                            location = %m.location,
                            "withdrawal without a matching receipt left out of detailed balance"
                        ),
                    }
                }
                (Nature::Receipt, None) => tracing::debug!(
                    movement_id = %m.id,
                    "receipt without expiry left out of detailed balance"
                ),
            }
        }

        detailed
    }

    /// Expiry of the most recently dated receipt for a location and medication.
    ///
    /// Equal dates resolve to the later insertion.
    pub fn latest_expiry(&self, location: &LocationCode, medication_id: MedicationId) -> Option<StockDate> {
        let mut latest: Option<(StockDate, StockDate)> = None;
        for m in self.counted() {
            if !m.is_receipt() || &m.location != location || m.medication_id != medication_id {
                continue;
            }
            let Some(expiry) = m.expiry else { continue };
            if latest.is_none_or(|(date, _)| m.date >= date) {
                latest = Some((m.date, expiry));
            }
        }
        latest.map(|(_, expiry)| expiry)
    }

    /// Location/medication pairs with positive balance, ordered by location then medication.
    pub fn current_stock(&self) -> Vec<StockLine> {
        self.balance_by_location()
            .into_iter()
            .flat_map(|(location, meds)| {
                meds.into_iter()
                    .filter(|(_, quantity)| *quantity > 0)
                    .map(move |(medication_id, quantity)| (location.clone(), medication_id, quantity))
            })
            .map(|(location, medication_id, quantity)| StockLine {
                latest_expiry: self.latest_expiry(&location, medication_id),
                location,
                medication_id,
                quantity,
            })
            .collect()
    }
}
