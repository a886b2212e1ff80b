//! First-expire-first-out allocation of a withdrawal demand across batches.

use std::collections::BTreeMap;

use serde::Serialize;

use medstock_core::{LocationCode, MedicationId, StockDate};

use crate::balance::{BatchBalance, DetailedBalance};

/// Requested quantity per medication.
pub type Demand = BTreeMap<MedicationId, u32>;

/// One proposed withdrawal from one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationLine {
    pub location: LocationCode,
    pub medication_id: MedicationId,
    /// Always positive and never above the batch balance at planning time.
    pub quantity: u32,
    pub expiry: StockDate,
}

/// Planner output: ordered lines plus what was asked for.
///
/// Shortfalls are not errors; they show up as `shortfall(med) > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AllocationPlan {
    pub lines: Vec<AllocationLine>,
    pub requested: Demand,
}

impl AllocationPlan {
    /// Total allocated for one medication.
    pub fn allocated(&self, medication_id: MedicationId) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.medication_id == medication_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Requested minus allocated for one medication.
    pub fn shortfall(&self, medication_id: MedicationId) -> u32 {
        let requested = self.requested.get(&medication_id).copied().unwrap_or(0);
        requested.saturating_sub(self.allocated(medication_id))
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.requested.keys().all(|med| self.shortfall(*med) == 0)
    }
}

/// Plans withdrawals against a detailed balance snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AllocationPlanner<'a> {
    balance: &'a DetailedBalance,
}

impl<'a> AllocationPlanner<'a> {
    pub fn new(balance: &'a DetailedBalance) -> Self {
        Self { balance }
    }

    /// Allocate each medication's demand to its batches, earliest expiry first
    /// (ties by location code), taking from each batch at most its balance.
    pub fn plan(&self, demand: &Demand) -> AllocationPlan {
        let mut lines = Vec::new();

        for (&medication_id, &requested) in demand {
            let mut remaining = requested;
            for batch in self.candidates(medication_id) {
                if remaining == 0 {
                    break;
                }
                let available = u32::try_from(batch.quantity).unwrap_or(u32::MAX);
                let take = remaining.min(available);
                if take > 0 {
                    lines.push(AllocationLine {
                        location: batch.location,
                        medication_id,
                        quantity: take,
                        expiry: batch.expiry,
                    });
                    remaining -= take;
                }
            }

            if remaining > 0 {
                tracing::debug!(
                    medication_id = %medication_id,
                    requested,
                    unmet = remaining,
                    "demand not fully covered by stock"
                );
            }
        }

        AllocationPlan {
            lines,
            requested: demand.clone(),
        }
    }

    fn candidates(&self, medication_id: MedicationId) -> Vec<BatchBalance> {
        let mut batches: Vec<_> = self
            .balance
            .positive_batches()
            .filter(|b| b.medication_id == medication_id)
            .collect();
        batches.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.location.cmp(&b.location)));
        batches
    }
}
