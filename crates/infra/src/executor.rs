//! Turning plans and expiry reports into recorded withdrawals.
//!
//! Each line becomes its own withdrawal dated today and targeting the line's batch.
//! Lines go through [`StockService::record`] one by one, so each is re-validated
//! against the ledger as it stands at that moment; a failed line does not stop or
//! undo the others.

use medstock_catalog::MedicationCatalog;
use medstock_core::{Clock, StockDate};
use medstock_inventory::{AllocationLine, AllocationPlan, ExpiredBatch, MovementDraft, StockMovement};

use crate::ledger_store::LedgerStore;
use crate::service::{ServiceError, StockService};

/// Something that can be expressed as a single withdrawal.
pub trait WithdrawalSource {
    fn to_withdrawal(&self, date: StockDate) -> MovementDraft;
}

impl WithdrawalSource for AllocationLine {
    fn to_withdrawal(&self, date: StockDate) -> MovementDraft {
        MovementDraft::withdrawal(date.to_string(), self.medication_id, self.location.as_str(), self.quantity)
            .with_expiry(self.expiry.to_string())
    }
}

impl WithdrawalSource for ExpiredBatch {
    fn to_withdrawal(&self, date: StockDate) -> MovementDraft {
        // Non-positive batches never reach here; zero is rejected by the gate anyway.
        let quantity = u32::try_from(self.quantity).unwrap_or(0);
        MovementDraft::withdrawal(date.to_string(), self.medication_id, self.location.as_str(), quantity)
            .with_expiry(self.expiry.to_string())
    }
}

/// What happened to one line.
#[derive(Debug)]
pub struct LineOutcome<L> {
    pub line: L,
    pub result: Result<StockMovement, ServiceError>,
}

#[derive(Debug)]
pub struct ExecutionReport<L> {
    pub outcomes: Vec<LineOutcome<L>>,
}

impl<L> ExecutionReport<L> {
    pub fn recorded(&self) -> impl Iterator<Item = &StockMovement> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&L, &ServiceError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.line, e)))
    }

    pub fn all_recorded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

pub struct WithdrawalExecutor<'a, S, C, K> {
    service: &'a StockService<S, C, K>,
}

impl<'a, S, C, K> WithdrawalExecutor<'a, S, C, K>
where
    S: LedgerStore,
    C: MedicationCatalog,
    K: Clock,
{
    pub fn new(service: &'a StockService<S, C, K>) -> Self {
        Self { service }
    }

    /// Record one withdrawal per line, in order.
    pub fn execute<L>(&self, lines: impl IntoIterator<Item = L>) -> ExecutionReport<L>
    where
        L: WithdrawalSource,
    {
        let today = self.service.today();
        let outcomes: Vec<_> = lines
            .into_iter()
            .map(|line| {
                let result = self.service.record(&line.to_withdrawal(today));
                LineOutcome { line, result }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            tracing::warn!(lines = outcomes.len(), failed, "withdrawal lines not recorded");
        }
        ExecutionReport { outcomes }
    }

    pub fn execute_plan(&self, plan: &AllocationPlan) -> ExecutionReport<AllocationLine> {
        self.execute(plan.lines.iter().cloned())
    }

    /// Withdraw every expired batch that still holds stock (as of `as_of`, default today).
    pub fn dispose_expired(&self, as_of: Option<StockDate>) -> Result<ExecutionReport<ExpiredBatch>, ServiceError> {
        let expired = self.service.expired(as_of)?;
        tracing::info!(batches = expired.len(), "disposing expired batches");
        Ok(self.execute(expired))
    }
}
