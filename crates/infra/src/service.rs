//! Stock service: the ledger, its durable mirror, the catalog and a clock, composed.
//!
//! ## Recording Flow
//!
//! ```text
//! MovementDraft
//!   ↓
//! 1. Take the ledger write lock (one writer at a time)
//!   ↓
//! 2. Validation gate against the current ledger and today's date
//!   ↓
//! 3. Append under the next identifier
//!   ↓
//! 4. Save the full ledger to the store
//! ```
//!
//! Validation and append happen under the same lock, so two concurrent withdrawals
//! can never both pass an availability check that only one of them fits.
//!
//! A failed save is reported as [`ServiceError::Persistence`]; the movement stays in
//! the in-memory ledger and the next successful save carries it.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use medstock_catalog::MedicationCatalog;
use medstock_core::{Clock, DomainError, MovementId, StockDate};
use medstock_inventory::{
    AllocationPlan, AllocationPlanner, Demand, DetailedBalance, ExpiredBatch, LedgerError,
    LocationBalance, MedicationBalance, MovementDraft, MovementLedger, Rejection, StockAggregator,
    StockLine, StockMovement, ValidationGate, ValidationMode, find_expired_with_stock,
};

use crate::ledger_store::{LedgerStore, RowError, RowFault, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The validation gate refused the movement. Nothing changed.
    #[error("movement rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The ledger changed in memory but the store did not accept the new state.
    #[error("movement {id} applied but not persisted: {source}")]
    Persistence {
        id: MovementId,
        #[source]
        source: StoreError,
    },

    /// Reading the store failed as a whole. The in-memory ledger is untouched.
    #[error("ledger could not be loaded: {0}")]
    Load(#[source] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("stock service unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of re-reading the store into the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub discarded: usize,
    /// Movements that were in memory before the reload.
    pub replaced: usize,
    pub errors: Vec<RowError>,
}

/// Thread-safe front to the movement ledger.
///
/// ## Generic Parameters
///
/// - `S`: where the ledger is mirrored ([`LedgerStore`])
/// - `C`: medication lookup used by validation ([`MedicationCatalog`])
/// - `K`: source of "today" ([`Clock`])
///
/// Queries take the shared lock and see a consistent ledger; `record`, `purge` and
/// `load` take the exclusive lock.
#[derive(Debug)]
pub struct StockService<S, C, K> {
    ledger: RwLock<MovementLedger>,
    store: S,
    catalog: C,
    clock: K,
}

impl<S, C, K> StockService<S, C, K>
where
    S: LedgerStore,
    C: MedicationCatalog,
    K: Clock,
{
    /// A service over an empty ledger. Call [`load`](Self::load) to read the store.
    pub fn new(store: S, catalog: C, clock: K) -> Self {
        Self {
            ledger: RwLock::new(MovementLedger::new()),
            store,
            catalog,
            clock,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn today(&self) -> StockDate {
        self.clock.today()
    }

    /// Replace the in-memory ledger with what the store holds.
    ///
    /// Every stored row goes back through the validation gate in stored order, in
    /// replay mode (receipts that have expired since they were recorded are kept).
    /// Rows that fail are discarded and reported; identifiers of kept rows are
    /// preserved and new movements continue after the highest one. If the store
    /// cannot be read at all, the in-memory ledger is left as it was.
    pub fn load(&self) -> Result<LoadReport, ServiceError> {
        let stored = self.store.load().map_err(ServiceError::Load)?;
        let gate = ValidationGate::new(&self.catalog, self.clock.today()).with_mode(ValidationMode::Replay);

        let mut ledger = self.write()?;
        let replaced = ledger.clear();
        if replaced > 0 {
            tracing::warn!(replaced, "in-memory movements dropped before reload");
        }

        let mut errors = stored.errors;
        for row in stored.rows {
            let restored = gate
                .validate(&row.draft, ledger.all())
                .map_err(RowFault::from)
                .and_then(|accepted| ledger.restore(row.id, accepted).map(|_| ()).map_err(RowFault::from));
            if let Err(fault) = restored {
                tracing::debug!(line = row.line, movement_id = %row.id, error = %fault, "stored movement discarded");
                errors.push(RowError::new(row.line, fault));
            }
        }
        errors.sort_by_key(|e| e.line);

        let report = LoadReport {
            loaded: ledger.len(),
            discarded: errors.len(),
            replaced,
            errors,
        };
        drop(ledger);

        if report.discarded > 0 {
            tracing::warn!(
                loaded = report.loaded,
                discarded = report.discarded,
                "ledger loaded with discarded rows"
            );
        } else {
            tracing::info!(loaded = report.loaded, "ledger loaded");
        }
        Ok(report)
    }

    /// Validate and append a movement, then persist the ledger.
    #[tracing::instrument(
        skip(self, draft),
        fields(medication_id = %draft.medication_id, nature = %draft.nature, location = %draft.location)
    )]
    pub fn record(&self, draft: &MovementDraft) -> Result<StockMovement, ServiceError> {
        let today = self.clock.today();
        let mut ledger = self.write()?;

        let accepted = match ValidationGate::new(&self.catalog, today).validate(draft, ledger.all()) {
            Ok(accepted) => accepted,
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "movement rejected");
                return Err(rejection.into());
            }
        };
        let movement = ledger.append(accepted).clone();
        tracing::info!(movement_id = %movement.id, quantity = movement.quantity, "movement recorded");

        self.persist(&ledger, movement.id)?;
        Ok(movement)
    }

    /// Physically remove a movement and persist. Administrative correction only.
    ///
    /// Balances are recomputed from what remains; nothing re-validates the rest of
    /// the ledger, so purging a receipt can leave later withdrawals uncovered.
    pub fn purge(&self, id: MovementId) -> Result<StockMovement, ServiceError> {
        let mut ledger = self.write()?;
        let removed = ledger.purge(id)?;
        tracing::warn!(movement_id = %id, "movement purged");

        self.persist(&ledger, id)?;
        Ok(removed)
    }

    /// Every movement, in insertion order.
    pub fn snapshot(&self) -> Result<Vec<StockMovement>, ServiceError> {
        Ok(self.read()?.all().to_vec())
    }

    /// Movements dated in `[from, to]`. Defaults: the epoch and today.
    pub fn history(
        &self,
        from: Option<StockDate>,
        to: Option<StockDate>,
    ) -> Result<Vec<StockMovement>, ServiceError> {
        let from = from.unwrap_or(StockDate::EPOCH);
        let to = to.unwrap_or_else(|| self.clock.today());
        let ledger = self.read()?;
        Ok(ledger.between(from, to)?.into_iter().cloned().collect())
    }

    pub fn balance_by_medication(&self, as_of: Option<StockDate>) -> Result<MedicationBalance, ServiceError> {
        self.aggregate(as_of, |agg| agg.balance_by_medication())
    }

    pub fn balance_by_location(&self, as_of: Option<StockDate>) -> Result<LocationBalance, ServiceError> {
        self.aggregate(as_of, |agg| agg.balance_by_location())
    }

    pub fn detailed_balance(&self, as_of: Option<StockDate>) -> Result<DetailedBalance, ServiceError> {
        self.aggregate(as_of, |agg| agg.detailed_balance())
    }

    /// Positive (location, medication) balances with their latest batch expiry.
    pub fn current_stock(&self, as_of: Option<StockDate>) -> Result<Vec<StockLine>, ServiceError> {
        self.aggregate(as_of, |agg| agg.current_stock())
    }

    pub fn expired(&self, as_of: Option<StockDate>) -> Result<Vec<ExpiredBatch>, ServiceError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        Ok(find_expired_with_stock(self.read()?.all(), as_of))
    }

    pub fn expired_count(&self, as_of: Option<StockDate>) -> Result<usize, ServiceError> {
        Ok(self.expired(as_of)?.len())
    }

    /// FEFO plan for `demand` against today's batches. Read-only.
    pub fn plan(&self, demand: &Demand) -> Result<AllocationPlan, ServiceError> {
        let balance = self.detailed_balance(None)?;
        Ok(AllocationPlanner::new(&balance).plan(demand))
    }

    fn aggregate<T>(
        &self,
        as_of: Option<StockDate>,
        f: impl FnOnce(&StockAggregator<'_>) -> T,
    ) -> Result<T, ServiceError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let ledger = self.read()?;
        Ok(f(&StockAggregator::new(ledger.all()).as_of(as_of)))
    }

    fn persist(&self, ledger: &MovementLedger, id: MovementId) -> Result<(), ServiceError> {
        self.store.save(ledger.all()).map_err(|source| {
            tracing::error!(movement_id = %id, error = %source, "ledger not persisted");
            ServiceError::Persistence { id, source }
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MovementLedger>, ServiceError> {
        self.ledger
            .read()
            .map_err(|_| ServiceError::Unavailable("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MovementLedger>, ServiceError> {
        self.ledger
            .write()
            .map_err(|_| ServiceError::Unavailable("ledger lock poisoned".to_string()))
    }
}
