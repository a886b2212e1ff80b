//! Append-only movement ledger.

use thiserror::Error;

use medstock_core::{DomainError, MovementId, StockDate};

use crate::movement::{AcceptedMovement, StockMovement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("movement {0} not found")]
    NotFound(MovementId),

    #[error("movement id {0} is already in use")]
    DuplicateId(MovementId),
}

/// Ordered store of stock movements.
///
/// Movements are kept in insertion order, which is not necessarily chronological:
/// chronology is only enforced per location (by the validation gate). Identifiers
/// increase monotonically and are never reused while the movement is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementLedger {
    movements: Vec<StockMovement>,
    last_id: u64,
}

impl MovementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All movements, in insertion order.
    pub fn all(&self) -> &[StockMovement] {
        &self.movements
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn get(&self, id: MovementId) -> Option<&StockMovement> {
        self.movements.iter().find(|m| m.id == id)
    }

    /// Append an accepted movement under the next identifier.
    pub fn append(&mut self, accepted: AcceptedMovement) -> &StockMovement {
        self.last_id += 1;
        let id = MovementId::new(self.last_id);
        self.push(accepted.into_movement(id))
    }

    /// Append an accepted movement under an identifier it already had (loading from storage).
    pub fn restore(
        &mut self,
        id: MovementId,
        accepted: AcceptedMovement,
    ) -> Result<&StockMovement, LedgerError> {
        if self.get(id).is_some() {
            return Err(LedgerError::DuplicateId(id));
        }
        self.last_id = self.last_id.max(id.get());
        Ok(self.push(accepted.into_movement(id)))
    }

    fn push(&mut self, movement: StockMovement) -> &StockMovement {
        self.movements.push(movement);
        let last = self.movements.len() - 1;
        &self.movements[last]
    }

    /// Physically remove a movement. Administrative only: normal corrections are
    /// compensating movements.
    pub fn purge(&mut self, id: MovementId) -> Result<StockMovement, LedgerError> {
        let idx = self
            .movements
            .iter()
            .position(|m| m.id == id)
            .ok_or(LedgerError::NotFound(id))?;
        Ok(self.movements.remove(idx))
    }

    /// Drop every movement and reset identifiers. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.movements.len();
        self.movements.clear();
        self.last_id = 0;
        dropped
    }

    /// Movements dated within `[from, to]`, in insertion order.
    pub fn between(&self, from: StockDate, to: StockDate) -> Result<Vec<&StockMovement>, DomainError> {
        if to < from {
            return Err(DomainError::validation(format!(
                "end date {to} is before start date {from}"
            )));
        }
        Ok(self
            .movements
            .iter()
            .filter(|m| m.date >= from && m.date <= to)
            .collect())
    }
}
