use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use medstock_core::MovementId;
use medstock_inventory::{LedgerError, MovementDraft, Rejection, StockMovement};

/// Persistence failure for a whole load or save.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single stored row was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowFault {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A skipped row and where it was (1-based line, header included).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {fault}")]
pub struct RowError {
    pub line: u64,
    pub fault: RowFault,
}

impl RowError {
    pub fn new(line: u64, fault: impl Into<RowFault>) -> Self {
        Self {
            line,
            fault: fault.into(),
        }
    }
}

/// A persisted movement, read back with its identifier but not yet re-validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub line: u64,
    pub id: MovementId,
    pub draft: MovementDraft,
}

/// Everything a store could read: parsed rows in stored order plus rows it could not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRows {
    pub rows: Vec<StoredRow>,
    pub errors: Vec<RowError>,
}

/// Mirror of the ledger in durable storage.
///
/// `save` always receives the full movement sequence; implementations replace what
/// they held. Unparseable rows are reported in [`StoredRows::errors`], never fatal.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<StoredRows, StoreError>;

    fn save(&self, movements: &[StockMovement]) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> Result<StoredRows, StoreError> {
        (**self).load()
    }

    fn save(&self, movements: &[StockMovement]) -> Result<(), StoreError> {
        (**self).save(movements)
    }
}
