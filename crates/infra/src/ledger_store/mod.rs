//! Durable mirror of the movement ledger.
//!
//! The ledger itself lives in memory; a [`LedgerStore`] receives the full sequence
//! after every change and hands back raw rows on load. Stores do no validation:
//! rows are replayed through the validation gate by the stock service.

pub mod csv_file;
pub mod in_memory;
pub mod r#trait;

pub use csv_file::CsvLedgerStore;
pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, RowError, RowFault, StoreError, StoredRow, StoredRows};
