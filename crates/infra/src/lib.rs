//! Infrastructure layer: durable stores, the stock service and withdrawal execution.

pub mod catalog_store;
pub mod executor;
pub mod ledger_store;
pub mod service;

#[cfg(test)]
mod integration_tests;

pub use catalog_store::{CatalogLoad, CatalogStore, CsvCatalogStore};
pub use executor::{ExecutionReport, LineOutcome, WithdrawalExecutor, WithdrawalSource};
pub use ledger_store::{CsvLedgerStore, InMemoryLedgerStore, LedgerStore, RowError, RowFault, StoreError};
pub use service::{LoadReport, ServiceError, StockService};
