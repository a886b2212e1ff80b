//! Pharmacy stock ledger domain (pure, deterministic).
//!
//! This crate contains the business rules for the movement ledger, implemented
//! purely as domain logic (no IO, no locking, no clock reads):
//!
//! - [`ledger`]: the append-only movement store
//! - [`validation`]: the gate a candidate movement must pass before it is appended
//! - [`balance`]: point-in-time balances folded from the ledger
//! - [`expiry`]: expired batches still holding stock
//! - [`allocation`]: first-expire-first-out withdrawal planning

pub mod allocation;
pub mod balance;
pub mod expiry;
pub mod ledger;
pub mod movement;
pub mod rejection;
pub mod validation;

pub use allocation::{AllocationLine, AllocationPlan, AllocationPlanner, Demand};
pub use balance::{
    BatchBalance, DetailedBalance, LocationBalance, MedicationBalance, StockAggregator, StockLine,
};
pub use expiry::{ExpiredBatch, find_expired_with_stock};
pub use ledger::{LedgerError, MovementLedger};
pub use movement::{AcceptedMovement, MovementDraft, Nature, StockMovement};
pub use rejection::{DateField, Rejection, RejectionKind};
pub use validation::{ValidationGate, ValidationMode};
