//! `medstock-core` — shared value types for the pharmacy stock ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod date;
pub mod error;
pub mod id;
pub mod location;

pub use clock::{Clock, FixedClock, SystemClock};
pub use date::StockDate;
pub use error::{DomainError, DomainResult};
pub use id::{MedicationId, MovementId};
pub use location::{LocationCode, REFRIGERATION_LETTER};
