//! Medication catalog.
//!
//! The stock ledger only consumes the catalog as a lookup (id → attributes);
//! this crate provides that contract plus a simple in-memory implementation.

pub mod medication;

pub use medication::{InMemoryCatalog, Medication, MedicationCatalog, NewMedication};
