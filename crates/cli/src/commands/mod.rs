//! Subcommand implementations.

use medstock_catalog::{InMemoryCatalog, MedicationCatalog};
use medstock_core::SystemClock;
use medstock_infra::{CsvLedgerStore, StockService};
use medstock_inventory::StockMovement;

pub mod medications;
pub mod movements;
pub mod stock;

pub type Service = StockService<CsvLedgerStore, InMemoryCatalog, SystemClock>;

pub(crate) fn describe_movement(catalog: &impl MedicationCatalog, m: &StockMovement) -> String {
    // Nature and MovementId ignore width in Display.
    let medication = format!("{} ({})", catalog.name_of(m.medication_id), m.medication_id);
    let expiry = m.expiry.map_or_else(|| "-".to_string(), |e| e.to_string());
    format!(
        "#{:<5} {} {:<7} {} {:<24} exp {:<10} qty {}",
        m.id.to_string(),
        m.date,
        m.nature.to_string(),
        m.location,
        medication,
        expiry,
        m.quantity,
    )
}
