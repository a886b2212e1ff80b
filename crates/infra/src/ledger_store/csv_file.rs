//! CSV-backed ledger mirror.
//!
//! One row per movement, header first, in this column order:
//! `ID, Data, ID Medicamento, Natureza, Local, Validade, Quantidade`.
//! Dates are `dd/mm/yyyy`; `Validade` is empty for untargeted withdrawals.
//! Rows are read by position, so header wording is not significant.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use medstock_core::{MedicationId, MovementId};
use medstock_inventory::{MovementDraft, Nature, StockMovement};

use super::r#trait::{LedgerStore, RowError, RowFault, StoreError, StoredRow, StoredRows};

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Data")]
    date: String,
    #[serde(rename = "ID Medicamento")]
    medication_id: u32,
    #[serde(rename = "Natureza")]
    nature: Nature,
    #[serde(rename = "Local")]
    location: String,
    #[serde(rename = "Validade")]
    expiry: String,
    #[serde(rename = "Quantidade")]
    quantity: u32,
}

impl From<&StockMovement> for LedgerRecord {
    fn from(m: &StockMovement) -> Self {
        Self {
            id: m.id.get(),
            date: m.date.to_string(),
            medication_id: m.medication_id.get(),
            nature: m.nature,
            location: m.location.to_string(),
            expiry: m.expiry.map(|e| e.to_string()).unwrap_or_default(),
            quantity: m.quantity,
        }
    }
}

impl LedgerRecord {
    fn into_row(self, line: u64) -> StoredRow {
        let expiry = (!self.expiry.is_empty()).then_some(self.expiry);
        StoredRow {
            line,
            id: MovementId::new(self.id),
            draft: MovementDraft {
                date: self.date,
                medication_id: MedicationId::new(self.medication_id),
                nature: self.nature,
                location: self.location,
                expiry,
                quantity: self.quantity,
            },
        }
    }
}

/// Ledger mirror in a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for CsvLedgerStore {
    fn load(&self) -> Result<StoredRows, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no ledger file yet; starting empty");
                return Ok(StoredRows::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut loaded = StoredRows::default();
        for (idx, record) in reader.records().enumerate() {
            let fallback_line = idx as u64 + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map_or(fallback_line, |p| p.line());
                    loaded.errors.push(RowError::new(line, RowFault::Malformed(e.to_string())));
                    continue;
                }
            };
            let line = record.position().map_or(fallback_line, |p| p.line());

            match record.deserialize::<LedgerRecord>(None) {
                Ok(parsed) => loaded.rows.push(parsed.into_row(line)),
                Err(e) => loaded
                    .errors
                    .push(RowError::new(line, RowFault::Malformed(e.to_string()))),
            }
        }

        Ok(loaded)
    }

    fn save(&self, movements: &[StockMovement]) -> Result<(), StoreError> {
        let staging = self.path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&staging)?;
        for movement in movements {
            writer.serialize(LedgerRecord::from(movement))?;
        }
        if movements.is_empty() {
            writer.write_record(["ID", "Data", "ID Medicamento", "Natureza", "Local", "Validade", "Quantidade"])?;
        }
        writer.flush().map_err(|e| StoreError::io(&staging, e))?;
        drop(writer);

        fs::rename(&staging, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}
