//! Persistence for the medication catalog.
//!
//! Columns: `ID, Nome, Princípios Ativos, Refrigerado, Função, Risco, Dosagens,
//! Unidade, Quantidade de Doses, Marca, Envase`. List columns are joined with `"; "`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use medstock_catalog::{InMemoryCatalog, Medication};
use medstock_core::MedicationId;

use crate::ledger_store::{RowError, RowFault, StoreError};

const LIST_SEPARATOR: &str = "; ";

/// A catalog read from storage plus the rows that could not be read.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    pub catalog: InMemoryCatalog,
    pub errors: Vec<RowError>,
}

pub trait CatalogStore: Send + Sync {
    fn load(&self) -> Result<CatalogLoad, StoreError>;

    fn save(&self, catalog: &InMemoryCatalog) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogRecord {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "Nome")]
    name: String,
    #[serde(rename = "Princípios Ativos")]
    active_ingredients: String,
    #[serde(rename = "Refrigerado")]
    refrigerated: String,
    #[serde(rename = "Função")]
    function: String,
    #[serde(rename = "Risco")]
    risk: String,
    #[serde(rename = "Dosagens")]
    dosages: String,
    #[serde(rename = "Unidade")]
    dosage_unit: String,
    #[serde(rename = "Quantidade de Doses")]
    doses_per_package: u32,
    #[serde(rename = "Marca")]
    brand: String,
    #[serde(rename = "Envase")]
    packaging: String,
}

impl From<&Medication> for CatalogRecord {
    fn from(m: &Medication) -> Self {
        Self {
            id: m.id.get(),
            name: m.name.clone(),
            active_ingredients: m.active_ingredients.join(LIST_SEPARATOR),
            refrigerated: if m.refrigerated { "True" } else { "False" }.to_string(),
            function: m.function.clone(),
            risk: m.risk.clone(),
            dosages: m
                .dosages
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            dosage_unit: m.dosage_unit.clone(),
            doses_per_package: m.doses_per_package,
            brand: m.brand.clone(),
            packaging: m.packaging.clone(),
        }
    }
}

impl TryFrom<CatalogRecord> for Medication {
    type Error = RowFault;

    fn try_from(r: CatalogRecord) -> Result<Self, Self::Error> {
        let dosages = split_list(&r.dosages)
            .map(|d| {
                d.parse::<f64>()
                    .map_err(|_| RowFault::Malformed(format!("dosage '{d}' is not a number")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Medication {
            id: MedicationId::new(r.id),
            name: r.name,
            active_ingredients: split_list(&r.active_ingredients).map(str::to_string).collect(),
            refrigerated: r.refrigerated.trim().eq_ignore_ascii_case("true"),
            function: r.function,
            risk: r.risk,
            dosages,
            dosage_unit: r.dosage_unit,
            doses_per_package: r.doses_per_package,
            brand: r.brand,
            packaging: r.packaging,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Catalog kept in a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvCatalogStore {
    path: PathBuf,
}

impl CsvCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for CsvCatalogStore {
    fn load(&self) -> Result<CatalogLoad, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no catalog file yet; starting empty");
                return Ok(CatalogLoad::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut loaded = CatalogLoad::default();
        for (idx, record) in reader.records().enumerate() {
            let fallback_line = idx as u64 + 2;
            let parsed = record
                .map_err(|e| (e.position().map_or(fallback_line, |p| p.line()), e.to_string()))
                .and_then(|record| {
                    let line = record.position().map_or(fallback_line, |p| p.line());
                    record
                        .deserialize::<CatalogRecord>(None)
                        .map(|r| (line, r))
                        .map_err(|e| (line, e.to_string()))
                });

            match parsed {
                Ok((line, record)) => match Medication::try_from(record) {
                    Ok(medication) => loaded.catalog.insert(medication),
                    Err(fault) => loaded.errors.push(RowError::new(line, fault)),
                },
                Err((line, message)) => loaded
                    .errors
                    .push(RowError::new(line, RowFault::Malformed(message))),
            }
        }

        if !loaded.errors.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                skipped = loaded.errors.len(),
                "catalog rows skipped"
            );
        }
        Ok(loaded)
    }

    fn save(&self, catalog: &InMemoryCatalog) -> Result<(), StoreError> {
        let staging = self.path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&staging)?;
        for medication in catalog.iter() {
            writer.serialize(CatalogRecord::from(medication))?;
        }
        writer.flush().map_err(|e| StoreError::io(&staging, e))?;
        drop(writer);

        fs::rename(&staging, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}
