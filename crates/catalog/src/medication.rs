use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use medstock_core::MedicationId;

/// A catalog entry.
///
/// Only `id`, `name` and `refrigerated` matter to the stock ledger; the remaining
/// fields are descriptive and carried for listings and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub name: String,
    pub active_ingredients: Vec<String>,
    /// Must be stored in a refrigerated location.
    pub refrigerated: bool,
    pub function: String,
    pub risk: String,
    pub dosages: Vec<f64>,
    pub dosage_unit: String,
    pub doses_per_package: u32,
    pub brand: String,
    pub packaging: String,
}

/// Attributes of a medication not yet registered (no identifier).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
    pub active_ingredients: Vec<String>,
    pub refrigerated: bool,
    pub function: String,
    pub risk: String,
    pub dosages: Vec<f64>,
    pub dosage_unit: String,
    pub doses_per_package: u32,
    pub brand: String,
    pub packaging: String,
}

impl NewMedication {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn refrigerated(mut self, refrigerated: bool) -> Self {
        self.refrigerated = refrigerated;
        self
    }

    fn with_id(self, id: MedicationId) -> Medication {
        Medication {
            id,
            name: self.name,
            active_ingredients: self.active_ingredients,
            refrigerated: self.refrigerated,
            function: self.function,
            risk: self.risk,
            dosages: self.dosages,
            dosage_unit: self.dosage_unit,
            doses_per_package: self.doses_per_package,
            brand: self.brand,
            packaging: self.packaging,
        }
    }
}

/// Read-only lookup contract consumed by the stock ledger.
pub trait MedicationCatalog: Send + Sync {
    fn get(&self, id: MedicationId) -> Option<&Medication>;

    fn contains(&self, id: MedicationId) -> bool {
        self.get(id).is_some()
    }

    /// Display name, or `"Unknown"` when the id is not registered.
    fn name_of(&self, id: MedicationId) -> &str {
        self.get(id).map_or("Unknown", |m| m.name.as_str())
    }
}

impl<C: MedicationCatalog + ?Sized> MedicationCatalog for std::sync::Arc<C> {
    fn get(&self, id: MedicationId) -> Option<&Medication> {
        (**self).get(id)
    }
}

/// In-memory catalog ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    medications: BTreeMap<MedicationId, Medication>,
    last_id: u32,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a medication, assigning the next identifier.
    pub fn add(&mut self, medication: NewMedication) -> MedicationId {
        self.last_id += 1;
        let id = MedicationId::new(self.last_id);
        self.medications.insert(id, medication.with_id(id));
        id
    }

    /// Insert a medication that already carries its identifier (e.g. loaded from storage).
    ///
    /// Replaces any previous entry with the same id.
    pub fn insert(&mut self, medication: Medication) {
        self.last_id = self.last_id.max(medication.id.get());
        self.medications.insert(medication.id, medication);
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }

    /// All medications in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Medication> {
        self.medications.values()
    }

    /// Case-insensitive substring match on the name.
    pub fn search(&self, fragment: &str) -> Vec<&Medication> {
        let needle = fragment.to_lowercase();
        self.medications
            .values()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .collect()
    }
}

impl MedicationCatalog for InMemoryCatalog {
    fn get(&self, id: MedicationId) -> Option<&Medication> {
        self.medications.get(&id)
    }
}

impl FromIterator<Medication> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Medication>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for medication in iter {
            catalog.insert(medication);
        }
        catalog
    }
}
