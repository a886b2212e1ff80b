use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use medstock_core::{DomainError, LocationCode, MedicationId, MovementId, StockDate};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nature {
    /// Stock in ("Entrada").
    #[serde(rename = "Entrada")]
    Receipt,
    /// Stock out ("Saída").
    #[serde(rename = "Saída")]
    Withdrawal,
}

impl Nature {
    /// Label used in persisted records.
    pub fn label(self) -> &'static str {
        match self {
            Nature::Receipt => "Entrada",
            Nature::Withdrawal => "Saída",
        }
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Nature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Entrada" => Ok(Nature::Receipt),
            "Saída" => Ok(Nature::Withdrawal),
            other => Err(DomainError::validation(format!(
                "nature must be 'Entrada' or 'Saída', got '{other}'"
            ))),
        }
    }
}

/// A movement admitted to the ledger ("batch event"). Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub date: StockDate,
    pub medication_id: MedicationId,
    pub nature: Nature,
    pub location: LocationCode,
    /// Batch expiry. Always set on receipts; optional on withdrawals.
    pub expiry: Option<StockDate>,
    /// Always positive.
    pub quantity: u32,
}

impl StockMovement {
    /// Contribution to a balance: `+quantity` for receipts, `-quantity` for withdrawals.
    pub fn signed_quantity(&self) -> i64 {
        match self.nature {
            Nature::Receipt => i64::from(self.quantity),
            Nature::Withdrawal => -i64::from(self.quantity),
        }
    }

    pub fn is_receipt(&self) -> bool {
        self.nature == Nature::Receipt
    }
}

/// A candidate movement as entered by an operator or read from storage.
///
/// Dates and location are kept as raw text; the validation gate parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub date: String,
    pub medication_id: MedicationId,
    pub nature: Nature,
    pub location: String,
    pub expiry: Option<String>,
    pub quantity: u32,
}

impl MovementDraft {
    pub fn receipt(
        date: impl Into<String>,
        medication_id: MedicationId,
        location: impl Into<String>,
        expiry: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            date: date.into(),
            medication_id,
            nature: Nature::Receipt,
            location: location.into(),
            expiry: Some(expiry.into()),
            quantity,
        }
    }

    /// A withdrawal that does not target a specific batch.
    pub fn withdrawal(
        date: impl Into<String>,
        medication_id: MedicationId,
        location: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            date: date.into(),
            medication_id,
            nature: Nature::Withdrawal,
            location: location.into(),
            expiry: None,
            quantity,
        }
    }

    /// Tag the draft with the expiry of the batch it depletes.
    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }
}

impl From<&StockMovement> for MovementDraft {
    /// The draft that would re-create `movement` (used when replaying stored rows).
    fn from(movement: &StockMovement) -> Self {
        Self {
            date: movement.date.to_string(),
            medication_id: movement.medication_id,
            nature: movement.nature,
            location: movement.location.to_string(),
            expiry: movement.expiry.map(|e| e.to_string()),
            quantity: movement.quantity,
        }
    }
}

/// A draft that passed the validation gate, with its fields parsed.
///
/// Only the gate constructs these, so anything reaching the ledger has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMovement {
    pub(crate) date: StockDate,
    pub(crate) medication_id: MedicationId,
    pub(crate) nature: Nature,
    pub(crate) location: LocationCode,
    pub(crate) expiry: Option<StockDate>,
    pub(crate) quantity: u32,
}

impl AcceptedMovement {
    pub fn date(&self) -> StockDate {
        self.date
    }

    pub fn medication_id(&self) -> MedicationId {
        self.medication_id
    }

    pub fn nature(&self) -> Nature {
        self.nature
    }

    pub fn location(&self) -> &LocationCode {
        &self.location
    }

    pub fn expiry(&self) -> Option<StockDate> {
        self.expiry
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub(crate) fn into_movement(self, id: MovementId) -> StockMovement {
        StockMovement {
            id,
            date: self.date,
            medication_id: self.medication_id,
            nature: self.nature,
            location: self.location,
            expiry: self.expiry,
            quantity: self.quantity,
        }
    }
}
