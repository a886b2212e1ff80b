//! Reasons the validation gate refuses a candidate movement.

use core::fmt;

use thiserror::Error;

use medstock_core::{LocationCode, MedicationId, REFRIGERATION_LETTER, StockDate};

/// Which date of a movement a rejection refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DateField {
    Movement,
    Expiry,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateField::Movement => f.write_str("movement"),
            DateField::Expiry => f.write_str("expiry"),
        }
    }
}

/// Why a candidate movement was not admitted. Nothing is appended on rejection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("invalid {field} date '{input}': expected dd/mm/yyyy")]
    InvalidDateFormat { field: DateField, input: String },

    #[error("{}", describe_out_of_range(*.field, .date, .today))]
    FutureDate {
        field: DateField,
        date: StockDate,
        today: StockDate,
    },

    #[error("invalid location '{input}': expected one uppercase letter followed by four digits")]
    InvalidLocationFormat { input: String },

    #[error("medication {medication_id} requires refrigeration but {location} does not start with '{}'", REFRIGERATION_LETTER)]
    RefrigerationViolation {
        medication_id: MedicationId,
        location: LocationCode,
    },

    #[error("{location} already has a movement dated {latest}, later than {date}")]
    ChronologyViolation {
        location: LocationCode,
        date: StockDate,
        latest: StockDate,
    },

    #[error("{location} still holds medication {held_medication} expiring {held_expiry}")]
    LocationConflict {
        location: LocationCode,
        held_medication: MedicationId,
        held_expiry: StockDate,
    },

    #[error("insufficient stock of medication {medication_id} at {location}: requested {requested}, available {available}")]
    InsufficientStock {
        medication_id: MedicationId,
        location: LocationCode,
        requested: u32,
        available: i64,
    },

    #[error("unknown medication {0}")]
    UnknownMedication(MedicationId),

    #[error("quantity must be positive")]
    InvalidQuantity,
}

fn describe_out_of_range(field: DateField, date: &StockDate, today: &StockDate) -> String {
    match field {
        DateField::Movement => format!("movement date {date} is after today ({today})"),
        DateField::Expiry => format!("expiry {date} is before today ({today})"),
    }
}

/// Reason code of a [`Rejection`], without its context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    InvalidDateFormat,
    FutureDate,
    InvalidLocationFormat,
    RefrigerationViolation,
    ChronologyViolation,
    LocationConflict,
    InsufficientStock,
    UnknownMedication,
    InvalidQuantity,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::InvalidDateFormat { .. } => RejectionKind::InvalidDateFormat,
            Rejection::FutureDate { .. } => RejectionKind::FutureDate,
            Rejection::InvalidLocationFormat { .. } => RejectionKind::InvalidLocationFormat,
            Rejection::RefrigerationViolation { .. } => RejectionKind::RefrigerationViolation,
            Rejection::ChronologyViolation { .. } => RejectionKind::ChronologyViolation,
            Rejection::LocationConflict { .. } => RejectionKind::LocationConflict,
            Rejection::InsufficientStock { .. } => RejectionKind::InsufficientStock,
            Rejection::UnknownMedication(_) => RejectionKind::UnknownMedication,
            Rejection::InvalidQuantity => RejectionKind::InvalidQuantity,
        }
    }
}
