//! Validation gate: decides whether a candidate movement may enter the ledger.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 0. quantity is positive and the medication exists in the catalog
//! 1. the movement date is well formed
//! 2. the movement date is not after today
//! 3. the location is well formed; refrigerated medications go to refrigerated locations
//! 4. no movement at the same location is dated later
//! 5. receipts: expiry well formed and not before today; location exclusivity holds
//! 6. withdrawals: enough balance for (medication, location) as of the movement date

use medstock_catalog::MedicationCatalog;
use medstock_core::{LocationCode, StockDate};

use crate::balance::StockAggregator;
use crate::movement::{AcceptedMovement, MovementDraft, Nature, StockMovement};
use crate::rejection::{DateField, Rejection};

/// How strictly clock-relative rules apply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// New movements entered now.
    #[default]
    Live,
    /// Movements re-read from storage. Receipts whose expiry has passed since they
    /// were recorded are still admitted; every other rule applies.
    Replay,
}

pub struct ValidationGate<'a, C: MedicationCatalog + ?Sized> {
    catalog: &'a C,
    today: StockDate,
    mode: ValidationMode,
}

impl<'a, C: MedicationCatalog + ?Sized> ValidationGate<'a, C> {
    pub fn new(catalog: &'a C, today: StockDate) -> Self {
        Self {
            catalog,
            today,
            mode: ValidationMode::Live,
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate `draft` against the current ledger contents.
    pub fn validate(
        &self,
        draft: &MovementDraft,
        ledger: &[StockMovement],
    ) -> Result<AcceptedMovement, Rejection> {
        if draft.quantity == 0 {
            return Err(Rejection::InvalidQuantity);
        }
        let medication = self
            .catalog
            .get(draft.medication_id)
            .ok_or(Rejection::UnknownMedication(draft.medication_id))?;

        let date = parse_date(DateField::Movement, &draft.date)?;
        if date > self.today {
            return Err(Rejection::FutureDate {
                field: DateField::Movement,
                date,
                today: self.today,
            });
        }

        let location = LocationCode::parse(&draft.location).map_err(|_| Rejection::InvalidLocationFormat {
            input: draft.location.clone(),
        })?;
        if draft.nature == Nature::Receipt && medication.refrigerated && !location.is_refrigerated() {
            return Err(Rejection::RefrigerationViolation {
                medication_id: draft.medication_id,
                location,
            });
        }

        check_chronology(&location, date, ledger)?;

        let expiry = match draft.nature {
            Nature::Receipt => {
                let expiry = self.receipt_expiry(draft)?;
                check_exclusivity(&location, draft, expiry, date, ledger)?;
                Some(expiry)
            }
            Nature::Withdrawal => {
                let expiry = draft
                    .expiry
                    .as_deref()
                    .filter(|raw| !raw.trim().is_empty())
                    .map(|raw| parse_date(DateField::Expiry, raw))
                    .transpose()?;
                check_availability(&location, draft, expiry, date, ledger)?;
                expiry
            }
        };

        Ok(AcceptedMovement {
            date,
            medication_id: draft.medication_id,
            nature: draft.nature,
            location,
            expiry,
            quantity: draft.quantity,
        })
    }

    fn receipt_expiry(&self, draft: &MovementDraft) -> Result<StockDate, Rejection> {
        let raw = draft.expiry.as_deref().unwrap_or_default();
        let expiry = parse_date(DateField::Expiry, raw)?;
        if self.mode == ValidationMode::Live && expiry < self.today {
            return Err(Rejection::FutureDate {
                field: DateField::Expiry,
                date: expiry,
                today: self.today,
            });
        }
        Ok(expiry)
    }
}

fn parse_date(field: DateField, raw: &str) -> Result<StockDate, Rejection> {
    StockDate::parse(raw).map_err(|_| Rejection::InvalidDateFormat {
        field,
        input: raw.to_string(),
    })
}

fn check_chronology(location: &LocationCode, date: StockDate, ledger: &[StockMovement]) -> Result<(), Rejection> {
    let latest = ledger
        .iter()
        .filter(|m| &m.location == location)
        .map(|m| m.date)
        .max();

    match latest {
        Some(latest) if latest > date => Err(Rejection::ChronologyViolation {
            location: location.clone(),
            date,
            latest,
        }),
        _ => Ok(()),
    }
}

/// A location with positive balance only accepts more of the same (medication, expiry).
fn check_exclusivity(
    location: &LocationCode,
    draft: &MovementDraft,
    expiry: StockDate,
    date: StockDate,
    ledger: &[StockMovement],
) -> Result<(), Rejection> {
    let aggregator = StockAggregator::new(ledger).as_of(date);
    let location_total: i64 = aggregator
        .balance_by_location()
        .get(location)
        .map_or(0, |meds| meds.values().sum());
    if location_total <= 0 {
        return Ok(());
    }

    let conflict = aggregator
        .detailed_balance()
        .held_at(location)
        .into_iter()
        .find(|held| *held != (draft.medication_id, expiry));

    match conflict {
        Some((held_medication, held_expiry)) => Err(Rejection::LocationConflict {
            location: location.clone(),
            held_medication,
            held_expiry,
        }),
        None => Ok(()),
    }
}

/// Enough stock for (medication, location); a tagged withdrawal also needs enough in
/// the named batch.
fn check_availability(
    location: &LocationCode,
    draft: &MovementDraft,
    batch: Option<StockDate>,
    date: StockDate,
    ledger: &[StockMovement],
) -> Result<(), Rejection> {
    let aggregator = StockAggregator::new(ledger).as_of(date);
    let available = match batch {
        Some(expiry) => aggregator
            .detailed_balance()
            .get(location, draft.medication_id, expiry),
        None => aggregator.available(draft.medication_id, location),
    };

    if i64::from(draft.quantity) > available {
        return Err(Rejection::InsufficientStock {
            medication_id: draft.medication_id,
            location: location.clone(),
            requested: draft.quantity,
            available,
        });
    }
    Ok(())
}
