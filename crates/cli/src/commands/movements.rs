use medstock_core::{MedicationId, MovementId, StockDate};
use medstock_inventory::MovementDraft;

use super::{Service, describe_movement};
use crate::output::Output;

pub fn receive(
    service: &Service,
    out: &Output,
    date: Option<String>,
    medication: MedicationId,
    location: String,
    expiry: String,
    quantity: u32,
) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| service.today().to_string());
    let draft = MovementDraft::receipt(date, medication, location, expiry, quantity);
    let movement = service.record(&draft)?;
    out.emit(&movement, |m| [format!("recorded {}", describe_movement(service.catalog(), m))])
}

pub fn withdraw(
    service: &Service,
    out: &Output,
    date: Option<String>,
    medication: MedicationId,
    location: String,
    expiry: Option<String>,
    quantity: u32,
) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| service.today().to_string());
    let mut draft = MovementDraft::withdrawal(date, medication, location, quantity);
    if let Some(expiry) = expiry {
        draft = draft.with_expiry(expiry);
    }
    let movement = service.record(&draft)?;
    out.emit(&movement, |m| [format!("recorded {}", describe_movement(service.catalog(), m))])
}

pub fn history(
    service: &Service,
    out: &Output,
    from: Option<StockDate>,
    to: Option<StockDate>,
) -> anyhow::Result<()> {
    let movements = service.history(from, to)?;
    out.emit(&movements, |ms| {
        if ms.is_empty() {
            return vec!["no movements in range".to_string()];
        }
        ms.iter().map(|m| describe_movement(service.catalog(), m)).collect()
    })
}

pub fn purge(service: &Service, out: &Output, id: MovementId) -> anyhow::Result<()> {
    let removed = service.purge(id)?;
    out.emit(&removed, |m| [format!("purged {}", describe_movement(service.catalog(), m))])
}
