use medstock_catalog::MedicationCatalog;
use medstock_core::{MedicationId, StockDate};
use medstock_infra::{ExecutionReport, WithdrawalExecutor};
use medstock_inventory::{AllocationLine, BatchBalance, Demand, StockMovement};
use serde::Serialize;

use super::{Service, describe_movement};
use crate::StockView;
use crate::output::Output;

/// Parse `MEDICATION=QUANTITY`.
pub fn parse_demand(raw: &str) -> Result<(MedicationId, u32), String> {
    let (med, qty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MEDICATION=QUANTITY, got '{raw}'"))?;
    let med = med.parse::<MedicationId>().map_err(|e| e.to_string())?;
    let qty = qty
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("quantity must be a non-negative integer, got '{}'", qty.trim()))?;
    Ok((med, qty))
}

pub fn stock(service: &Service, out: &Output, view: StockView, as_of: Option<StockDate>) -> anyhow::Result<()> {
    let catalog = service.catalog();
    match view {
        StockView::Current => {
            let lines = service.current_stock(as_of)?;
            out.emit(&lines, |lines| {
                lines
                    .iter()
                    .map(|l| {
                        let expiry = l.latest_expiry.map_or_else(|| "-".to_string(), |e| e.to_string());
                        format!(
                            "{} {:<24} {:>6}  exp {}",
                            l.location,
                            catalog.name_of(l.medication_id),
                            l.quantity,
                            expiry
                        )
                    })
                    .collect::<Vec<_>>()
            })
        }
        StockView::Medication => {
            let balance = service.balance_by_medication(as_of)?;
            out.emit(&balance, |balance| {
                balance
                    .iter()
                    .map(|(med, qty)| format!("{:>4} {:<24} {:>6}", med.get(), catalog.name_of(*med), qty))
                    .collect::<Vec<_>>()
            })
        }
        StockView::Location => {
            let balance = service.balance_by_location(as_of)?;
            out.emit(&balance, |balance| {
                balance
                    .iter()
                    .flat_map(|(loc, meds)| {
                        meds.iter()
                            .map(move |(med, qty)| format!("{loc} {:<24} {:>6}", catalog.name_of(*med), qty))
                    })
                    .collect::<Vec<_>>()
            })
        }
        StockView::Detail => {
            let batches: Vec<BatchBalance> = service.detailed_balance(as_of)?.batches().collect();
            out.emit(&batches, |batches| {
                batches
                    .iter()
                    .map(|b| {
                        format!(
                            "{} {:<24} exp {} {:>6}",
                            b.location,
                            catalog.name_of(b.medication_id),
                            b.expiry,
                            b.quantity
                        )
                    })
                    .collect::<Vec<_>>()
            })
        }
    }
}

pub fn expired(service: &Service, out: &Output, as_of: Option<StockDate>, dispose: bool) -> anyhow::Result<()> {
    let catalog = service.catalog();
    if dispose {
        let report = WithdrawalExecutor::new(service).dispose_expired(as_of)?;
        return emit_execution(service, out, &report);
    }

    let batches = service.expired(as_of)?;
    out.emit(&batches, |batches| {
        if batches.is_empty() {
            return vec!["no expired stock".to_string()];
        }
        batches
            .iter()
            .map(|b| {
                format!(
                    "{} {:<24} expired {} {:>6}",
                    b.location,
                    catalog.name_of(b.medication_id),
                    b.expiry,
                    b.quantity
                )
            })
            .collect()
    })
}

#[derive(Serialize)]
struct PlanView<'a> {
    lines: &'a [AllocationLine],
    shortfall: Vec<(MedicationId, u32)>,
}

pub fn plan(service: &Service, out: &Output, demand: Vec<(MedicationId, u32)>, execute: bool) -> anyhow::Result<()> {
    let mut merged = Demand::new();
    for (med, qty) in demand {
        *merged.entry(med).or_default() += qty;
    }

    let plan = service.plan(&merged)?;
    let catalog = service.catalog();
    let view = PlanView {
        lines: &plan.lines,
        shortfall: merged
            .keys()
            .map(|med| (*med, plan.shortfall(*med)))
            .filter(|(_, unmet)| *unmet > 0)
            .collect(),
    };
    out.emit(&view, |view| {
        let planned = view.lines.iter().map(|l| {
            format!(
                "take {:>6} of {:<24} from {} (exp {})",
                l.quantity,
                catalog.name_of(l.medication_id),
                l.location,
                l.expiry
            )
        });
        let short = view
            .shortfall
            .iter()
            .map(|(med, unmet)| format!("short {unmet:>6} of {}", catalog.name_of(*med)));
        planned.chain(short).collect::<Vec<_>>()
    })?;

    if execute {
        let report = WithdrawalExecutor::new(service).execute_plan(&plan);
        emit_execution(service, out, &report)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ExecutionView<'a> {
    recorded: Vec<&'a StockMovement>,
    failed: Vec<String>,
}

fn emit_execution<L>(service: &Service, out: &Output, report: &ExecutionReport<L>) -> anyhow::Result<()> {
    let view = ExecutionView {
        recorded: report.recorded().collect(),
        failed: report.failures().map(|(_, e)| e.to_string()).collect(),
    };
    out.emit(&view, |view| {
        let recorded = view
            .recorded
            .iter()
            .map(|m| format!("recorded {}", describe_movement(service.catalog(), m)));
        let failed = view.failed.iter().map(|e| format!("failed   {e}"));
        recorded.chain(failed).collect::<Vec<_>>()
    })
}
