use medstock_catalog::Medication;

use super::Service;
use crate::output::Output;

pub fn list(service: &Service, out: &Output, search: Option<&str>) -> anyhow::Result<()> {
    let catalog = service.catalog();
    let medications: Vec<&Medication> = match search {
        Some(fragment) => catalog.search(fragment),
        None => catalog.iter().collect(),
    };

    out.emit(&medications, |meds| {
        meds.iter()
            .map(|m| {
                let cold = if m.refrigerated { " [refrigerated]" } else { "" };
                format!("{:>4} {}{cold} - {} {}", m.id.get(), m.name, m.brand, m.packaging)
            })
            .collect::<Vec<_>>()
    })
}
