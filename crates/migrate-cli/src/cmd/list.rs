use serde_json::json;

use crate::output::{print_json, print_table};
use crate::scripts::CatalogEntry;

pub fn run(catalog: &[CatalogEntry], json: bool) -> anyhow::Result<()> {
    if json {
        let list: Vec<_> = catalog
            .iter()
            .map(|e| {
                json!({
                    "name": e.name(),
                    "description": e.description,
                    "file": e.file,
                })
            })
            .collect();
        return print_json(&list);
    }

    let rows = catalog
        .iter()
        .map(|e| vec![e.name().to_string(), e.description.to_string()])
        .collect();
    print_table(&["NAME", "DESCRIPTION"], rows);
    Ok(())
}
