//! Names command implementation.

use fedam_identifiers::{slice_hash, sliver_name, Identifier};
use serde_json::json;

use crate::output;

pub fn run(slice: String, client_ids: Vec<String>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let slice = Identifier::parse(&slice).map_err(|e| format!("Invalid slice URN: {}", e))?;

    let mut rows = Vec::with_capacity(client_ids.len());
    for client_id in client_ids {
        let name = sliver_name(&slice, &client_id)?;
        rows.push((client_id, name));
    }

    if json {
        let value = json!({
            "slice": slice.to_urn(),
            "slice_hash": slice_hash(&slice),
            "slivers": rows.iter().map(|(client_id, name)| json!({
                "client_id": client_id,
                "sliver_name": name,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("slice hash: {}", slice_hash(&slice));
    if !rows.is_empty() {
        output::print_header(&["CLIENT_ID", "SLIVER_NAME"]);
        for (client_id, name) in &rows {
            println!("{}", output::format_row(&[client_id.as_str(), name.as_str()]));
        }
    }
    Ok(())
}
