//! Urn command implementation.

use fedam_identifiers::Identifier;
use serde_json::json;

pub fn run(urn: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = Identifier::parse(&urn).map_err(|e| format!("Invalid URN: {}", e))?;

    if json {
        let value = json!({
            "urn": id.to_urn(),
            "authorities": id.authorities(),
            "type": id.resource_type().as_str(),
            "name": id.resource_name(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("urn:         {}", id);
        println!("authorities: {}", id.authorities().join(" / "));
        println!("type:        {}", id.resource_type().as_str());
        println!("name:        {}", id.resource_name());
    }
    Ok(())
}
