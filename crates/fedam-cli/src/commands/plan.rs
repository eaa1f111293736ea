//! Plan command implementation.

use std::io::{self, Read};

use chrono::Utc;
use fedam_identifiers::Identifier;
use fedam_orchestrator::Object;
use fedam_service::{plan, rspec};

use super::config::ConfigArgs;
use crate::output;

pub fn run(
    input: Option<String>,
    slice: String,
    user: String,
    config: ConfigArgs,
    json: bool,
    manifest: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.load()?;
    let slice = Identifier::parse(&slice).map_err(|e| format!("Invalid slice URN: {}", e))?;
    let user = Identifier::parse(&user).map_err(|e| format!("Invalid user URN: {}", e))?;

    let request = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let expires = Utc::now() + config.sliver_lifetime();
    let planned = plan(&config, &slice, &user, &request, expires)?;
    tracing::info!(
        bundles = planned.bundles.len(),
        passthrough = planned.passthrough.len(),
        "plan ready"
    );

    if manifest {
        println!("{}", rspec::manifest(&request, &planned.sliver_ids())?);
        return Ok(());
    }

    if json {
        let objects: Vec<Object> = planned
            .bundles
            .iter()
            .flat_map(|bundle| bundle.objects())
            .collect();
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    output::print_header(&["CLIENT_ID", "SLIVER_NAME", "IMAGE", "SLIVER_URN"]);
    for bundle in &planned.bundles {
        println!(
            "{}",
            output::format_row(&[
                bundle.client_id.as_str(),
                bundle.sliver_name.as_str(),
                bundle.workload.container.image.as_str(),
                bundle.sliver_urn.to_urn().as_str(),
            ])
        );
    }
    for client_id in &planned.passthrough {
        println!("{}", output::format_row(&[client_id.as_str(), "-", "-", "(other aggregate)"]));
    }
    Ok(())
}
