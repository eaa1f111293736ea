//! Configuration flags shared by commands, and the config command.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use fedam_service::config::{DEFAULT_AUTHORITY_NAME, DEFAULT_NAMESPACE};
use fedam_service::ServiceConfig;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// JSON configuration file; the flags below are ignored when set
    #[arg(long)]
    config: Option<PathBuf>,
    /// Authority name of this aggregate
    #[arg(long, default_value = DEFAULT_AUTHORITY_NAME)]
    authority_name: String,
    /// Namespace for created objects
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,
    /// Image table entry as NAME=IMAGE (repeatable)
    #[arg(long = "container-image", value_parser = parse_image)]
    container_images: Vec<(String, String)>,
    /// Image name used by nodes that name no disk image
    #[arg(long)]
    default_image: Option<String>,
    /// Container CPU limit
    #[arg(long)]
    container_cpu_limit: Option<String>,
    /// Container memory limit
    #[arg(long)]
    container_memory_limit: Option<String>,
    /// Trusted root certificate file (repeatable)
    #[arg(long = "trusted-root-cert")]
    trusted_root_certs: Vec<PathBuf>,
    /// Sliver lifetime in hours
    #[arg(long)]
    sliver_lifetime_hours: Option<u32>,
    /// Per-call budget in seconds
    #[arg(long)]
    call_timeout_secs: Option<u64>,
}

fn parse_image(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, image)) if !name.is_empty() && !image.is_empty() => {
            Ok((name.to_string(), image.to_string()))
        }
        _ => Err(format!("expected NAME=IMAGE, got '{}'", value)),
    }
}

impl ConfigArgs {
    /// Loads the configuration file, or builds one from flags, and validates it.
    pub fn load(&self) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            let config = ServiceConfig::from_json_file(path)
                .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            return Ok(config);
        }

        let mut config =
            ServiceConfig::for_authority_name(&self.authority_name, self.namespace.clone())?;
        for (name, image) in &self.container_images {
            config = config.with_image(name.clone(), image.clone());
        }
        if let Some(name) = &self.default_image {
            config = config.with_default_image(name.clone());
        }
        if self.container_cpu_limit.is_some() || self.container_memory_limit.is_some() {
            let limits = &config.container_resources.limits;
            let cpu = self.container_cpu_limit.clone().unwrap_or_else(|| limits.cpu.clone());
            let memory = self
                .container_memory_limit
                .clone()
                .unwrap_or_else(|| limits.memory.clone());
            config = config.with_limits(cpu, memory);
        }
        for path in &self.trusted_root_certs {
            config = config.with_trusted_root_cert(path.clone());
        }
        if let Some(hours) = self.sliver_lifetime_hours {
            config = config.with_sliver_lifetime_hours(hours);
        }
        if let Some(secs) = self.call_timeout_secs {
            config = config.with_call_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.load()?;
    let roots = config.trusted_roots()?;
    tracing::info!(roots = roots.certificates().len(), "trusted roots readable");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
