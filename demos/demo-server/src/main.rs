//! Demo server.
//!
//! Registers a handful of tools, resources and prompts and serves them over
//! stdin/stdout, one JSON message per line. Logs go to stderr.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p demo-server -- --config demos/demo-server/dispatchkit.toml
//! ```
//!
//! Then type requests on stdin:
//!
//! ```text
//! {"type":"read_resource","id":1,"uri":"api://users?version=2&limit=50"}
//! {"type":"call_tool","id":2,"name":"pattern_example"}
//! {"type":"elicitation_response","id":2,"outcome":"accept"}
//! ```

mod prompts;
mod resources;
mod tools;

use clap::Parser;
use dispatchkit::prelude::*;
use miette::{IntoDiagnostic, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "dispatchkit-demo", version, about = "Run the dispatchkit demo server over stdio")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Contents of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerConfig,
    dispatcher: DispatcherConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerConfig {
    name: String,
    instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "dispatchkit demo".to_string(),
            instructions: None,
        }
    }
}

fn load_config(path: Option<&Path>) -> miette::Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
}

fn init_tracing() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| miette::miette!("failed to install tracing subscriber: {e}"))
}

fn build_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    tools::register(&mut registry)?;
    resources::register(&mut registry)?;
    prompts::register(&mut registry)?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = load_config(cli.config.as_deref())?;
    let registry = build_registry()?;

    tracing::info!(
        name = %config.server.name,
        instructions = config.server.instructions.as_deref().unwrap_or(""),
        definitions = registry.len(),
        "Starting server"
    );

    let dispatcher = Arc::new(Dispatcher::with_config(registry, config.dispatcher));
    serve_stdio(dispatcher)
        .await
        .into_diagnostic()
        .wrap_err("connection failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config() {
        let config: FileConfig = toml::from_str(
            r#"
            [server]
            name = "odoo"

            [dispatcher]
            elicitation_timeout_ms = 30000
            "#,
        )
        .unwrap();
        assert_eq!(config.server.name, "odoo");
        assert_eq!(config.server.instructions, None);
        assert_eq!(config.dispatcher.elicitation_timeout_ms, 30_000);
        assert_eq!(config.dispatcher.blocking_workers, 4);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.name, "dispatchkit demo");
        assert_eq!(config.dispatcher, DispatcherConfig::default());
    }

    #[test]
    fn test_demo_registrations_are_valid() {
        let registry = build_registry().unwrap();
        assert_eq!(registry.tools().count(), 4);
        assert_eq!(registry.resources().count(), 4);
        assert_eq!(registry.prompts().count(), 3);
    }
}
