//! Print every property of a camera as an indented tree
//!
//! Usage: `cam-enum [--json] <camera>`. Without a camera name the available
//! names are listed. Set `RUST_LOG` to see library logs.

use cam_core::{CamConfig, ConfigLoader, PluginRegistry, PropertyEntry};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cam-enum")]
#[command(about = "Print every property of a camera", long_about = None)]
struct Cli {
    /// Emit the property tree as JSON
    #[arg(long)]
    json: bool,

    /// Camera to open; lists the available cameras when omitted
    camera: Option<String>,
}

fn print_available(registry: &PluginRegistry) {
    println!("Available cameras:");
    for name in registry.list_available() {
        println!("  {}", name);
    }
}

fn print_entry(entry: &PropertyEntry) {
    let descriptor = entry.descriptor;
    let indent = "  ".repeat(descriptor.depth());
    let leaf = descriptor.name.rsplit('.').next().unwrap_or(descriptor.name);

    match &entry.value {
        Some(value) => {
            let unit = descriptor.unit.symbol();
            if unit.is_empty() {
                println!("{}{} = {}", indent, leaf, value);
            } else {
                println!("{}{} = {} {}", indent, leaf, value, unit);
            }
        }
        None => println!("{}{} = <unavailable>", indent, leaf),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match ConfigLoader::new().load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring configuration: {}", e);
            CamConfig::default()
        }
    };
    let registry = PluginRegistry::from_config(&config);

    let Some(name) = cli.camera else {
        print_available(&registry);
        return ExitCode::FAILURE;
    };

    let camera = match registry.open(&name) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_available(&registry);
            return ExitCode::FAILURE;
        }
    };

    let tree = camera.property_tree();
    if cli.json {
        match serde_json::to_string_pretty(&tree) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("# {}", name);
        for entry in &tree {
            print_entry(entry);
        }
    }

    match camera.close() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error while closing: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["cam-enum", "--json", "simulator"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.camera.as_deref(), Some("simulator"));

        let cli = Cli::try_parse_from(["cam-enum"]).unwrap();
        assert!(!cli.json);
        assert!(cli.camera.is_none());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["cam-enum", "--jsno", "simulator"]).is_err());
        assert!(Cli::try_parse_from(["cam-enum", "one", "two"]).is_err());
    }
}
