//! Config command - configuration utilities.

use anyhow::Result;
use std::path::Path;

use raman_qc::classifier::Classifier;
use raman_qc::config::Config;

use crate::cli::ConfigAction;

/// Run the config command.
pub fn run(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Validate => validate_config(config_path),
        ConfigAction::Show => show_config(config_path),
        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn validate_config(config_path: &Path) -> Result<()> {
    println!();
    println!("Validating configuration...");
    println!("Path: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("ERROR: Configuration file not found");
        println!();
        println!("Create a configuration file at:");
        println!("  {}", config_path.display());
        println!();
        println!("Or specify a custom path with --config");
        return Ok(());
    }

    let config = match Config::load_from(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("ERROR: Configuration is invalid");
            println!();
            println!("Details: {:#}", e);
            println!();
            println!("Fix the configuration and run 'rqc config validate' again.");
            return Ok(());
        }
    };

    // Build the backend too, so missing collaborators show up here
    match Classifier::from_config(&config.classifier) {
        Ok(classifier) => {
            println!("Configuration is valid.");
            println!();
            println!("Summary:");
            println!(
                "  Station: {}",
                config.agent.station.as_deref().unwrap_or("(not set)")
            );
            println!("  Recipe index: {}", config.index_path().display());
            println!("  Validate recipes: {}", config.recipes.validate);
            println!("  Classifier: {}", classifier.method());
        }
        Err(e) => {
            println!("ERROR: Classifier cannot be built");
            println!();
            println!("Details: {}", e);
        }
    }

    println!();
    Ok(())
}

fn show_config(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        println!("Configuration file not found at: {}", config_path.display());
        println!("Using defaults:");
        println!();
        println!("{}", toml::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let content = std::fs::read_to_string(config_path)?;
    println!("{}", content);

    Ok(())
}
