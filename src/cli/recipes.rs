//! Recipe command - list, show and validate recipes.

use anyhow::{Context, Result};

use raman_qc::config::Config;
use raman_qc::recipe::{self, RecipeLoader};

use crate::cli::RecipeAction;

/// Run the recipe command.
pub fn run(config: &Config, action: RecipeAction) -> Result<()> {
    match action {
        RecipeAction::List => list(config),
        RecipeAction::Show { name } => show(config, &name),
        RecipeAction::Validate => validate(config),
    }
}

fn list(config: &Config) -> Result<()> {
    let index = config.index_path();
    let loader = RecipeLoader::new(false)?;
    let entries = loader
        .index_entries(&index)
        .with_context(|| format!("Failed to read recipe index {}", index.display()))?;

    println!();
    println!("Recipes ({})", index.display());
    println!("{}", "=".repeat(60));

    if entries.is_empty() {
        println!("No recipes listed.");
        return Ok(());
    }

    for (name, path) in &entries {
        match loader.load(path) {
            Ok(r) => println!(
                "  {:<20} v{:<8} {:<8} {} bands",
                name,
                r.version,
                r.station,
                r.bands.len()
            ),
            Err(e) => println!("  {:<20} ERROR: {}", name, e),
        }
    }
    println!();
    Ok(())
}

fn show(config: &Config, name: &str) -> Result<()> {
    let loader = RecipeLoader::new(config.recipes.validate)?;
    let path = loader.resolve(name, &config.index_path())?;
    let recipe = loader
        .load(&path)
        .with_context(|| format!("Failed to load recipe {}", path.display()))?;

    println!();
    println!("{}", recipe);
    println!();
    println!("File:   {}", path.display());
    println!("SHA256: {}", recipe::hash_file(&path)?);
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    let index = config.index_path();
    let loader = RecipeLoader::new(true)?;
    let entries = loader
        .index_entries(&index)
        .with_context(|| format!("Failed to read recipe index {}", index.display()))?;

    println!();
    println!("Validating recipes in {}", index.display());
    println!();

    let mut invalid = 0;
    for (name, path) in &entries {
        match loader.load(path) {
            Ok(_) => println!("  [OK]    {}", name),
            Err(e) => {
                println!("  [ERROR] {}: {}", name, e);
                invalid += 1;
            }
        }
    }

    println!();
    if invalid > 0 {
        anyhow::bail!("{} of {} recipes are invalid", invalid, entries.len());
    }
    println!("All {} recipes are valid.", entries.len());
    Ok(())
}
