//! Evaluate command - score one spectrum.

use anyhow::Result;
use std::path::Path;

use raman_qc::config::Config;
use raman_qc::types::SampleResult;

use super::Engine;

/// Run the evaluate command.
pub fn run(config: &Config, recipe: &str, spectrum: &Path, json: bool) -> Result<()> {
    let engine = Engine::load(config, recipe)?;
    let result = engine.evaluate_file(spectrum)?;

    if json {
        let report = engine.report(spectrum, result);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("File: {}", spectrum.display());
        println!("Recipe file: {}", engine.recipe_path.display());
        print!("{}", render(&result));
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

/// Human-readable band table and verdict.
pub fn render(result: &SampleResult) -> String {
    let recipe = &result.recipe;
    let mut out = String::new();

    out.push_str(&format!(
        "Recipe: {} (v{}) @ {}\n\n",
        recipe.name, recipe.version, recipe.station
    ));
    out.push_str(&format!(
        "  {:<14} {:<10} {:<13} {:>9} {:>8} {:>10} {:>7} {:>6} {:>6}\n",
        "band", "role", "label", "center", "offset", "snr", "rmse", "conf", "sim"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(91)));

    for band in &result.bands {
        let m = &band.metrics;
        let name: String = band.band.name.chars().take(14).collect();
        out.push_str(&format!(
            "  {:<14} {:<10} {:<13} {:>9} {:>8} {:>10.2} {:>7.3} {:>6.2} {:>6.2}\n",
            name,
            band.band.role.to_string(),
            band.label.as_str(),
            fmt_opt(m.center),
            fmt_opt(m.offset),
            m.snr,
            m.rmse,
            m.confidence,
            m.similarity
        ));
    }

    out.push_str(&format!("\nDecision: {}\n", result.decision));
    if !result.reasons.is_empty() {
        out.push_str("Reasons:\n");
        for reason in &result.reasons {
            out.push_str(&format!("  - {}\n", reason));
        }
    }
    out
}
