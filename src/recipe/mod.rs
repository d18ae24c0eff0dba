//! Recipe loading.
//!
//! Recipes are JSONC files (JSON with `//` and `/* */` comments), one per
//! product and station. An index file maps recipe names to files, either as
//! a flat `{name: file}` object or as `{"current": {name: file}}`.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::RecipeError;
use crate::types::{Band, BandRole, FitLimits, PeakShape, Recipe, Thresholds};

#[derive(Debug, Deserialize)]
struct RawRecipe {
    recipe_name: String,
    recipe_version: String,
    station: String,
    #[serde(default)]
    bands: Vec<RawBand>,
    epsilon: f64,
    tau: f64,
    kappa_min: f64,
    snr_min: f64,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBand {
    name: String,
    center: f64,
    tol: f64,
    sigma: f64,
    role: String,
    window_range: RawWindow,
    #[serde(default)]
    fit_lims: Option<FitLimits>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default)]
    eta: Option<f64>,
    #[serde(default)]
    template: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    min: f64,
    max: f64,
}

impl RawBand {
    fn into_band(self) -> Result<Band, RecipeError> {
        let role = BandRole::from_token(&self.role).ok_or_else(|| RecipeError::UnknownRole {
            band: self.name.clone(),
            role: self.role.clone(),
        })?;
        let shape = self.peak_shape();

        let mut band = Band::new(
            self.name,
            self.center,
            self.tol,
            self.sigma,
            role,
            (self.window_range.min, self.window_range.max),
        )
        .with_shape(shape);
        band.fit_limits = self.fit_lims;
        band.notes = self.notes;
        Ok(band)
    }

    /// Unknown shapes, and templates without a curve, fall back to Gaussian.
    fn peak_shape(&self) -> PeakShape {
        let shape = self.shape.as_deref().unwrap_or("gaussian").to_lowercase();
        match shape.as_str() {
            "gaussian" => PeakShape::Gaussian,
            "pseudovoigt" => PeakShape::pseudo_voigt(self.eta),
            "template" => match &self.template {
                Some(curve) => PeakShape::Template {
                    curve: curve.clone(),
                },
                None => {
                    warn!(band = %self.name, "Template shape without a curve, using gaussian");
                    PeakShape::Gaussian
                }
            },
            other => {
                warn!(band = %self.name, shape = other, "Unknown peak shape, using gaussian");
                PeakShape::Gaussian
            }
        }
    }
}

impl RawRecipe {
    fn into_recipe(self) -> Result<Recipe, RecipeError> {
        let bands = self
            .bands
            .into_iter()
            .map(RawBand::into_band)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Recipe {
            name: self.recipe_name,
            version: self.recipe_version,
            station: self.station,
            bands,
            thresholds: Thresholds {
                epsilon: self.epsilon,
                tau: self.tau,
                kappa_min: self.kappa_min,
                snr_min: self.snr_min,
            },
            notes: self.notes,
        })
    }
}

/// Reads recipe and index files.
pub struct RecipeLoader {
    /// String literals first so comment markers inside them are kept.
    comment: Regex,
    validate: bool,
}

impl RecipeLoader {
    /// `validate` enables the numeric sanity checks of [`validate`].
    pub fn new(validate: bool) -> Result<Self, RecipeError> {
        Ok(Self {
            comment: Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|/\*.*?\*/|//[^\n]*"#)?,
            validate,
        })
    }

    /// Remove `/* */` and `//` comments outside string literals.
    pub fn strip_comments(&self, text: &str) -> String {
        self.comment
            .replace_all(text, |caps: &regex::Captures| {
                let matched = &caps[0];
                if matched.starts_with('"') {
                    matched.to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    }

    fn read_jsonc<T: DeserializeOwned>(&self, path: &Path) -> Result<T, RecipeError> {
        if !path.exists() {
            return Err(RecipeError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| RecipeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&self.strip_comments(&text)).map_err(|source| RecipeError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load one recipe file.
    pub fn load(&self, path: &Path) -> Result<Recipe, RecipeError> {
        let raw: RawRecipe = self.read_jsonc(path)?;
        let recipe = raw.into_recipe()?;
        if self.validate {
            validate(&recipe)?;
        }

        debug!(
            path = %path.display(),
            recipe = %recipe.name,
            version = %recipe.version,
            bands = recipe.bands.len(),
            "Recipe loaded"
        );
        Ok(recipe)
    }

    /// Recipe names and their files, resolved against the index directory.
    pub fn index_entries(&self, index_path: &Path) -> Result<BTreeMap<String, PathBuf>, RecipeError> {
        let index: serde_json::Value = self.read_jsonc(index_path)?;
        let base_dir = index_path.parent().unwrap_or_else(|| Path::new("."));

        let mapping = match index.get("current") {
            Some(serde_json::Value::Object(current)) => current,
            _ => index.as_object().ok_or_else(|| RecipeError::Invalid {
                recipe: index_path.display().to_string(),
                reason: "index must be a JSON object".to_string(),
            })?,
        };

        mapping
            .iter()
            .map(|(name, file)| {
                let file = file.as_str().ok_or_else(|| RecipeError::Invalid {
                    recipe: name.clone(),
                    reason: "index entry is not a file name".to_string(),
                })?;
                Ok::<_, RecipeError>((name.clone(), base_dir.join(file)))
            })
            .collect()
    }

    /// Load every recipe listed in an index file.
    pub fn load_index(&self, index_path: &Path) -> Result<BTreeMap<String, Recipe>, RecipeError> {
        self.index_entries(index_path)?
            .into_iter()
            .map(|(name, path)| Ok::<_, RecipeError>((name, self.load(&path)?)))
            .collect()
    }

    /// Resolve a recipe given either a file path or a name from the index.
    pub fn resolve(&self, name_or_path: &str, index_path: &Path) -> Result<PathBuf, RecipeError> {
        let direct = Path::new(name_or_path);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        self.index_entries(index_path)?
            .remove(name_or_path)
            .ok_or_else(|| RecipeError::UnknownRecipe(name_or_path.to_string()))
    }
}

/// Numeric sanity checks on a loaded recipe.
pub fn validate(recipe: &Recipe) -> Result<(), RecipeError> {
    let invalid = |reason: String| RecipeError::Invalid {
        recipe: recipe.name.clone(),
        reason,
    };

    if recipe.bands.is_empty() {
        return Err(invalid("recipe has no bands".to_string()));
    }

    let t = &recipe.thresholds;
    let unit_interval = [("epsilon", t.epsilon), ("tau", t.tau), ("kappa_min", t.kappa_min)];
    for (name, value) in unit_interval {
        if !(value > 0.0 && value <= 1.0) {
            return Err(invalid(format!("{} must be in (0, 1], got {}", name, value)));
        }
    }
    if !(t.snr_min > 0.0) {
        return Err(invalid(format!("snr_min must be positive, got {}", t.snr_min)));
    }

    for band in &recipe.bands {
        validate_band(band).map_err(|reason| invalid(format!("band {}: {}", band.name, reason)))?;
    }
    Ok(())
}

fn validate_band(band: &Band) -> Result<(), String> {
    if !(band.window_min < band.center && band.center < band.window_max) {
        return Err(format!(
            "center {} outside window [{}, {}]",
            band.center, band.window_min, band.window_max
        ));
    }
    if !(band.tol > 0.0) {
        return Err(format!("tol must be positive, got {}", band.tol));
    }
    if !(band.sigma > 0.0) {
        return Err(format!("sigma must be positive, got {}", band.sigma));
    }
    if band.window_max - band.window_min < band.tol {
        return Err(format!(
            "window span {} is narrower than tol {}",
            band.window_max - band.window_min,
            band.tol
        ));
    }
    Ok(())
}

/// SHA-256 of a recipe file, recorded in reports for traceability.
pub fn hash_file(path: &Path) -> Result<String, RecipeError> {
    let content = std::fs::read(path).map_err(|source| RecipeError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.thresholds;
        writeln!(f, "Recipe: {} (v{}) @ {}", self.name, self.version, self.station)?;
        writeln!(
            f,
            "  epsilon={:.3}  tau={:.3}  kappa_min={:.3}  snr_min={:.1}",
            t.epsilon, t.tau, t.kappa_min, t.snr_min
        )?;
        if let Some(notes) = &self.notes {
            writeln!(f, "  notes: {}", notes)?;
        }

        writeln!(f)?;
        writeln!(f, "  Bands:")?;
        writeln!(
            f,
            "    {:<14} {:>7} {:>7} {:>7} {:<10} {:<11} window",
            "name", "center", "tol", "sigma", "role", "shape"
        )?;
        write!(f, "    {}", "-".repeat(80))?;

        for band in &self.bands {
            let name: String = band.name.chars().take(14).collect();
            write!(
                f,
                "\n    {:<14} {:>7.1} {:>7.1} {:>7.1} {:<10} {:<11} [{:.1}, {:.1}]",
                name,
                band.center,
                band.tol,
                band.sigma,
                band.role.to_string(),
                band.shape.name(),
                band.window_min,
                band.window_max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ELECTROLYTE: &str = r#"
    // Electrolyte QC, station A1
    {
      "recipe_name": "electrolyte_qc",
      "recipe_version": "0.1.0",
      "station": "A1",
      /* global thresholds */
      "epsilon": 0.06,
      "tau": 0.65,
      "kappa_min": 0.60,
      "snr_min": 6.0,
      "bands": [
        {
          "name": "PF6",
          "center": 745.0, "tol": 8.0, "sigma": 6.0,
          "role": "must_have",
          "window_range": {"min": 730.0, "max": 760.0},
          "fit_lims": {"amp_min": 0.0}
        },
        {
          "name": "EC_ring_717",
          "center": 717.0, "tol": 10.0, "sigma": 7.0,
          "role": "watch",
          "shape": "PseudoVoigt", "eta": 0.3,
          "window_range": {"min": 700.0, "max": 735.0}
        },
        {
          "name": "H2O",
          "center": 1640.0, "tol": 15.0, "sigma": 10.0,
          "role": "must-not",
          "shape": "lorentzian",
          "window_range": {"min": 1600.0, "max": 1680.0}
        }
      ]
    }
    "#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_strip_comments() {
        let loader = RecipeLoader::new(false).unwrap();
        let text = "{\n  \"a\": 1, // one\n  /* two\n  lines */ \"b\": 2\n}";
        let value: serde_json::Value = serde_json::from_str(&loader.strip_comments(text)).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let loader = RecipeLoader::new(false).unwrap();
        let text = r#"{
  "notes": "see https://x.org /* not a comment */", // trailing
  "quoted": "say \"hi\" // still text"
}"#;
        let value: serde_json::Value = serde_json::from_str(&loader.strip_comments(text)).unwrap();
        assert_eq!(value["notes"], "see https://x.org /* not a comment */");
        assert_eq!(value["quoted"], "say \"hi\" // still text");
    }

    #[test]
    fn test_load_recipe() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "electrolyte_qc.jsonc", ELECTROLYTE);

        let recipe = RecipeLoader::new(true).unwrap().load(&path).unwrap();
        assert_eq!(recipe.name, "electrolyte_qc");
        assert_eq!(recipe.thresholds.snr_min, 6.0);
        assert_eq!(recipe.bands.len(), 3);

        let pf6 = &recipe.bands[0];
        assert_eq!(pf6.role, BandRole::MustHave);
        assert_eq!(pf6.shape, PeakShape::Gaussian);
        assert_eq!(pf6.fit_limits.and_then(|l| l.amp_min), Some(0.0));
        assert_eq!((pf6.window_min, pf6.window_max), (730.0, 760.0));

        assert_eq!(recipe.bands[1].shape, PeakShape::PseudoVoigt { eta: 0.3 });
        // unknown shape falls back
        assert_eq!(recipe.bands[2].shape, PeakShape::Gaussian);
        assert_eq!(recipe.bands[2].role, BandRole::MustNot);
    }

    #[test]
    fn test_template_without_curve_falls_back() {
        let band = RawBand {
            name: "T".into(),
            center: 10.0,
            tol: 1.0,
            sigma: 1.0,
            role: "anchor".into(),
            window_range: RawWindow { min: 5.0, max: 15.0 },
            fit_lims: None,
            notes: None,
            shape: Some("template".into()),
            eta: None,
            template: None,
        };
        assert_eq!(band.peak_shape(), PeakShape::Gaussian);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.jsonc", &ELECTROLYTE.replace("\"watch\"", "\"optional\""));
        let err = RecipeLoader::new(false).unwrap().load(&path).unwrap_err();
        assert!(matches!(err, RecipeError::UnknownRole { ref role, .. } if role == "optional"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = RecipeLoader::new(true)
            .unwrap()
            .load(&dir.path().join("nope.jsonc"))
            .unwrap_err();
        assert!(matches!(err, RecipeError::NotFound(_)));
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.jsonc", "{ \"recipe_name\": ");
        let err = RecipeLoader::new(true).unwrap().load(&path).unwrap_err();
        assert!(matches!(err, RecipeError::Parse { .. }));
    }

    #[test]
    fn test_validation() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "r.jsonc", &ELECTROLYTE.replace("\"epsilon\": 0.06", "\"epsilon\": 1.5"));

        let err = RecipeLoader::new(true).unwrap().load(&path).unwrap_err();
        assert!(matches!(err, RecipeError::Invalid { .. }));
        assert!(err.to_string().contains("epsilon"));

        // validation disabled
        assert!(RecipeLoader::new(false).unwrap().load(&path).is_ok());
    }

    #[test]
    fn test_band_validation() {
        let mut band = Band::new("PF6", 745.0, 8.0, 6.0, BandRole::MustHave, (730.0, 760.0));
        assert!(validate_band(&band).is_ok());

        band.center = 770.0;
        assert!(validate_band(&band).unwrap_err().contains("outside window"));

        band.center = 745.0;
        band.tol = 40.0;
        assert!(validate_band(&band).unwrap_err().contains("narrower"));

        band.tol = 8.0;
        band.sigma = 0.0;
        assert!(validate_band(&band).is_err());
    }

    #[test]
    fn test_index_styles() {
        let dir = TempDir::new().unwrap();
        write(&dir, "electrolyte_qc.jsonc", ELECTROLYTE);
        let loader = RecipeLoader::new(true).unwrap();

        let flat = write(&dir, "flat.jsonc", r#"{"electrolyte": "electrolyte_qc.jsonc"}"#);
        let recipes = loader.load_index(&flat).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes["electrolyte"].station, "A1");

        let current = write(
            &dir,
            "index.jsonc",
            r#"{
              "station_id": "A1",
              "version": "0.1.0",
              // active recipes
              "current": {"electrolyte_qc": "electrolyte_qc.jsonc"}
            }"#,
        );
        let entries = loader.index_entries(&current).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["electrolyte_qc"], dir.path().join("electrolyte_qc.jsonc"));
    }

    #[test]
    fn test_resolve_by_name_or_path() {
        let dir = TempDir::new().unwrap();
        let recipe_path = write(&dir, "electrolyte_qc.jsonc", ELECTROLYTE);
        let index = write(&dir, "index.jsonc", r#"{"current": {"electrolyte": "electrolyte_qc.jsonc"}}"#);
        let loader = RecipeLoader::new(true).unwrap();

        assert_eq!(loader.resolve("electrolyte", &index).unwrap(), recipe_path);
        let direct = recipe_path.to_string_lossy().to_string();
        assert_eq!(loader.resolve(&direct, &index).unwrap(), recipe_path);
        assert!(matches!(
            loader.resolve("cathode", &index),
            Err(RecipeError::UnknownRecipe(_))
        ));
    }

    #[test]
    fn test_hash_is_stable() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.jsonc", ELECTROLYTE);
        let b = write(&dir, "b.jsonc", ELECTROLYTE);
        let h = hash_file(&a).unwrap();
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_file(&b).unwrap());
    }

    #[test]
    fn test_display_layout() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "r.jsonc", ELECTROLYTE);
        let text = RecipeLoader::new(true).unwrap().load(&path).unwrap().to_string();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Recipe: electrolyte_qc (v0.1.0) @ A1");
        assert_eq!(lines[1], "  epsilon=0.060  tau=0.650  kappa_min=0.600  snr_min=6.0");
        assert!(lines.iter().any(|l| l.contains("PF6") && l.contains("must-have") && l.contains("[730.0, 760.0]")));
        assert!(lines.iter().any(|l| l.contains("pseudovoigt")));
    }
}
