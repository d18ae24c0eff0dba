//! Spectrum input and band windowing.
//!
//! A spectrum is a pair of equal-length arrays: wavenumbers (cm^-1) and
//! Raman intensities. Windows are the order-preserved slices that fall
//! inside a band's `[window_min, window_max]` range.

use std::path::Path;
use tracing::{debug, warn};

use crate::error::SpectrumError;
use crate::types::Band;

/// A measured Raman spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub wavenumbers: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl Spectrum {
    pub fn new(wavenumbers: Vec<f64>, intensities: Vec<f64>) -> Result<Self, SpectrumError> {
        if wavenumbers.len() != intensities.len() {
            return Err(SpectrumError::LengthMismatch {
                wavenumbers: wavenumbers.len(),
                intensities: intensities.len(),
            });
        }
        Ok(Self {
            wavenumbers,
            intensities,
        })
    }

    /// Load a two-column CSV (wavenumber, intensity).
    ///
    /// Header rows and any row whose first two fields are not numeric are
    /// skipped; extra columns are ignored.
    pub fn from_csv_path(path: &Path) -> Result<Self, SpectrumError> {
        let file = std::fs::File::open(path).map_err(|e| SpectrumError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut wavenumbers = Vec::new();
        let mut intensities = Vec::new();
        let mut skipped = 0usize;

        for result in reader.records() {
            let record = result.map_err(|e| SpectrumError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let x = record.get(0).and_then(|s| s.parse::<f64>().ok());
            let y = record.get(1).and_then(|s| s.parse::<f64>().ok());

            match (x, y) {
                (Some(x), Some(y)) => {
                    wavenumbers.push(x);
                    intensities.push(y);
                }
                _ => skipped += 1,
            }
        }

        if wavenumbers.is_empty() {
            return Err(SpectrumError::Empty(path.display().to_string()));
        }

        debug!(
            path = %path.display(),
            points = wavenumbers.len(),
            skipped_rows = skipped,
            "Spectrum loaded"
        );

        Self::new(wavenumbers, intensities)
    }

    pub fn len(&self) -> usize {
        self.wavenumbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumbers.is_empty()
    }
}

/// The part of a spectrum relevant to one band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    pub wavenumbers: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.wavenumbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumbers.is_empty()
    }
}

/// Cut the samples with `window_min <= x <= window_max`, preserving order.
///
/// Only paired samples are considered; if the arrays differ in length the
/// surplus tail of the longer one is ignored. An empty window is valid.
pub fn extract_window(wavenumbers: &[f64], intensities: &[f64], band: &Band) -> Window {
    if wavenumbers.len() != intensities.len() {
        warn!(
            band = %band.name,
            wavenumbers = wavenumbers.len(),
            intensities = intensities.len(),
            "Spectrum arrays differ in length, using paired samples only"
        );
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = wavenumbers
        .iter()
        .zip(intensities)
        .filter(|(x, _)| band.contains(**x))
        .map(|(x, y)| (*x, *y))
        .unzip();

    Window {
        wavenumbers: xs,
        intensities: ys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandRole;
    use std::io::Write;

    fn band(window: (f64, f64)) -> Band {
        Band::new("B", (window.0 + window.1) / 2.0, 1.0, 1.0, BandRole::Watch, window)
    }

    #[test]
    fn test_window_is_inclusive_and_ordered() {
        let x: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..11).map(|i| (i * 10) as f64).collect();

        let w = extract_window(&x, &y, &band((4.0, 6.0)));
        assert_eq!(w.wavenumbers, vec![4.0, 5.0, 6.0]);
        assert_eq!(w.intensities, vec![40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_window_outside_spectrum_is_empty() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![1.0, 1.0, 1.0];

        let w = extract_window(&x, &y, &band((100.0, 200.0)));
        assert!(w.is_empty());
    }

    #[test]
    fn test_descending_axis_keeps_order() {
        let x = vec![10.0, 9.0, 8.0, 7.0];
        let y = vec![1.0, 2.0, 3.0, 4.0];

        let w = extract_window(&x, &y, &band((7.5, 9.5)));
        assert_eq!(w.wavenumbers, vec![9.0, 8.0]);
        assert_eq!(w.intensities, vec![2.0, 3.0]);
    }

    #[test]
    fn test_length_mismatch_uses_paired_samples() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![5.0, 6.0];

        let w = extract_window(&x, &y, &band((0.0, 10.0)));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_spectrum_new_rejects_mismatch() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, SpectrumError::LengthMismatch { .. }));
    }

    #[test]
    fn test_csv_loading_skips_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wavenumber,intensity").unwrap();
        writeln!(file, "100.0,0.5").unwrap();
        writeln!(file, "101.0, 0.7, extra").unwrap();
        writeln!(file, "102.0,0.2").unwrap();
        file.flush().unwrap();

        let spectrum = Spectrum::from_csv_path(file.path()).unwrap();
        assert_eq!(spectrum.wavenumbers, vec![100.0, 101.0, 102.0]);
        assert_eq!(spectrum.intensities, vec![0.5, 0.7, 0.2]);
    }

    #[test]
    fn test_csv_without_numbers_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        file.flush().unwrap();

        let err = Spectrum::from_csv_path(file.path()).unwrap_err();
        assert!(matches!(err, SpectrumError::Empty(_)));
    }
}
