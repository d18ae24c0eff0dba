//! Sample-level aggregation.
//!
//! Two passes over the band results. The RED pass checks every band and
//! collects every reason. The AMBER pass only runs when nothing turned the
//! sample RED, so its reasons never mix with RED ones.

use tracing::debug;

use crate::types::{BandLabel, BandResult, BandRole, Decision, Recipe, SampleResult};

struct SampleRule {
    fires: fn(&BandResult) -> bool,
    reason: fn(&BandResult) -> String,
}

const RED_RULES: [SampleRule; 2] = [
    SampleRule {
        fires: must_not_hit,
        reason: describe_must_not_hit,
    },
    SampleRule {
        fires: must_have_missing,
        reason: describe_must_have_missing,
    },
];

const AMBER_RULES: [SampleRule; 1] = [SampleRule {
    fires: needs_attention,
    reason: describe_attention,
}];

fn must_not_hit(r: &BandResult) -> bool {
    r.band.role == BandRole::MustNot && r.label == BandLabel::MustNotHit
}

fn must_have_missing(r: &BandResult) -> bool {
    r.band.role == BandRole::MustHave && matches!(r.label, BandLabel::NoPeak | BandLabel::Ood)
}

/// Any role, as long as nothing went RED.
fn needs_attention(r: &BandResult) -> bool {
    matches!(
        r.label,
        BandLabel::PeakDrifted | BandLabel::BadQuality | BandLabel::Ood
    )
}

fn describe_must_not_hit(r: &BandResult) -> String {
    format!("must-not band {} hit", r.band.name)
}

fn describe_must_have_missing(r: &BandResult) -> String {
    with_band_reasons(format!("must-have band {} is {}", r.band.name, r.label), r)
}

fn describe_attention(r: &BandResult) -> String {
    with_band_reasons(format!("band {} is {}", r.band.name, r.label), r)
}

fn with_band_reasons(head: String, r: &BandResult) -> String {
    if r.reasons.is_empty() {
        head
    } else {
        format!("{}: {}", head, r.reasons.join("; "))
    }
}

/// Reasons from every band that fires any of `rules`, in band order.
fn run_pass(rules: &[SampleRule], bands: &[BandResult]) -> Vec<String> {
    bands
        .iter()
        .flat_map(|result| {
            rules
                .iter()
                .filter(move |rule| (rule.fires)(result))
                .map(move |rule| (rule.reason)(result))
        })
        .collect()
}

/// Combine per-band results into the sample decision.
///
/// Band results are kept in recipe order. Zero bands yields GREEN.
pub fn aggregate(recipe: &Recipe, bands: Vec<BandResult>) -> SampleResult {
    let red = run_pass(&RED_RULES, &bands);

    let (decision, reasons) = if !red.is_empty() {
        (Decision::Red, red)
    } else {
        let amber = run_pass(&AMBER_RULES, &bands);
        if amber.is_empty() {
            (Decision::Green, Vec::new())
        } else {
            (Decision::Amber, amber)
        }
    };

    debug!(
        recipe = %recipe.name,
        bands = bands.len(),
        decision = %decision,
        reasons = reasons.len(),
        "Sample aggregated"
    );

    SampleResult {
        recipe: recipe.clone(),
        bands,
        decision,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Band, BandMetrics, Thresholds};

    fn recipe() -> Recipe {
        Recipe {
            name: "LFP_v1".into(),
            version: "1".into(),
            station: "line-3".into(),
            bands: Vec::new(),
            thresholds: Thresholds {
                epsilon: 0.1,
                tau: 0.6,
                kappa_min: 0.7,
                snr_min: 5.0,
            },
            notes: None,
        }
    }

    fn result(name: &str, role: BandRole, label: BandLabel, reasons: &[&str]) -> BandResult {
        BandResult {
            band: Band::new(name, 100.0, 5.0, 3.0, role, (80.0, 120.0)),
            label,
            metrics: BandMetrics {
                center: Some(100.0),
                offset: Some(0.0),
                snr: 10.0,
                rmse: 0.01,
                confidence: 0.9,
                similarity: 1.0,
            },
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_bands_is_green() {
        let s = aggregate(&recipe(), Vec::new());
        assert_eq!(s.decision, Decision::Green);
        assert!(s.reasons.is_empty());
        assert!(s.bands.is_empty());
    }

    #[test]
    fn test_all_ok_is_green() {
        let bands = vec![
            result("A", BandRole::MustHave, BandLabel::PeakOk, &[]),
            result("B", BandRole::MustNot, BandLabel::NoPeak, &["confidence<0.60 (got 0.10)"]),
            result("C", BandRole::Watch, BandLabel::NoPeak, &[]),
        ];
        let s = aggregate(&recipe(), bands);
        assert_eq!(s.decision, Decision::Green);
        assert!(s.reasons.is_empty());
    }

    #[test]
    fn test_must_not_hit_is_red() {
        let bands = vec![result(
            "Fe",
            BandRole::MustNot,
            BandLabel::MustNotHit,
            &["must-not band appears as peak"],
        )];
        let s = aggregate(&recipe(), bands);
        assert_eq!(s.decision, Decision::Red);
        assert_eq!(s.reasons, vec!["must-not band Fe hit".to_string()]);
    }

    #[test]
    fn test_red_collects_every_band() {
        let bands = vec![
            result("Fe", BandRole::MustNot, BandLabel::MustNotHit, &[]),
            result("PO4", BandRole::MustHave, BandLabel::NoPeak, &["confidence<0.60 (got 0.20)"]),
            result("C", BandRole::MustHave, BandLabel::Ood, &[]),
        ];
        let s = aggregate(&recipe(), bands);
        assert_eq!(s.decision, Decision::Red);
        assert_eq!(
            s.reasons,
            vec![
                "must-not band Fe hit".to_string(),
                "must-have band PO4 is NO_PEAK: confidence<0.60 (got 0.20)".to_string(),
                "must-have band C is OOD".to_string(),
            ]
        );
    }

    #[test]
    fn test_amber_reasons_absent_when_red() {
        let bands = vec![
            result("W", BandRole::Watch, BandLabel::BadQuality, &["SNR<5.0 (got 1.00)"]),
            result("Fe", BandRole::MustNot, BandLabel::MustNotHit, &[]),
        ];
        let s = aggregate(&recipe(), bands);
        assert_eq!(s.decision, Decision::Red);
        assert_eq!(s.reasons, vec!["must-not band Fe hit".to_string()]);
    }

    #[test]
    fn test_amber_for_any_role() {
        let bands = vec![
            result("A", BandRole::Anchor, BandLabel::PeakDrifted, &["|offset|>5.0 (got 7.00)"]),
            result("W", BandRole::Watch, BandLabel::BadQuality, &["SNR<5.0 (got 1.00)"]),
            result("N", BandRole::MustNot, BandLabel::Ood, &[]),
            result("H", BandRole::MustHave, BandLabel::PeakDrifted, &[]),
        ];
        let s = aggregate(&recipe(), bands);
        assert_eq!(s.decision, Decision::Amber);
        assert_eq!(s.reasons.len(), 4);
        assert_eq!(s.reasons[0], "band A is PEAK_DRIFTED: |offset|>5.0 (got 7.00)");
        assert!(s.reasons[1].contains("SNR<"));
        assert_eq!(s.reasons[2], "band N is OOD");
    }

    #[test]
    fn test_band_order_is_preserved() {
        let names = ["z", "a", "m"];
        let bands = names
            .iter()
            .map(|n| result(n, BandRole::Watch, BandLabel::PeakOk, &[]))
            .collect();
        let s = aggregate(&recipe(), bands);
        let got: Vec<&str> = s.bands.iter().map(|b| b.band.name.as_str()).collect();
        assert_eq!(got, names);
        assert_eq!(s.recipe.name, "LFP_v1");
    }
}
