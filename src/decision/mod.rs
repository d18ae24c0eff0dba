//! Band label decision.
//!
//! The label is a pure function of the band, the recipe thresholds and the
//! band metrics. Rules are evaluated in a fixed order and the first one that
//! fires wins; a must-not band whose peak was found is then overridden to
//! `MUST_NOT_HIT`. Reasons are collected independently for every violated
//! threshold, not only the deciding one.

pub mod aggregate;

use crate::types::{Band, BandLabel, BandMetrics, BandRole, Thresholds};

pub use aggregate::aggregate;

/// Reason attached when the must-not override fires.
pub const MUST_NOT_REASON: &str = "must-not band appears as peak";

type Predicate = fn(&Band, &Thresholds, &BandMetrics) -> bool;

struct LabelRule {
    label: BandLabel,
    fires: Predicate,
}

/// Ordered label rules. `PEAK_OK` applies when none fires.
const LABEL_RULES: [LabelRule; 4] = [
    LabelRule {
        label: BandLabel::Ood,
        fires: similarity_too_low,
    },
    LabelRule {
        label: BandLabel::BadQuality,
        fires: bad_signal_quality,
    },
    LabelRule {
        label: BandLabel::NoPeak,
        fires: confidence_too_low,
    },
    LabelRule {
        label: BandLabel::PeakDrifted,
        fires: drifted,
    },
];

struct ThresholdCheck {
    violated: Predicate,
    describe: fn(&Band, &Thresholds, &BandMetrics) -> String,
}

/// Every threshold that can contribute a reason, in reporting order.
const THRESHOLD_CHECKS: [ThresholdCheck; 5] = [
    ThresholdCheck {
        violated: similarity_too_low,
        describe: describe_similarity,
    },
    ThresholdCheck {
        violated: snr_too_low,
        describe: describe_snr,
    },
    ThresholdCheck {
        violated: rmse_too_high,
        describe: describe_rmse,
    },
    ThresholdCheck {
        violated: drifted,
        describe: describe_offset,
    },
    ThresholdCheck {
        violated: confidence_too_low,
        describe: describe_confidence,
    },
];

fn similarity_too_low(_: &Band, t: &Thresholds, m: &BandMetrics) -> bool {
    m.similarity < t.kappa_min
}

fn snr_too_low(_: &Band, t: &Thresholds, m: &BandMetrics) -> bool {
    m.snr < t.snr_min
}

fn rmse_too_high(_: &Band, t: &Thresholds, m: &BandMetrics) -> bool {
    m.rmse > t.epsilon
}

fn bad_signal_quality(b: &Band, t: &Thresholds, m: &BandMetrics) -> bool {
    snr_too_low(b, t, m) || rmse_too_high(b, t, m)
}

fn confidence_too_low(_: &Band, t: &Thresholds, m: &BandMetrics) -> bool {
    m.confidence < t.tau
}

/// An undefined offset (empty window) never counts as drift.
fn drifted(b: &Band, _: &Thresholds, m: &BandMetrics) -> bool {
    m.offset.is_some_and(|offset| offset.abs() > b.tol)
}

fn describe_similarity(_: &Band, t: &Thresholds, m: &BandMetrics) -> String {
    format!("similarity<{:.2} (got {:.2})", t.kappa_min, m.similarity)
}

fn describe_snr(_: &Band, t: &Thresholds, m: &BandMetrics) -> String {
    format!("SNR<{:.1} (got {:.2})", t.snr_min, m.snr)
}

fn describe_rmse(_: &Band, t: &Thresholds, m: &BandMetrics) -> String {
    format!("RMSE>{:.3} (got {:.3})", t.epsilon, m.rmse)
}

fn describe_offset(b: &Band, _: &Thresholds, m: &BandMetrics) -> String {
    format!("|offset|>{:.1} (got {:.2})", b.tol, m.offset.unwrap_or(f64::NAN))
}

fn describe_confidence(_: &Band, t: &Thresholds, m: &BandMetrics) -> String {
    format!("confidence<{:.2} (got {:.2})", t.tau, m.confidence)
}

/// Label plus the reasons behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDecision {
    pub label: BandLabel,
    pub reasons: Vec<String>,
}

/// Decide the label of one band and explain every violated threshold.
pub fn decide(band: &Band, thresholds: &Thresholds, metrics: &BandMetrics) -> LabelDecision {
    let label = decide_label(band, thresholds, metrics);

    let mut reasons = threshold_reasons(band, thresholds, metrics);
    if label == BandLabel::MustNotHit {
        reasons.push(MUST_NOT_REASON.to_string());
    }

    LabelDecision { label, reasons }
}

/// First matching rule wins, then the must-not override applies.
pub fn decide_label(band: &Band, thresholds: &Thresholds, metrics: &BandMetrics) -> BandLabel {
    let base = LABEL_RULES
        .iter()
        .find(|rule| (rule.fires)(band, thresholds, metrics))
        .map(|rule| rule.label)
        .unwrap_or(BandLabel::PeakOk);

    if band.role == BandRole::MustNot && base.is_peak() {
        BandLabel::MustNotHit
    } else {
        base
    }
}

/// One reason per violated threshold.
pub fn threshold_reasons(band: &Band, thresholds: &Thresholds, metrics: &BandMetrics) -> Vec<String> {
    THRESHOLD_CHECKS
        .iter()
        .filter(|check| (check.violated)(band, thresholds, metrics))
        .map(|check| (check.describe)(band, thresholds, metrics))
        .collect()
}
