//! Composite primer-pair quality scoring.
//!
//! Every thermodynamic/structural feature is mapped through a documented
//! piecewise-linear band function into [0, 100], then combined with
//! mode-specific weights. Critical-band membership is counted separately
//! and subtracts a fixed penalty from the composite, yielding the
//! effective score. All thresholds, weights and tier cut points live in
//! [`ScoringConfig`] and are injected, never global.

use crate::binding::SequenceAligner;
use crate::error::DesignError;
use crate::folding::{Severity, StructureFolder};
use crate::template::{reverse_complement, Direction, Template};
use crate::thermodynamics::ThermodynamicCalculator;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::HashMap;

/// What the primer pair is for; selects the weight table and, for the
/// golden-gate/assembly modes, switches Tm/GC scoring to the annealing
/// region of tailed primers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesignMode {
    Amplification,
    Mutagenesis,
    Sequencing,
    GoldenGate,
    Assembly,
}

/// Per-feature weights; must sum to 1 per mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub tm: f64,
    pub gc: f64,
    pub delta_tm: f64,
    pub hairpin: f64,
    pub self_dimer: f64,
    pub heterodimer: f64,
    pub off_target: f64,
}

impl FeatureWeights {
    pub fn sum(&self) -> f64 {
        self.tm
            + self.gc
            + self.delta_tm
            + self.hairpin
            + self.self_dimer
            + self.heterodimer
            + self.off_target
    }
}

/// Tm deviation bands in °C away from the target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TmBands {
    pub ideal_offset: f64,
    pub acceptable_offset: f64,
    pub poor_offset: f64,
}

/// GC-fraction bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GcBands {
    pub ideal_lo: f64,
    pub ideal_hi: f64,
    pub acceptable_lo: f64,
    pub acceptable_hi: f64,
    pub critical_lo: f64,
    pub critical_hi: f64,
}

/// |ΔTm| bands in °C.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeltaTmBands {
    pub ideal: f64,
    pub acceptable: f64,
}

/// ΔG bands in kcal/mol for a structure feature; values at or below
/// `critical_dg` are critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StructureBands {
    pub ideal_dg: f64,
    pub critical_dg: f64,
}

/// Quality-tier cut points over the composite score; must be strictly
/// decreasing from excellent to marginal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierCutoffs {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
    pub marginal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Poor,
    Marginal,
    Acceptable,
    Good,
    Excellent,
}

impl TierCutoffs {
    pub fn tier(&self, score: f64) -> QualityTier {
        if score >= self.excellent {
            QualityTier::Excellent
        } else if score >= self.good {
            QualityTier::Good
        } else if score >= self.acceptable {
            QualityTier::Acceptable
        } else if score >= self.marginal {
            QualityTier::Marginal
        } else {
            QualityTier::Poor
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde_as(as = "Vec<(_, _)>")]
    pub weights: HashMap<DesignMode, FeatureWeights>,
    pub tm: TmBands,
    pub gc: GcBands,
    pub delta_tm: DeltaTmBands,
    pub hairpin: StructureBands,
    pub dimer: StructureBands,
    pub tiers: TierCutoffs,
    /// Subtracted from the composite once per critical feature.
    pub critical_penalty: f64,
    /// Off-target hits at or above this count are critical.
    pub off_target_critical: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(
            DesignMode::Amplification,
            FeatureWeights {
                tm: 0.20,
                gc: 0.10,
                delta_tm: 0.20,
                hairpin: 0.125,
                self_dimer: 0.125,
                heterodimer: 0.15,
                off_target: 0.10,
            },
        );
        weights.insert(
            DesignMode::Mutagenesis,
            FeatureWeights {
                tm: 0.15,
                gc: 0.10,
                delta_tm: 0.25,
                hairpin: 0.15,
                self_dimer: 0.125,
                heterodimer: 0.125,
                off_target: 0.10,
            },
        );
        weights.insert(
            DesignMode::Sequencing,
            FeatureWeights {
                tm: 0.25,
                gc: 0.15,
                delta_tm: 0.0,
                hairpin: 0.20,
                self_dimer: 0.20,
                heterodimer: 0.0,
                off_target: 0.20,
            },
        );
        weights.insert(
            DesignMode::GoldenGate,
            FeatureWeights {
                tm: 0.20,
                gc: 0.10,
                delta_tm: 0.15,
                hairpin: 0.20,
                self_dimer: 0.15,
                heterodimer: 0.15,
                off_target: 0.05,
            },
        );
        weights.insert(
            DesignMode::Assembly,
            FeatureWeights {
                tm: 0.20,
                gc: 0.10,
                delta_tm: 0.15,
                hairpin: 0.20,
                self_dimer: 0.15,
                heterodimer: 0.15,
                off_target: 0.05,
            },
        );

        Self {
            weights,
            tm: TmBands {
                ideal_offset: 1.0,
                acceptable_offset: 3.0,
                poor_offset: 8.0,
            },
            gc: GcBands {
                ideal_lo: 0.40,
                ideal_hi: 0.60,
                acceptable_lo: 0.30,
                acceptable_hi: 0.70,
                critical_lo: 0.25,
                critical_hi: 0.75,
            },
            delta_tm: DeltaTmBands {
                ideal: 2.0,
                acceptable: 5.0,
            },
            hairpin: StructureBands {
                ideal_dg: -2.0,
                critical_dg: -4.0,
            },
            dimer: StructureBands {
                ideal_dg: -5.0,
                critical_dg: -9.0,
            },
            tiers: TierCutoffs {
                excellent: 90.0,
                good: 75.0,
                acceptable: 60.0,
                marginal: 40.0,
            },
            critical_penalty: 15.0,
            off_target_critical: 2,
        }
    }
}

impl ScoringConfig {
    /// Rejects weight tables that are missing a mode or do not sum to 1,
    /// and tier tables that are not strictly decreasing.
    pub fn validate(&self) -> Result<(), DesignError> {
        for mode in [
            DesignMode::Amplification,
            DesignMode::Mutagenesis,
            DesignMode::Sequencing,
            DesignMode::GoldenGate,
            DesignMode::Assembly,
        ] {
            if !self.weights.contains_key(&mode) {
                return Err(DesignError::InvalidSequence(format!(
                    "no feature weights configured for {mode:?}"
                )));
            }
        }
        for (mode, weights) in &self.weights {
            if (weights.sum() - 1.0).abs() > 1e-6 {
                return Err(DesignError::InvalidSequence(format!(
                    "feature weights for {mode:?} sum to {}, expected 1.0",
                    weights.sum()
                )));
            }
        }
        let t = &self.tiers;
        if !(t.excellent > t.good && t.good > t.acceptable && t.acceptable > t.marginal) {
            return Err(DesignError::InvalidSequence(
                "quality tier cut points must be strictly decreasing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-primer thermodynamic/structural facts feeding the scorer.
///
/// For golden-gate/assembly primers `tm` and `gc_fraction` describe the
/// annealing region only; `tail_len` records the non-binding 5' part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimerFeatures {
    pub tm: f64,
    pub gc_fraction: f64,
    pub hairpin_dg: f64,
    pub hairpin_severity: Severity,
    pub self_dimer_dg: f64,
    pub self_dimer_severity: Severity,
    pub anneal_len: usize,
    pub tail_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairFeatures {
    pub forward: PrimerFeatures,
    pub reverse: PrimerFeatures,
    pub heterodimer_dg: f64,
    pub heterodimer_severity: Severity,
    pub delta_tm: f64,
    pub off_target_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureScores {
    pub tm: f64,
    pub gc: f64,
    pub delta_tm: f64,
    pub hairpin: f64,
    pub self_dimer: f64,
    pub heterodimer: f64,
    pub off_target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairScore {
    pub composite_score: f64,
    pub effective_score: f64,
    pub quality_tier: QualityTier,
    pub critical_warnings: usize,
    pub feature_scores: FeatureScores,
    pub warnings: Vec<String>,
}

// ── Band functions ──────────────────────────────────────────────────

fn lerp(from_score: f64, to_score: f64, fraction: f64) -> f64 {
    from_score + (to_score - from_score) * fraction
}

pub fn score_tm(tm: f64, target: f64, bands: &TmBands) -> f64 {
    let d = (tm - target).abs();
    if d <= bands.ideal_offset {
        100.0
    } else if d <= bands.acceptable_offset {
        lerp(
            100.0,
            70.0,
            (d - bands.ideal_offset) / (bands.acceptable_offset - bands.ideal_offset),
        )
    } else if d <= bands.poor_offset {
        lerp(
            70.0,
            20.0,
            (d - bands.acceptable_offset) / (bands.poor_offset - bands.acceptable_offset),
        )
    } else {
        (20.0 - 5.0 * (d - bands.poor_offset)).max(0.0)
    }
}

pub fn score_gc(gc: f64, bands: &GcBands) -> f64 {
    if gc >= bands.ideal_lo && gc <= bands.ideal_hi {
        100.0
    } else if gc >= bands.acceptable_lo && gc < bands.ideal_lo {
        lerp(
            60.0,
            100.0,
            (gc - bands.acceptable_lo) / (bands.ideal_lo - bands.acceptable_lo),
        )
    } else if gc > bands.ideal_hi && gc <= bands.acceptable_hi {
        lerp(
            100.0,
            60.0,
            (gc - bands.ideal_hi) / (bands.acceptable_hi - bands.ideal_hi),
        )
    } else if gc < bands.acceptable_lo {
        (60.0 - 400.0 * (bands.acceptable_lo - gc)).max(0.0)
    } else {
        (60.0 - 400.0 * (gc - bands.acceptable_hi)).max(0.0)
    }
}

pub fn score_delta_tm(delta: f64, bands: &DeltaTmBands) -> f64 {
    if delta <= bands.ideal {
        100.0
    } else if delta <= bands.acceptable {
        lerp(
            100.0,
            60.0,
            (delta - bands.ideal) / (bands.acceptable - bands.ideal),
        )
    } else {
        (60.0 - 8.0 * (delta - bands.acceptable)).max(0.0)
    }
}

pub fn score_structure(dg: f64, bands: &StructureBands, critical_floor: f64) -> f64 {
    if dg >= bands.ideal_dg {
        100.0
    } else if dg > bands.critical_dg {
        lerp(
            100.0,
            critical_floor,
            (bands.ideal_dg - dg) / (bands.ideal_dg - bands.critical_dg),
        )
    } else {
        let span = bands.ideal_dg - bands.critical_dg;
        (critical_floor - (bands.critical_dg - dg) * critical_floor / span).max(0.0)
    }
}

pub fn score_off_target(count: usize) -> f64 {
    match count {
        0 => 100.0,
        1 => 40.0,
        2 => 10.0,
        _ => 0.0,
    }
}

/// Combines per-primer and pair features into the composite score.
#[derive(Clone, Debug, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
    calculator: ThermodynamicCalculator,
    folder: StructureFolder,
    aligner: SequenceAligner,
}

impl CompositeScorer {
    pub fn new(
        config: ScoringConfig,
        calculator: ThermodynamicCalculator,
        folder: StructureFolder,
    ) -> Result<Self, DesignError> {
        config.validate()?;
        Ok(Self {
            config,
            calculator,
            folder,
            aligner: SequenceAligner::new(),
        })
    }

    #[inline(always)]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    #[inline(always)]
    pub fn calculator(&self) -> &ThermodynamicCalculator {
        &self.calculator
    }

    #[inline(always)]
    pub fn folder(&self) -> &StructureFolder {
        &self.folder
    }

    /// Derives a primer's features. Folding is best-effort: a fold failure
    /// degrades that feature to "no structure" with a warning instead of
    /// aborting the analysis.
    pub fn primer_features(
        &self,
        template: &Template,
        seq: &[u8],
        direction: Direction,
        mode: DesignMode,
    ) -> Result<(PrimerFeatures, Vec<String>), DesignError> {
        let mut warnings = vec![];

        let (anneal, tail_len) = self.annealing_split(template, seq, direction, mode, &mut warnings);
        let tm = self.calculator.tm_of_bytes(&anneal)?;
        let gc_fraction = self.calculator.gc_fraction(&anneal);

        let (hairpin_dg, hairpin_severity) = match self.folder.fold(seq) {
            Ok(fold) => {
                let severity = self.folder.classify_structure_severity(&fold, seq.len());
                (fold.delta_g, severity)
            }
            Err(e) => {
                warnings.push(format!("hairpin fold unavailable: {e}"));
                (0.0, Severity::None)
            }
        };

        let (self_dimer_dg, self_dimer_severity) = match self.folder.fold_self_dimer(seq) {
            Ok(fold) => {
                let severity = self.folder.classify_dimer_severity(&fold, seq.len(), seq.len());
                (fold.delta_g, severity)
            }
            Err(e) => {
                warnings.push(format!("self-dimer fold unavailable: {e}"));
                (0.0, Severity::None)
            }
        };

        Ok((
            PrimerFeatures {
                tm,
                gc_fraction,
                hairpin_dg,
                hairpin_severity,
                self_dimer_dg,
                self_dimer_severity,
                anneal_len: anneal.len(),
                tail_len,
            },
            warnings,
        ))
    }

    /// Derives all pair-level features for two primers on one template.
    pub fn pair_features(
        &self,
        template: &Template,
        forward_seq: &[u8],
        reverse_seq: &[u8],
        mode: DesignMode,
        off_target_count: Option<usize>,
    ) -> Result<(PairFeatures, Vec<String>), DesignError> {
        let (forward, mut warnings) =
            self.primer_features(template, forward_seq, Direction::Forward, mode)?;
        let (reverse, rev_warnings) =
            self.primer_features(template, reverse_seq, Direction::Reverse, mode)?;
        warnings.extend(rev_warnings);

        let (heterodimer_dg, heterodimer_severity) =
            match self.folder.fold_dimer(forward_seq, reverse_seq) {
                Ok(fold) => {
                    let severity = self.folder.classify_dimer_severity(
                        &fold,
                        forward_seq.len(),
                        reverse_seq.len(),
                    );
                    (fold.delta_g, severity)
                }
                Err(e) => {
                    warnings.push(format!("heterodimer fold unavailable: {e}"));
                    (0.0, Severity::None)
                }
            };

        let delta_tm = (forward.tm - reverse.tm).abs();
        Ok((
            PairFeatures {
                forward,
                reverse,
                heterodimer_dg,
                heterodimer_severity,
                delta_tm,
                off_target_count,
            },
            warnings,
        ))
    }

    /// Maps pair features to the composite/effective score and tier.
    pub fn score_pair(&self, features: &PairFeatures, mode: DesignMode, tm_target: f64) -> PairScore {
        let c = &self.config;
        let weights = c.weights[&mode];

        let tm_score = (score_tm(features.forward.tm, tm_target, &c.tm)
            + score_tm(features.reverse.tm, tm_target, &c.tm))
            / 2.0;
        let gc_score = (score_gc(features.forward.gc_fraction, &c.gc)
            + score_gc(features.reverse.gc_fraction, &c.gc))
            / 2.0;
        let delta_tm_score = score_delta_tm(features.delta_tm, &c.delta_tm);
        // the worse primer governs structure features
        let hairpin_score = score_structure(features.forward.hairpin_dg, &c.hairpin, 50.0)
            .min(score_structure(features.reverse.hairpin_dg, &c.hairpin, 50.0));
        let self_dimer_score = score_structure(features.forward.self_dimer_dg, &c.dimer, 40.0)
            .min(score_structure(features.reverse.self_dimer_dg, &c.dimer, 40.0));
        let heterodimer_score = score_structure(features.heterodimer_dg, &c.dimer, 40.0);
        let off_target_score = features.off_target_count.map(score_off_target).unwrap_or(100.0);

        let feature_scores = FeatureScores {
            tm: tm_score,
            gc: gc_score,
            delta_tm: delta_tm_score,
            hairpin: hairpin_score,
            self_dimer: self_dimer_score,
            heterodimer: heterodimer_score,
            off_target: off_target_score,
        };

        let composite_score = weights.tm * tm_score
            + weights.gc * gc_score
            + weights.delta_tm * delta_tm_score
            + weights.hairpin * hairpin_score
            + weights.self_dimer * self_dimer_score
            + weights.heterodimer * heterodimer_score
            + weights.off_target * off_target_score;

        let mut critical_warnings = 0;
        let mut warnings = vec![];

        if (features.forward.tm - tm_target).abs() > c.tm.poor_offset
            || (features.reverse.tm - tm_target).abs() > c.tm.poor_offset
        {
            critical_warnings += 1;
            warnings.push("primer Tm far from target".to_string());
        }
        if outside_gc_critical(&features.forward, &c.gc) || outside_gc_critical(&features.reverse, &c.gc)
        {
            critical_warnings += 1;
            warnings.push("primer GC content extreme".to_string());
        }
        if features.delta_tm > c.delta_tm.acceptable {
            critical_warnings += 1;
            warnings.push(format!(
                "Tm difference {:.1} °C exceeds {:.1} °C",
                features.delta_tm, c.delta_tm.acceptable
            ));
        }
        if features.forward.hairpin_severity == Severity::Critical
            || features.reverse.hairpin_severity == Severity::Critical
        {
            critical_warnings += 1;
            warnings.push("stable hairpin buries a 3' end".to_string());
        }
        if features.forward.self_dimer_severity == Severity::Critical
            || features.reverse.self_dimer_severity == Severity::Critical
        {
            critical_warnings += 1;
            warnings.push("stable self-dimer involves a 3' end".to_string());
        }
        if features.heterodimer_severity == Severity::Critical {
            critical_warnings += 1;
            warnings.push("stable primer-primer dimer involves a 3' end".to_string());
        }
        if features
            .off_target_count
            .map(|n| n >= c.off_target_critical)
            .unwrap_or(false)
        {
            critical_warnings += 1;
            warnings.push("multiple off-target binding sites".to_string());
        }

        let effective_score =
            (composite_score - c.critical_penalty * critical_warnings as f64).max(0.0);

        PairScore {
            composite_score,
            effective_score,
            quality_tier: c.tiers.tier(composite_score),
            critical_warnings,
            feature_scores,
            warnings,
        }
    }

    /// For golden-gate/assembly primers, splits off the non-binding 5'
    /// tail so Tm/GC describe the annealing region; other modes use the
    /// whole primer.
    fn annealing_split(
        &self,
        template: &Template,
        seq: &[u8],
        direction: Direction,
        mode: DesignMode,
        warnings: &mut Vec<String>,
    ) -> (Vec<u8>, usize) {
        if !matches!(mode, DesignMode::GoldenGate | DesignMode::Assembly) {
            return (seq.to_vec(), 0);
        }

        let located = match direction {
            Direction::Forward => self.aligner.locate_annealing_region(template, seq),
            Direction::Reverse => {
                // a reverse primer's annealing region matches the reverse
                // strand; search its reverse complement space
                let rc = reverse_complement(template.forward());
                match String::from_utf8(rc)
                    .ok()
                    .and_then(|s| Template::from_sequence(&s).ok())
                {
                    Some(rc_template) => self.aligner.locate_annealing_region(&rc_template, seq),
                    None => None,
                }
            }
        };

        match located {
            Some((tail_len, _)) => (seq[tail_len..].to_vec(), tail_len),
            None => {
                warnings.push(
                    "annealing region not found; scoring full primer sequence".to_string(),
                );
                (seq.to_vec(), 0)
            }
        }
    }
}

fn outside_gc_critical(primer: &PrimerFeatures, bands: &GcBands) -> bool {
    primer.gc_fraction < bands.critical_lo || primer.gc_fraction > bands.critical_hi
}

#[cfg(test)]
mod tests {
    use super::*;

    const T60: &str = "GCAGTCCAGGCTACGGTCACATTTAGCATAAGTCAATTGAGACGTTGGACGCTAAGCCAG";

    fn scorer() -> CompositeScorer {
        CompositeScorer::default()
    }

    fn plain_features(tm_f: f64, tm_r: f64) -> PairFeatures {
        let primer = |tm: f64| PrimerFeatures {
            tm,
            gc_fraction: 0.5,
            hairpin_dg: 0.0,
            hairpin_severity: Severity::None,
            self_dimer_dg: 0.0,
            self_dimer_severity: Severity::None,
            anneal_len: 20,
            tail_len: 0,
        };
        PairFeatures {
            forward: primer(tm_f),
            reverse: primer(tm_r),
            heterodimer_dg: 0.0,
            heterodimer_severity: Severity::None,
            delta_tm: (tm_f - tm_r).abs(),
            off_target_count: Some(0),
        }
    }

    #[test]
    fn test_band_knots() {
        let c = ScoringConfig::default();
        assert_eq!(score_tm(60.0, 60.0, &c.tm), 100.0);
        assert_eq!(score_tm(63.0, 60.0, &c.tm), 70.0);
        assert_eq!(score_tm(68.0, 60.0, &c.tm), 20.0);
        assert_eq!(score_gc(0.5, &c.gc), 100.0);
        assert_eq!(score_gc(0.3, &c.gc), 60.0);
        assert_eq!(score_delta_tm(1.0, &c.delta_tm), 100.0);
        assert_eq!(score_delta_tm(5.0, &c.delta_tm), 60.0);
        assert_eq!(score_structure(-1.0, &c.hairpin, 50.0), 100.0);
        assert_eq!(score_structure(-4.0, &c.hairpin, 50.0), 50.0);
        assert_eq!(score_off_target(0), 100.0);
        assert_eq!(score_off_target(3), 0.0);
    }

    #[test]
    fn test_ideal_pair_scores_high() {
        let s = scorer();
        let score = s.score_pair(&plain_features(60.0, 60.5), DesignMode::Amplification, 60.0);
        assert!(score.composite_score > 95.0);
        assert_eq!(score.critical_warnings, 0);
        assert_eq!(score.effective_score, score.composite_score);
        assert_eq!(score.quality_tier, QualityTier::Excellent);
    }

    #[test]
    fn test_delta_tm_critical_penalty() {
        let s = scorer();
        let score = s.score_pair(&plain_features(55.0, 66.0), DesignMode::Amplification, 60.0);
        assert!(score.critical_warnings >= 1);
        assert!(score.effective_score < score.composite_score);
        assert!(score
            .warnings
            .iter()
            .any(|w| w.contains("Tm difference")));
    }

    #[test]
    fn test_critical_structure_counted_once_per_feature() {
        let s = scorer();
        let mut features = plain_features(60.0, 60.0);
        features.forward.hairpin_dg = -5.0;
        features.forward.hairpin_severity = Severity::Critical;
        features.reverse.hairpin_dg = -5.5;
        features.reverse.hairpin_severity = Severity::Critical;
        let score = s.score_pair(&features, DesignMode::Amplification, 60.0);
        // both primers critical for the same feature -> one warning
        assert_eq!(score.critical_warnings, 1);
    }

    #[test]
    fn test_effective_score_floors_at_zero() {
        let s = scorer();
        let mut features = plain_features(40.0, 75.0);
        features.forward.gc_fraction = 0.1;
        features.forward.hairpin_severity = Severity::Critical;
        features.forward.self_dimer_severity = Severity::Critical;
        features.heterodimer_severity = Severity::Critical;
        features.off_target_count = Some(4);
        let score = s.score_pair(&features, DesignMode::Amplification, 60.0);
        assert!(score.critical_warnings >= 5);
        assert_eq!(
            score.effective_score,
            (score.composite_score - 15.0 * score.critical_warnings as f64).max(0.0)
        );
    }

    #[test]
    fn test_tier_boundaries_match_config() {
        let tiers = ScoringConfig::default().tiers;
        assert_eq!(tiers.tier(90.0), QualityTier::Excellent);
        assert_eq!(tiers.tier(89.99), QualityTier::Good);
        assert_eq!(tiers.tier(75.0), QualityTier::Good);
        assert_eq!(tiers.tier(60.0), QualityTier::Acceptable);
        assert_eq!(tiers.tier(40.0), QualityTier::Marginal);
        assert_eq!(tiers.tier(39.99), QualityTier::Poor);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScoringConfig::default().validate().is_ok());

        let mut bad = ScoringConfig::default();
        bad.tiers.good = 95.0;
        assert!(bad.validate().is_err());

        let mut bad = ScoringConfig::default();
        bad.weights.get_mut(&DesignMode::Amplification).unwrap().tm = 0.5;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_golden_gate_scores_annealing_region_only() {
        let s = scorer();
        let template = Template::from_sequence(T60).unwrap();
        let mut primer = b"GGGGGGGG".to_vec();
        primer.extend_from_slice(&template.forward()[25..43]);

        let (gg, _) = s
            .primer_features(&template, &primer, Direction::Forward, DesignMode::GoldenGate)
            .unwrap();
        assert_eq!(gg.tail_len, 8);
        assert_eq!(gg.anneal_len, 18);
        let anneal_gc = s.calculator.gc_fraction(&template.forward()[25..43]);
        assert_eq!(gg.gc_fraction, anneal_gc);

        let (amp, _) = s
            .primer_features(
                &template,
                &primer,
                Direction::Forward,
                DesignMode::Amplification,
            )
            .unwrap();
        assert_eq!(amp.tail_len, 0);
        assert!(amp.gc_fraction > gg.gc_fraction);
    }

    #[test]
    fn test_weight_tables_sum_to_one() {
        for weights in ScoringConfig::default().weights.values() {
            assert!((weights.sum() - 1.0).abs() < 1e-9);
        }
    }
}
