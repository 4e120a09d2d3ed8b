//! Candidate generation and search for primer-pair design.
//!
//! Given an edit specification and design options, the engine enumerates
//! primer placements around the edit region, filters them against the hard
//! Tm/length/GC constraints, scores the survivors with the composite
//! scorer, and returns the best pair plus ranked alternatives.
//!
//! Two mutagenesis layouts are supported and are explicit input, never
//! inferred: `BackToBack` (the forward primer carries the replacement as a
//! 5' tail and anneals immediately downstream of the edit, the reverse
//! primer abuts the edit without overlapping it) and `Overlapping` (both
//! primers span the edit region symmetrically).

use crate::error::DesignError;
use crate::scoring::{
    CompositeScorer, DesignMode, PairFeatures, PairScore, PrimerFeatures, QualityTier,
};
use crate::template::{clean_sequence, reverse_complement, Direction, Template};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Templates below this length cannot host a sensible primer pair.
pub const MIN_TEMPLATE_LEN: usize = 50;

/// Upper bound on scored candidate pairs in exhaustive mode; enumeration
/// past the cap is truncated with a warning so termination is guaranteed
/// for arbitrarily wide option ranges.
const EXHAUSTIVE_CANDIDATE_CAP: usize = 20_000;

/// Quick mode strides the length space by this step; its candidate set is
/// a subset of the exhaustive enumeration by construction.
const QUICK_LENGTH_STRIDE: usize = 3;

/// Overlapping-layout primers keep at least this many bases on each side
/// of the edit.
const MIN_OVERLAP_FLANK: usize = 10;

/// How the primer pair is arranged around a mutagenic edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignStrategy {
    BackToBack,
    Overlapping,
}

/// The edit to design primers for.
///
/// `replacement` distinguishes the operation: `None` amplifies the region,
/// `Some("")` deletes it, a non-empty string substitutes it (with
/// `start == end` this is a pure insertion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSpecification {
    pub start: usize,
    pub end: usize,
    pub replacement: Option<String>,
}

impl DesignSpecification {
    pub fn amplification(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            replacement: None,
        }
    }

    pub fn deletion(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            replacement: Some(String::new()),
        }
    }

    pub fn substitution(start: usize, end: usize, replacement: String) -> Self {
        Self {
            start,
            end,
            replacement: Some(replacement),
        }
    }

    pub fn is_amplification(&self) -> bool {
        self.replacement.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignOptions {
    pub tm_target: f64,
    pub tm_min: f64,
    pub tm_max: f64,
    pub length_min: usize,
    pub length_max: usize,
    pub gc_min: f64,
    pub gc_max: f64,
    pub strategy: DesignStrategy,
    /// Treat the template as circular even if it was constructed linear.
    pub circular: bool,
    pub exhaustive: bool,
    pub max_alternatives: usize,
}

impl Default for DesignOptions {
    fn default() -> Self {
        Self {
            tm_target: 60.0,
            tm_min: 55.0,
            tm_max: 72.0,
            length_min: 18,
            length_max: 30,
            gc_min: 0.25,
            gc_max: 0.75,
            strategy: DesignStrategy::BackToBack,
            circular: false,
            exhaustive: false,
            max_alternatives: 5,
        }
    }
}

/// A designed primer. Immutable once produced.
///
/// `start..end` is the template span the primer sits on (forward strand
/// coordinates; `end` past the template length means the span wraps a
/// circular origin). For back-to-back and amplification primers,
/// `sequence[tail_len..]` equals that span verbatim (reverse-complemented
/// for reverse primers); overlapping mutagenic primers additionally carry
/// the edit inside the span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primer {
    pub sequence: String,
    pub direction: Direction,
    pub start: usize,
    pub end: usize,
    /// 5' bases (e.g. a carried replacement) that do not anneal.
    pub tail_len: usize,
    pub tm: f64,
    pub gc_fraction: f64,
    pub hairpin_dg: f64,
    pub self_dimer_dg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignResult {
    pub forward: Primer,
    pub reverse: Primer,
    pub composite_score: f64,
    pub effective_score: f64,
    pub quality_tier: QualityTier,
    pub critical_warnings: usize,
    pub warnings: Vec<String>,
    /// Amplicon length for amplifications; edited-molecule length for
    /// mutagenesis designs.
    pub product_length: usize,
    pub mode: DesignMode,
    pub strategy: DesignStrategy,
    /// Runner-up designs, best first. Alternatives carry no nested
    /// alternatives of their own.
    pub alternatives: Vec<DesignResult>,
}

/// Outcome of one item in a batch; the batch itself always completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub success: bool,
    pub design: Option<DesignResult>,
    pub error: Option<String>,
}

struct Candidate {
    forward: Vec<u8>,
    forward_span: (i64, i64),
    forward_tail: usize,
    reverse: Vec<u8>,
    reverse_span: (i64, i64),
    reverse_tail: usize,
}

struct Scored {
    candidate: Candidate,
    features: PairFeatures,
    score: PairScore,
    fold_warnings: Vec<String>,
    total_len: usize,
}

/// The design search engine.
#[derive(Clone, Debug, Default)]
pub struct DesignEngine {
    scorer: CompositeScorer,
}

impl DesignEngine {
    pub fn new(scorer: CompositeScorer) -> Self {
        Self { scorer }
    }

    #[inline(always)]
    pub fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    /// Designs one primer pair for the given edit.
    pub fn design(
        &self,
        template: &Template,
        spec: &DesignSpecification,
        options: &DesignOptions,
    ) -> Result<DesignResult, DesignError> {
        let mut template = template.clone();
        if options.circular {
            template.set_circular(true);
        }

        if template.len() < MIN_TEMPLATE_LEN {
            return Err(DesignError::InputTooShort {
                what: "Template".to_string(),
                length: template.len(),
                minimum: MIN_TEMPLATE_LEN,
            });
        }

        let region = self.normalize_region(&template, spec)?;
        let replacement = match &spec.replacement {
            Some(text) if !text.is_empty() => clean_sequence(text)?,
            _ => vec![],
        };
        if region.len == 0 && replacement.is_empty() {
            return Err(DesignError::InvalidRegion {
                start: spec.start,
                end: spec.end,
                template_length: template.len(),
            });
        }

        let mode = if spec.is_amplification() {
            DesignMode::Amplification
        } else {
            DesignMode::Mutagenesis
        };

        let mut warnings = vec![];
        let candidates =
            self.generate_candidates(&template, &region, &replacement, mode, options, &mut warnings);
        if candidates.is_empty() {
            return Err(DesignError::NoFeasibleDesign(
                "no candidate placement fits the template around the edit region".to_string(),
            ));
        }

        let feasible = self.filter_feasible(candidates, options);
        if feasible.is_empty() {
            return Err(DesignError::NoFeasibleDesign(format!(
                "no candidate satisfies Tm {:.0}-{:.0} °C and GC {:.0}-{:.0}%",
                options.tm_min,
                options.tm_max,
                options.gc_min * 100.0,
                options.gc_max * 100.0
            )));
        }

        let mut scored: Vec<Scored> = feasible
            .into_par_iter()
            .filter_map(|candidate| self.score_candidate(&template, candidate, mode, options))
            .collect();
        if scored.is_empty() {
            return Err(DesignError::NoFeasibleDesign(
                "no candidate survived scoring".to_string(),
            ));
        }

        // score desc, then |ΔTm| asc, then total length asc
        scored.sort_by(|a, b| {
            b.score
                .composite_score
                .partial_cmp(&a.score.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.features
                        .delta_tm
                        .partial_cmp(&b.features.delta_tm)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.total_len.cmp(&b.total_len))
        });

        let product_length = match mode {
            DesignMode::Amplification => region.len,
            _ => template.len() - region.len + replacement.len(),
        };

        let alternatives = scored
            .iter()
            .skip(1)
            .take(options.max_alternatives)
            .map(|s| self.build_result(&template, s, mode, options.strategy, product_length, vec![]))
            .collect_vec();

        let best = &scored[0];
        let mut result =
            self.build_result(&template, best, mode, options.strategy, product_length, warnings);
        result.alternatives = alternatives;
        Ok(result)
    }

    /// Runs the same search independently for every specification. One
    /// item's failure never aborts its siblings; the output always has one
    /// entry per input, in order.
    pub fn design_batch(
        &self,
        template: &Template,
        specs: &[DesignSpecification],
        options: &DesignOptions,
    ) -> Vec<BatchItemResult> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| match self.design(template, spec, options) {
                Ok(design) => BatchItemResult {
                    index,
                    success: true,
                    design: Some(design),
                    error: None,
                },
                Err(e) => BatchItemResult {
                    index,
                    success: false,
                    design: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }

    /// Analyzes a user-supplied primer pair against a template without
    /// searching: features plus composite score at the given target Tm.
    pub fn analyze_pair(
        &self,
        template: &Template,
        forward: &str,
        reverse: &str,
        mode: DesignMode,
        tm_target: f64,
    ) -> Result<(PairFeatures, PairScore), DesignError> {
        let forward = clean_sequence(forward)?;
        let reverse = clean_sequence(reverse)?;
        let off_target = self.pair_off_target_count(template, &forward, 0, &reverse);
        let (features, fold_warnings) =
            self.scorer
                .pair_features(template, &forward, &reverse, mode, Some(off_target))?;
        let mut score = self.scorer.score_pair(&features, mode, tm_target);
        score.warnings.extend(fold_warnings);
        Ok((features, score))
    }

    /// Analyzes a single primer. Callers presenting a pair invoke this per
    /// primer so one primer's failure never blocks its sibling's facts.
    pub fn analyze_primer(
        &self,
        template: &Template,
        primer: &str,
        direction: Direction,
        mode: DesignMode,
    ) -> Result<(PrimerFeatures, Vec<String>), DesignError> {
        let primer = clean_sequence(primer)?;
        self.scorer
            .primer_features(template, &primer, direction, mode)
    }

    // ── Candidate generation ────────────────────────────────────────

    fn normalize_region(
        &self,
        template: &Template,
        spec: &DesignSpecification,
    ) -> Result<NormalizedRegion, DesignError> {
        let len = template.len();
        let invalid = DesignError::InvalidRegion {
            start: spec.start,
            end: spec.end,
            template_length: len,
        };
        if spec.start >= len {
            return Err(invalid);
        }
        if spec.end >= spec.start {
            if spec.end > len {
                return Err(invalid);
            }
            Ok(NormalizedRegion {
                start: spec.start as i64,
                end: spec.end as i64,
                len: spec.end - spec.start,
            })
        } else if template.is_circular() {
            // wraps the origin
            Ok(NormalizedRegion {
                start: spec.start as i64,
                end: (spec.end + len) as i64,
                len: len - spec.start + spec.end,
            })
        } else {
            Err(invalid)
        }
    }

    fn candidate_lengths(&self, options: &DesignOptions) -> Vec<usize> {
        if options.exhaustive {
            (options.length_min..=options.length_max).collect()
        } else {
            (options.length_min..=options.length_max)
                .step_by(QUICK_LENGTH_STRIDE)
                .collect()
        }
    }

    fn generate_candidates(
        &self,
        template: &Template,
        region: &NormalizedRegion,
        replacement: &[u8],
        mode: DesignMode,
        options: &DesignOptions,
        warnings: &mut Vec<String>,
    ) -> Vec<Candidate> {
        let lengths = self.candidate_lengths(options);
        let mut candidates = vec![];
        let mut truncated = false;

        match (mode, options.strategy) {
            (DesignMode::Amplification, _) => {
                for (&fl, &rl) in lengths.iter().cartesian_product(lengths.iter()) {
                    if candidates.len() >= EXHAUSTIVE_CANDIDATE_CAP {
                        truncated = true;
                        break;
                    }
                    let f_span = (region.start, region.start + fl as i64);
                    let r_span = (region.end - rl as i64, region.end);
                    let (Some(f_anneal), Some(r_anneal)) = (
                        template.range(f_span.0, f_span.1),
                        template.range(r_span.0, r_span.1),
                    ) else {
                        continue;
                    };
                    candidates.push(Candidate {
                        forward: f_anneal,
                        forward_span: f_span,
                        forward_tail: 0,
                        reverse: reverse_complement(&r_anneal),
                        reverse_span: r_span,
                        reverse_tail: 0,
                    });
                }
            }
            (_, DesignStrategy::BackToBack) => {
                for (&fl, &rl) in lengths.iter().cartesian_product(lengths.iter()) {
                    if candidates.len() >= EXHAUSTIVE_CANDIDATE_CAP {
                        truncated = true;
                        break;
                    }
                    let f_span = (region.end, region.end + fl as i64);
                    let r_span = (region.start - rl as i64, region.start);
                    let (Some(f_anneal), Some(r_anneal)) = (
                        template.range(f_span.0, f_span.1),
                        template.range(r_span.0, r_span.1),
                    ) else {
                        continue;
                    };
                    let mut forward = replacement.to_vec();
                    forward.extend_from_slice(&f_anneal);
                    candidates.push(Candidate {
                        forward,
                        forward_span: f_span,
                        forward_tail: replacement.len(),
                        reverse: reverse_complement(&r_anneal),
                        reverse_span: r_span,
                        reverse_tail: 0,
                    });
                }
            }
            (_, DesignStrategy::Overlapping) => {
                let flank_max = options.length_max.saturating_sub(MIN_OVERLAP_FLANK);
                let flanks: Vec<usize> = if options.exhaustive {
                    (MIN_OVERLAP_FLANK..=flank_max).collect()
                } else {
                    (MIN_OVERLAP_FLANK..=flank_max)
                        .step_by(QUICK_LENGTH_STRIDE)
                        .collect()
                };
                for (&left, &right) in flanks.iter().cartesian_product(flanks.iter()) {
                    if candidates.len() >= EXHAUSTIVE_CANDIDATE_CAP {
                        truncated = true;
                        break;
                    }
                    let total = left + replacement.len() + right;
                    if total < options.length_min || total > options.length_max {
                        continue;
                    }
                    let f_span = (region.start - left as i64, region.end + right as i64);
                    let (Some(left_seq), Some(right_seq)) = (
                        template.range(f_span.0, region.start),
                        template.range(region.end, f_span.1),
                    ) else {
                        continue;
                    };
                    let mut forward = left_seq;
                    forward.extend_from_slice(replacement);
                    forward.extend_from_slice(&right_seq);
                    let reverse = reverse_complement(&forward);
                    candidates.push(Candidate {
                        forward,
                        forward_span: f_span,
                        forward_tail: 0,
                        reverse,
                        reverse_span: f_span,
                        reverse_tail: 0,
                    });
                }
            }
        }

        if truncated {
            warnings.push(format!(
                "candidate space truncated at {EXHAUSTIVE_CANDIDATE_CAP} pairs"
            ));
        }
        candidates
    }

    /// Hard Tm/GC bounds, applied to each primer's annealing portion.
    fn filter_feasible(&self, candidates: Vec<Candidate>, options: &DesignOptions) -> Vec<Candidate> {
        let calculator = self.scorer.calculator();
        candidates
            .into_iter()
            .filter(|c| {
                let fwd_anneal = &c.forward[c.forward_tail..];
                let rev_anneal = &c.reverse[c.reverse_tail..];
                for anneal in [fwd_anneal, rev_anneal] {
                    let Ok(tm) = calculator.tm_of_bytes(anneal) else {
                        return false;
                    };
                    if tm < options.tm_min || tm > options.tm_max {
                        return false;
                    }
                    let gc = calculator.gc_fraction(anneal);
                    if gc < options.gc_min || gc > options.gc_max {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    fn score_candidate(
        &self,
        template: &Template,
        candidate: Candidate,
        mode: DesignMode,
        options: &DesignOptions,
    ) -> Option<Scored> {
        let off_target = self.pair_off_target_count(
            template,
            &candidate.forward,
            candidate.forward_tail,
            &candidate.reverse,
        );
        let (features, fold_warnings) = self
            .scorer
            .pair_features(
                template,
                &candidate.forward,
                &candidate.reverse,
                mode,
                Some(off_target),
            )
            .ok()?;
        let score = self.scorer.score_pair(&features, mode, options.tm_target);
        let total_len = candidate.forward.len() + candidate.reverse.len();
        Some(Scored {
            candidate,
            features,
            score,
            fold_warnings,
            total_len,
        })
    }

    /// Extra exact binding sites of both primers' annealing sequences, on
    /// either template strand, beyond the one intended site each.
    fn pair_off_target_count(
        &self,
        template: &Template,
        forward: &[u8],
        forward_tail: usize,
        reverse: &[u8],
    ) -> usize {
        let fwd_site = &forward[forward_tail..];
        let rev_site = reverse_complement(reverse);
        self.off_target_count(template, fwd_site) + self.off_target_count(template, &rev_site)
    }

    fn off_target_count(&self, template: &Template, site: &[u8]) -> usize {
        if site.is_empty() {
            return 0;
        }
        let forward_hits = count_occurrences(template.forward(), site);
        let rc = reverse_complement(template.forward());
        let reverse_hits = count_occurrences(&rc, site);
        (forward_hits + reverse_hits).saturating_sub(1)
    }

    fn build_result(
        &self,
        template: &Template,
        scored: &Scored,
        mode: DesignMode,
        strategy: DesignStrategy,
        product_length: usize,
        mut warnings: Vec<String>,
    ) -> DesignResult {
        warnings.extend(scored.fold_warnings.clone());
        warnings.extend(scored.score.warnings.clone());

        let c = &scored.candidate;
        let f = &scored.features;
        let forward = Primer {
            sequence: String::from_utf8_lossy(&c.forward).to_string(),
            direction: Direction::Forward,
            start: template.wrap_index(c.forward_span.0),
            end: template.wrap_index(c.forward_span.0)
                + (c.forward_span.1 - c.forward_span.0) as usize,
            tail_len: c.forward_tail,
            tm: f.forward.tm,
            gc_fraction: f.forward.gc_fraction,
            hairpin_dg: f.forward.hairpin_dg,
            self_dimer_dg: f.forward.self_dimer_dg,
        };
        let reverse = Primer {
            sequence: String::from_utf8_lossy(&c.reverse).to_string(),
            direction: Direction::Reverse,
            start: template.wrap_index(c.reverse_span.0),
            end: template.wrap_index(c.reverse_span.0)
                + (c.reverse_span.1 - c.reverse_span.0) as usize,
            tail_len: c.reverse_tail,
            tm: f.reverse.tm,
            gc_fraction: f.reverse.gc_fraction,
            hairpin_dg: f.reverse.hairpin_dg,
            self_dimer_dg: f.reverse.self_dimer_dg,
        };

        DesignResult {
            forward,
            reverse,
            composite_score: scored.score.composite_score,
            effective_score: scored.score.effective_score,
            quality_tier: scored.score.quality_tier,
            critical_warnings: scored.score.critical_warnings,
            warnings,
            product_length,
            mode,
            strategy,
            alternatives: vec![],
        }
    }
}

struct NormalizedRegion {
    start: i64,
    end: i64,
    len: usize,
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .filter(|w| *w == needle)
        .count()
}
