//! Minimum-free-energy secondary structure prediction for primers.
//!
//! A Zuker-style dynamic program (O(n³) time, O(n²) space) over DNA with
//! Watson-Crick pairs, SantaLucia unified ΔG°₃₇ stacking energies, and
//! simplified SantaLucia-Hicks loop initiation penalties. Two modes:
//!
//! - **Hairpin** — fold a single strand.
//! - **Dimer** — fold the concatenation `a ++ NNN ++ b`; the N linker can
//!   never pair, so cross-strand duplexes and residual intramolecular
//!   structure compete on equal footing.
//!
//! The folder assumes primer-scale input (tens of bases); whole templates
//! must be windowed by the caller.

use crate::error::DesignError;
use crate::template::clean_sequence;
use serde::{Deserialize, Serialize};

/// Gas constant in kcal/(K·mol), for loop-size extrapolation.
const R_KCAL: f64 = 0.001987;

/// Folding temperature in Kelvin (37 °C).
const FOLD_TEMP_K: f64 = 310.15;

/// Minimum number of unpaired bases enclosed by a hairpin.
const MIN_HAIRPIN_LOOP: usize = 3;

/// Largest bulge/internal loop examined explicitly.
const MAX_INTERIOR_LOOP: usize = 30;

/// Hard cap on folder input; beyond this the O(n³) cost is a caller error.
pub const MAX_FOLD_LEN: usize = 160;

const INF: f64 = 1e18;
const EPS: f64 = 1e-7;

/// Unpairable spacer between the two strands of a dimer fold.
const DIMER_LINKER: &[u8] = b"NNN";

#[inline(always)]
fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

#[inline(always)]
fn can_pair(a: u8, b: u8) -> bool {
    matches!(
        (a, b),
        (b'A', b'T') | (b'T', b'A') | (b'G', b'C') | (b'C', b'G')
    )
}

/// Thermodynamic tables for the folder, injected as immutable data.
///
/// `stack[x][y]` is the ΔG°₃₇ (kcal/mol) of the 5'-XY-3' duplex step
/// (SantaLucia 1998 unified values); the loop tables are initiation
/// penalties by loop size with a Jacobson-Stockmayer extrapolation past 30.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoldingParameters {
    pub stack: [[f64; 4]; 4],
    pub hairpin_init: [f64; 31],
    pub bulge_init: [f64; 31],
    pub internal_init: [f64; 31],
    pub multibranch_offset: f64,
    pub multibranch_helix: f64,
    pub multibranch_unpaired: f64,
}

impl Default for FoldingParameters {
    fn default() -> Self {
        Self {
            stack: [
                // AA     AC     AG     AT
                [-1.00, -1.44, -1.28, -0.88],
                // CA     CC     CG     CT
                [-1.45, -1.84, -2.17, -1.28],
                // GA     GC     GG     GT
                [-1.30, -2.24, -1.84, -1.44],
                // TA     TC     TG     TT
                [-0.58, -1.30, -1.45, -1.00],
            ],
            hairpin_init: [
                0.0, 0.0, 0.0, // sizes 0-2 cannot occur
                3.5, 3.5, 3.3, 4.0, 4.2, 4.3, 4.5, 4.6, 4.7, 4.8, 4.9, 4.9, 5.0, 5.1, 5.2, 5.2,
                5.3, 5.3, 5.4, 5.4, 5.5, 5.5, 5.6, 5.6, 5.7, 5.7, 5.8, 5.8,
            ],
            bulge_init: [
                0.0, // size 0 cannot occur
                4.0, 2.9, 3.1, 3.2, 3.3, 3.5, 3.7, 3.9, 4.1, 4.3, 4.4, 4.5, 4.6, 4.7, 4.8, 4.9,
                4.9, 5.0, 5.1, 5.1, 5.2, 5.2, 5.3, 5.3, 5.4, 5.4, 5.4, 5.5, 5.5, 5.6,
            ],
            internal_init: [
                0.0, 0.0, // sizes 0-1 cannot occur
                4.1, 3.2, 3.6, 4.0, 4.4, 4.6, 4.8, 4.9, 4.9, 5.2, 5.2, 5.4, 5.4, 5.6, 5.6, 5.8,
                5.8, 5.9, 5.9, 6.0, 6.0, 6.1, 6.1, 6.2, 6.2, 6.3, 6.3, 6.4, 6.4,
            ],
            multibranch_offset: 3.4,
            multibranch_helix: 0.4,
            multibranch_unpaired: 0.0,
        }
    }
}

/// Severity cut points for a predicted structure, in kcal/mol.
///
/// The boundaries are half-open downward: a ΔG exactly at `critical_dg`
/// is critical (when the 3' end is involved). The 3'-terminal window is
/// the region whose pairing blocks polymerase extension.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub negligible_dg: f64,
    pub info_dg: f64,
    pub low_dg: f64,
    pub critical_dg: f64,
    pub three_prime_window: usize,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            negligible_dg: -0.5,
            info_dg: -2.0,
            low_dg: -3.0,
            critical_dg: -4.0,
            three_prime_window: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Info,
    Low,
    Moderate,
    Warning,
    Critical,
}

/// Result of a fold: minimum free energy, the paired positions, and a
/// dot-bracket rendering (single-strand folds only — dimer indices span
/// two molecules and a linker, so no bracket string is emitted there).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    /// kcal/mol; more negative is more stable. 0.0 when unstructured.
    pub delta_g: f64,
    /// Non-crossing base pairs (i, j) with i < j; each index appears in at
    /// most one pair.
    pub pairs: Vec<(usize, usize)>,
    pub dot_bracket: Option<String>,
}

impl FoldResult {
    pub fn unstructured(len: usize) -> Self {
        Self {
            delta_g: 0.0,
            pairs: vec![],
            dot_bracket: Some(".".repeat(len)),
        }
    }

    pub fn is_paired(&self, index: usize) -> bool {
        self.pairs.iter().any(|&(i, j)| i == index || j == index)
    }
}

/// Minimum-free-energy folder for primer-scale DNA.
#[derive(Clone, Debug, Default)]
pub struct StructureFolder {
    params: FoldingParameters,
    thresholds: SeverityThresholds,
}

impl StructureFolder {
    pub fn new(params: FoldingParameters, thresholds: SeverityThresholds) -> Self {
        Self { params, thresholds }
    }

    #[inline(always)]
    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    /// Folds a cleaned single strand (hairpin mode).
    pub fn fold(&self, seq: &[u8]) -> Result<FoldResult, DesignError> {
        self.check_input(seq, seq.len())?;
        let mut result = self.fold_impl(seq);
        result.dot_bracket = Some(dot_bracket(seq.len(), &result.pairs));
        Ok(result)
    }

    /// Cleans and folds sequence text.
    pub fn fold_sequence(&self, sequence: &str) -> Result<FoldResult, DesignError> {
        let cleaned = clean_sequence(sequence)?;
        self.fold(&cleaned)
    }

    /// Folds two strands joined by an unpairable linker (dimer mode).
    /// Pair indices refer to the concatenated `a ++ NNN ++ b` sequence.
    pub fn fold_dimer(&self, a: &[u8], b: &[u8]) -> Result<FoldResult, DesignError> {
        let total = a.len() + DIMER_LINKER.len() + b.len();
        self.check_input(a, total)?;
        self.check_input(b, total)?;
        let mut joined = Vec::with_capacity(total);
        joined.extend_from_slice(a);
        joined.extend_from_slice(DIMER_LINKER);
        joined.extend_from_slice(b);
        let mut result = self.fold_impl(&joined);
        result.dot_bracket = None;
        Ok(result)
    }

    /// Duplex a primer forms with a second copy of itself.
    pub fn fold_self_dimer(&self, seq: &[u8]) -> Result<FoldResult, DesignError> {
        self.fold_dimer(seq, seq)
    }

    /// Severity of a single-strand fold for a primer of `seq_len` bases.
    pub fn classify_structure_severity(&self, fold: &FoldResult, seq_len: usize) -> Severity {
        let window = self.thresholds.three_prime_window.min(seq_len);
        let window_start = seq_len - window;
        let three_prime_paired = fold
            .pairs
            .iter()
            .any(|&(i, j)| i >= window_start || j >= window_start);
        self.severity_from(fold, three_prime_paired)
    }

    /// Severity of a dimer fold; the 3' windows of both strands in the
    /// concatenated coordinate space are inspected.
    pub fn classify_dimer_severity(&self, fold: &FoldResult, len_a: usize, len_b: usize) -> Severity {
        let w = self.thresholds.three_prime_window;
        let a_window = len_a.saturating_sub(w)..len_a;
        let b_end = len_a + DIMER_LINKER.len() + len_b;
        let b_window = b_end.saturating_sub(w)..b_end;
        let three_prime_paired = fold.pairs.iter().any(|&(i, j)| {
            a_window.contains(&i)
                || a_window.contains(&j)
                || b_window.contains(&i)
                || b_window.contains(&j)
        });
        self.severity_from(fold, three_prime_paired)
    }

    fn severity_from(&self, fold: &FoldResult, three_prime_paired: bool) -> Severity {
        let t = &self.thresholds;
        let dg = fold.delta_g;
        if fold.pairs.is_empty() || dg > t.negligible_dg {
            Severity::None
        } else if dg > t.info_dg {
            Severity::Info
        } else if dg > t.low_dg {
            if three_prime_paired {
                Severity::Moderate
            } else {
                Severity::Low
            }
        } else if dg > t.critical_dg {
            if three_prime_paired {
                Severity::Warning
            } else {
                Severity::Moderate
            }
        } else if three_prime_paired {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    fn check_input(&self, seq: &[u8], total_len: usize) -> Result<(), DesignError> {
        if seq.is_empty() {
            return Err(DesignError::InvalidSequence("empty sequence".to_string()));
        }
        if total_len > MAX_FOLD_LEN {
            return Err(DesignError::InvalidSequence(format!(
                "folding input of {total_len} bases exceeds the {MAX_FOLD_LEN}-base limit"
            )));
        }
        if let Some(&bad) = seq
            .iter()
            .find(|&&c| !matches!(c, b'A' | b'T' | b'G' | b'C'))
        {
            return Err(DesignError::InvalidSequence(format!(
                "unexpected character '{}'",
                bad as char
            )));
        }
        Ok(())
    }

    // ── Dynamic program ─────────────────────────────────────────────

    fn fold_impl(&self, seq: &[u8]) -> FoldResult {
        let n = seq.len();
        if n < MIN_HAIRPIN_LOOP + 2 {
            return FoldResult {
                delta_g: 0.0,
                pairs: vec![],
                dot_bracket: None,
            };
        }

        let idx = |i: usize, j: usize| i * n + j;

        // V: MFE given (i,j) pair. W: MFE of any structure on [i..=j].
        // WM: MFE of a multibranch-loop interior on [i..=j].
        let mut v = vec![INF; n * n];
        let mut w = vec![0.0f64; n * n];
        let mut wm = vec![INF; n * n];

        for len in 2..=n {
            for i in 0..=n - len {
                let j = i + len - 1;

                if can_pair(seq[i], seq[j]) && j - i > MIN_HAIRPIN_LOOP {
                    let mut best = self.hairpin_energy(j - i - 1);

                    if can_pair(seq[i + 1], seq[j - 1]) && v[idx(i + 1, j - 1)] < INF / 2.0 {
                        best = best
                            .min(v[idx(i + 1, j - 1)] + self.stack_energy(seq[i], seq[i + 1]));
                    }

                    for p in (i + 1)..j {
                        let left = p - i - 1;
                        if left > MAX_INTERIOR_LOOP {
                            break;
                        }
                        for q in ((p + MIN_HAIRPIN_LOOP + 1)..j).rev() {
                            let right = j - q - 1;
                            if left + right > MAX_INTERIOR_LOOP {
                                break;
                            }
                            if left == 0 && right == 0 {
                                continue; // stacking, handled above
                            }
                            if !can_pair(seq[p], seq[q]) || v[idx(p, q)] >= INF / 2.0 {
                                continue;
                            }
                            best = best
                                .min(v[idx(p, q)] + self.interior_energy(seq, i, j, p, q));
                        }
                    }

                    if j > i + 2 && wm[idx(i + 1, j - 1)] < INF / 2.0 {
                        best = best.min(
                            wm[idx(i + 1, j - 1)]
                                + self.params.multibranch_offset
                                + self.params.multibranch_helix,
                        );
                    }

                    v[idx(i, j)] = best;
                }

                // WM
                {
                    let mut best = INF;
                    if v[idx(i, j)] < INF / 2.0 {
                        best = best.min(v[idx(i, j)] + self.params.multibranch_helix);
                    }
                    if wm[idx(i + 1, j)] < INF / 2.0 {
                        best = best.min(wm[idx(i + 1, j)] + self.params.multibranch_unpaired);
                    }
                    if wm[idx(i, j - 1)] < INF / 2.0 {
                        best = best.min(wm[idx(i, j - 1)] + self.params.multibranch_unpaired);
                    }
                    for k in (i + 1)..j {
                        if wm[idx(i, k)] < INF / 2.0 && wm[idx(k + 1, j)] < INF / 2.0 {
                            best = best.min(wm[idx(i, k)] + wm[idx(k + 1, j)]);
                        }
                    }
                    wm[idx(i, j)] = best;
                }

                // W
                {
                    let mut best = w[idx(i + 1, j)].min(w[idx(i, j - 1)]);
                    if v[idx(i, j)] < INF / 2.0 {
                        best = best.min(v[idx(i, j)]);
                    }
                    for k in (i + 1)..j {
                        best = best.min(w[idx(i, k)] + w[idx(k + 1, j)]);
                    }
                    w[idx(i, j)] = best.min(0.0);
                }
            }
        }

        let mut pairs = vec![];
        self.traceback_w(seq, &v, &w, &wm, n, 0, n - 1, &mut pairs);
        pairs.sort();

        let delta_g = w[idx(0, n - 1)];
        FoldResult {
            delta_g: if delta_g > -EPS { 0.0 } else { delta_g },
            pairs,
            dot_bracket: None,
        }
    }

    #[inline(always)]
    fn stack_energy(&self, x: u8, y: u8) -> f64 {
        match (base_index(x), base_index(y)) {
            (Some(a), Some(b)) => self.params.stack[a][b],
            _ => INF,
        }
    }

    fn hairpin_energy(&self, size: usize) -> f64 {
        if size < MIN_HAIRPIN_LOOP {
            return INF;
        }
        if size <= MAX_INTERIOR_LOOP {
            self.params.hairpin_init[size]
        } else {
            self.params.hairpin_init[MAX_INTERIOR_LOOP]
                + 1.75 * R_KCAL * FOLD_TEMP_K * ((size as f64) / MAX_INTERIOR_LOOP as f64).ln()
        }
    }

    fn interior_energy(&self, seq: &[u8], i: usize, j: usize, p: usize, q: usize) -> f64 {
        let left = p - i - 1;
        let right = j - q - 1;
        if left == 0 && right == 0 {
            return INF;
        }

        if left == 0 || right == 0 {
            let size = left + right;
            let init = if size <= MAX_INTERIOR_LOOP {
                self.params.bulge_init[size]
            } else {
                self.params.bulge_init[MAX_INTERIOR_LOOP]
                    + 1.75 * R_KCAL * FOLD_TEMP_K * ((size as f64) / MAX_INTERIOR_LOOP as f64).ln()
            };
            // Stacking persists across a single-base bulge.
            if size == 1 {
                return init + self.stack_energy(seq[i], seq[if left == 1 { p } else { i + 1 }]);
            }
            return init;
        }

        let size = left + right;
        let init = if size <= MAX_INTERIOR_LOOP {
            self.params.internal_init[size]
        } else {
            self.params.internal_init[MAX_INTERIOR_LOOP]
                + 1.75 * R_KCAL * FOLD_TEMP_K * ((size as f64) / MAX_INTERIOR_LOOP as f64).ln()
        };
        let asymmetry = (0.3 * (left as f64 - right as f64).abs()).min(3.0);
        init + asymmetry
    }

    // ── Traceback ───────────────────────────────────────────────────
    //
    // Choices are examined in a fixed order so ties resolve
    // deterministically: a pair starting at i wins over deferring the
    // start, and interior decompositions prefer the earliest inner start
    // with the shortest enclosed loop.

    #[allow(clippy::too_many_arguments)]
    fn traceback_w(
        &self,
        seq: &[u8],
        v: &[f64],
        w: &[f64],
        wm: &[f64],
        n: usize,
        i: usize,
        j: usize,
        pairs: &mut Vec<(usize, usize)>,
    ) {
        if i >= j {
            return;
        }
        let idx = |a: usize, b: usize| a * n + b;
        let val = w[idx(i, j)];
        if val > -EPS {
            return;
        }
        if v[idx(i, j)] < INF / 2.0 && (v[idx(i, j)] - val).abs() < EPS {
            self.traceback_v(seq, v, wm, n, i, j, pairs);
            return;
        }
        if (w[idx(i + 1, j)] - val).abs() < EPS {
            self.traceback_w(seq, v, w, wm, n, i + 1, j, pairs);
            return;
        }
        if (w[idx(i, j - 1)] - val).abs() < EPS {
            self.traceback_w(seq, v, w, wm, n, i, j - 1, pairs);
            return;
        }
        for k in (i + 1)..j {
            if (w[idx(i, k)] + w[idx(k + 1, j)] - val).abs() < EPS {
                self.traceback_w(seq, v, w, wm, n, i, k, pairs);
                self.traceback_w(seq, v, w, wm, n, k + 1, j, pairs);
                return;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn traceback_v(
        &self,
        seq: &[u8],
        v: &[f64],
        wm: &[f64],
        n: usize,
        i: usize,
        j: usize,
        pairs: &mut Vec<(usize, usize)>,
    ) {
        let idx = |a: usize, b: usize| a * n + b;
        let val = v[idx(i, j)];
        if val >= INF / 2.0 {
            return;
        }
        pairs.push((i, j));

        if (self.hairpin_energy(j - i - 1) - val).abs() < EPS {
            return;
        }

        if can_pair(seq[i + 1], seq[j - 1])
            && v[idx(i + 1, j - 1)] < INF / 2.0
            && (v[idx(i + 1, j - 1)] + self.stack_energy(seq[i], seq[i + 1]) - val).abs() < EPS
        {
            self.traceback_v(seq, v, wm, n, i + 1, j - 1, pairs);
            return;
        }

        for p in (i + 1)..j {
            let left = p - i - 1;
            if left > MAX_INTERIOR_LOOP {
                break;
            }
            for q in ((p + MIN_HAIRPIN_LOOP + 1)..j).rev() {
                let right = j - q - 1;
                if left + right > MAX_INTERIOR_LOOP {
                    break;
                }
                if left == 0 && right == 0 {
                    continue;
                }
                if !can_pair(seq[p], seq[q]) || v[idx(p, q)] >= INF / 2.0 {
                    continue;
                }
                if (v[idx(p, q)] + self.interior_energy(seq, i, j, p, q) - val).abs() < EPS {
                    self.traceback_v(seq, v, wm, n, p, q, pairs);
                    return;
                }
            }
        }

        if j > i + 2
            && wm[idx(i + 1, j - 1)] < INF / 2.0
            && (wm[idx(i + 1, j - 1)]
                + self.params.multibranch_offset
                + self.params.multibranch_helix
                - val)
                .abs()
                < EPS
        {
            self.traceback_wm(seq, v, wm, n, i + 1, j - 1, pairs);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn traceback_wm(
        &self,
        seq: &[u8],
        v: &[f64],
        wm: &[f64],
        n: usize,
        i: usize,
        j: usize,
        pairs: &mut Vec<(usize, usize)>,
    ) {
        if i >= j {
            return;
        }
        let idx = |a: usize, b: usize| a * n + b;
        let val = wm[idx(i, j)];
        if val >= INF / 2.0 {
            return;
        }
        if v[idx(i, j)] < INF / 2.0
            && (v[idx(i, j)] + self.params.multibranch_helix - val).abs() < EPS
        {
            self.traceback_v(seq, v, wm, n, i, j, pairs);
            return;
        }
        if wm[idx(i + 1, j)] < INF / 2.0
            && (wm[idx(i + 1, j)] + self.params.multibranch_unpaired - val).abs() < EPS
        {
            self.traceback_wm(seq, v, wm, n, i + 1, j, pairs);
            return;
        }
        if wm[idx(i, j - 1)] < INF / 2.0
            && (wm[idx(i, j - 1)] + self.params.multibranch_unpaired - val).abs() < EPS
        {
            self.traceback_wm(seq, v, wm, n, i, j - 1, pairs);
            return;
        }
        for k in (i + 1)..j {
            if wm[idx(i, k)] < INF / 2.0
                && wm[idx(k + 1, j)] < INF / 2.0
                && (wm[idx(i, k)] + wm[idx(k + 1, j)] - val).abs() < EPS
            {
                self.traceback_wm(seq, v, wm, n, i, k, pairs);
                self.traceback_wm(seq, v, wm, n, k + 1, j, pairs);
                return;
            }
        }
    }
}

fn dot_bracket(len: usize, pairs: &[(usize, usize)]) -> String {
    let mut out = vec!['.'; len];
    for &(i, j) in pairs {
        if i < len && j < len {
            out[i] = '(';
            out[j] = ')';
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder() -> StructureFolder {
        StructureFolder::default()
    }

    fn assert_pairs_disjoint(fold: &FoldResult) {
        let mut seen = std::collections::HashSet::new();
        for &(i, j) in &fold.pairs {
            assert!(i < j, "pair ({i},{j}) not ordered");
            assert!(seen.insert(i), "index {i} paired twice");
            assert!(seen.insert(j), "index {j} paired twice");
        }
    }

    #[test]
    fn test_unstructured_sequence_has_zero_energy() {
        let fold = folder().fold(b"AAAAAAAAAAAA").unwrap();
        assert_eq!(fold.delta_g, 0.0);
        assert!(fold.pairs.is_empty());
        assert_eq!(fold.dot_bracket.as_deref(), Some("............"));
    }

    #[test]
    fn test_stem_loop_hairpin() {
        // Five G·C pairs around an A5 loop: four GG stacks plus the loop
        // initiation penalty.
        let fold = folder().fold(b"GGGGGAAAAACCCCC").unwrap();
        assert!(fold.delta_g < -3.9, "delta_g = {}", fold.delta_g);
        assert_eq!(fold.pairs.len(), 5);
        assert!(fold.pairs.contains(&(0, 14)));
        assert!(fold.pairs.contains(&(4, 10)));
        assert_eq!(fold.dot_bracket.as_deref(), Some("(((((.....)))))"));
        assert_pairs_disjoint(&fold);
    }

    #[test]
    fn test_fold_is_deterministic() {
        let a = folder().fold(b"GCGCGCAAAAAAGCGCGC").unwrap();
        let b = folder().fold(b"GCGCGCAAAAAAGCGCGC").unwrap();
        assert_eq!(a.delta_g, b.delta_g);
        assert_eq!(a.pairs, b.pairs);
    }

    #[test]
    fn test_self_dimer_of_palindrome() {
        // ACGTACGT is fully self-complementary; two copies form an 8 bp
        // duplex across the linker.
        let fold = folder().fold_self_dimer(b"ACGTACGT").unwrap();
        assert!(fold.delta_g < -5.0, "delta_g = {}", fold.delta_g);
        assert!(fold.dot_bracket.is_none());
        assert_pairs_disjoint(&fold);
        // cross-linker pairing: some pair must span the two strands
        assert!(fold.pairs.iter().any(|&(i, j)| i < 8 && j >= 11));
    }

    #[test]
    fn test_dimer_of_incompatible_strands() {
        let fold = folder().fold_dimer(b"AAAAAAAA", b"GGGGGGGG").unwrap();
        assert_eq!(fold.delta_g, 0.0);
        assert!(fold.pairs.is_empty());
    }

    #[test]
    fn test_fold_rejects_oversized_input() {
        let long = "A".repeat(MAX_FOLD_LEN + 1);
        assert!(matches!(
            folder().fold(long.as_bytes()),
            Err(DesignError::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_severity_critical_requires_both_conditions() {
        let f = folder();
        let len = 20;

        // at the critical threshold, 3' window paired -> critical
        let fold = FoldResult {
            delta_g: -4.0,
            pairs: vec![(2, 19)],
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, len), Severity::Critical);

        // same energy, no 3' involvement -> warning
        let fold = FoldResult {
            delta_g: -4.0,
            pairs: vec![(2, 10)],
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, len), Severity::Warning);

        // 3' involvement but above the cutoff -> warning at most
        let fold = FoldResult {
            delta_g: -3.9,
            pairs: vec![(2, 19)],
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, len), Severity::Warning);
    }

    #[test]
    fn test_severity_ladder() {
        let f = folder();
        let interior = vec![(2, 10)];

        let fold = FoldResult {
            delta_g: -0.4,
            pairs: interior.clone(),
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, 20), Severity::None);

        let fold = FoldResult {
            delta_g: -1.0,
            pairs: interior.clone(),
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, 20), Severity::Info);

        let fold = FoldResult {
            delta_g: -2.5,
            pairs: interior.clone(),
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, 20), Severity::Low);

        let fold = FoldResult {
            delta_g: -3.5,
            pairs: interior,
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, 20), Severity::Moderate);

        // no pairs at all -> none regardless of energy
        let fold = FoldResult {
            delta_g: -6.0,
            pairs: vec![],
            dot_bracket: None,
        };
        assert_eq!(f.classify_structure_severity(&fold, 20), Severity::None);
    }

    #[test]
    fn test_dimer_severity_sees_both_three_prime_ends() {
        let f = folder();
        // for two 8-mers the concatenated 3' windows are 3..8 (strand A)
        // and 14..19 (strand B)
        let fold = FoldResult {
            delta_g: -4.5,
            pairs: vec![(1, 18)],
            dot_bracket: None,
        };
        // strand A len 8: a-window 3..8, strand B len 8: b-window 14..19
        assert_eq!(f.classify_dimer_severity(&fold, 8, 8), Severity::Critical);

        let fold = FoldResult {
            delta_g: -4.5,
            pairs: vec![(0, 12)],
            dot_bracket: None,
        };
        assert_eq!(f.classify_dimer_severity(&fold, 8, 8), Severity::Warning);
    }
}
