//! Primer-to-template binding search.
//!
//! A strict-priority fallback cascade: each level is a pure strategy that
//! either produces a [`BindingResult`] or passes to the next level. The
//! first success wins; results from different levels are never blended.
//!
//! Levels 3-5 (mutation anchor, dual anchor, 3' anchor) only run when the
//! caller marks the primer as mutagenic: they exist to place primers whose
//! mismatches are intentional edits. An ordinary primer that fails the
//! exact search falls straight through to the weighted scan.

use crate::error::DesignError;
use crate::template::{reverse_complement, Direction, Template};
use serde::{Deserialize, Serialize};

/// 5' bases assumed upstream of the edit when estimating a forward
/// mutagenic primer's position.
const MUTATION_ANCHOR_FORWARD_FLANK: usize = 10;

/// 3' bases assumed downstream of the edit for reverse mutagenic primers.
const MUTATION_ANCHOR_REVERSE_FLANK: usize = 12;

const MUTATION_ANCHOR_SCORE: f64 = 0.85;

/// Dual-anchor lengths run from len/2 down to max(8, 2·len/5).
const DUAL_ANCHOR_FLOOR: usize = 8;

/// Allowed deviation between expected and observed anchor separation.
const DUAL_ANCHOR_GAP_TOLERANCE: i64 = 2;

/// 3'-anchor lengths shrink from 16 to 12; shorter anchors match too
/// promiscuously to pin a unique site.
const THREE_PRIME_ANCHOR_MAX: usize = 16;
const THREE_PRIME_ANCHOR_MIN: usize = 12;

/// The weighted scan doubles the weight of this many 3'-terminal bases and
/// requires most of them to match.
const SCAN_THREE_PRIME_WINDOW: usize = 10;
const SCAN_THREE_PRIME_REQUIRED: usize = 7;

/// Shortest primer the aligner accepts.
pub const MIN_PRIMER_LEN: usize = 10;

/// Shortest annealing region recognized on a tailed assembly primer.
pub const MIN_ANNEAL_LEN: usize = 10;

/// Which cascade level produced a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingMethod {
    ExplicitHint,
    ExactMatch,
    MutationAnchor,
    DualAnchor,
    ThreePrimeAnchor,
    WeightedScan,
}

/// A located binding site in template coordinates. `end` may exceed the
/// template length on circular templates (the site wraps the origin).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingResult {
    pub start: usize,
    pub end: usize,
    pub match_length: usize,
    /// Confidence in [0, 1]; 1.0 only for hint/exact placements.
    pub score: f64,
    pub method: BindingMethod,
}

/// Marks a primer as mutagenic. When the edit offset is known the cheap
/// flank estimate (level 3) applies; without it only the anchor searches
/// (levels 4-5) run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MutagenesisContext {
    pub edit_offset: Option<usize>,
}

/// Caller-supplied knowledge about a primer's placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingRequest {
    /// Known start/end in template coordinates; trusted if in bounds.
    pub hint: Option<(usize, usize)>,
    pub mutagenesis: Option<MutagenesisContext>,
}

/// Locates a primer's binding position on a template.
#[derive(Clone, Debug, Default)]
pub struct SequenceAligner;

impl SequenceAligner {
    pub fn new() -> Self {
        Self
    }

    /// Runs the cascade. `primer` is given 5'→3'; reverse primers are
    /// reverse-complemented internally so all coordinates refer to the
    /// template's forward strand.
    pub fn find_binding(
        &self,
        template: &Template,
        primer: &[u8],
        direction: Direction,
        request: &BindingRequest,
    ) -> Result<BindingResult, DesignError> {
        if primer.len() < MIN_PRIMER_LEN {
            return Err(DesignError::InputTooShort {
                what: "Primer".to_string(),
                length: primer.len(),
                minimum: MIN_PRIMER_LEN,
            });
        }

        let needle = match direction {
            Direction::Forward => primer.to_vec(),
            Direction::Reverse => reverse_complement(primer),
        };
        let haystack = search_space(template, needle.len());

        if let Some(hit) = self.level_hint(template, &needle, request) {
            return Ok(hit);
        }
        if let Some(hit) = self.level_exact(template, &haystack, &needle) {
            return Ok(hit);
        }
        if let Some(ctx) = &request.mutagenesis {
            if let Some(hit) = self.level_mutation_anchor(template, &needle, direction, ctx) {
                return Ok(hit);
            }
            if let Some(hit) = self.level_dual_anchor(template, &haystack, &needle) {
                return Ok(hit);
            }
            if let Some(hit) = self.level_three_prime_anchor(template, &haystack, &needle, direction)
            {
                return Ok(hit);
            }
        }
        if let Some(hit) = self.level_weighted_scan(template, &haystack, &needle, direction) {
            return Ok(hit);
        }
        Err(DesignError::BindingNotFound)
    }

    /// Splits a tailed assembly primer into its non-binding 5' tail and the
    /// longest 3' suffix that occurs verbatim on the template. Returns the
    /// tail length together with the suffix's binding site.
    pub fn locate_annealing_region(
        &self,
        template: &Template,
        primer: &[u8],
    ) -> Option<(usize, BindingResult)> {
        let len = primer.len();
        if len < MIN_ANNEAL_LEN {
            return None;
        }
        let haystack = search_space(template, len);
        for anneal_len in (MIN_ANNEAL_LEN..=len).rev() {
            let suffix = &primer[len - anneal_len..];
            if let Some(pos) = find_subsequence(&haystack, suffix, 0) {
                let start = pos % template.len().max(1);
                return Some((
                    len - anneal_len,
                    BindingResult {
                        start,
                        end: start + anneal_len,
                        match_length: anneal_len,
                        score: anneal_len as f64 / len as f64,
                        method: BindingMethod::ThreePrimeAnchor,
                    },
                ));
            }
        }
        None
    }

    // ── Cascade levels ──────────────────────────────────────────────

    fn level_hint(
        &self,
        template: &Template,
        needle: &[u8],
        request: &BindingRequest,
    ) -> Option<BindingResult> {
        let (start, end) = request.hint?;
        let in_bounds = start < end
            && (end <= template.len() || (template.is_circular() && start < template.len()));
        if !in_bounds {
            return None;
        }
        Some(BindingResult {
            start,
            end,
            match_length: needle.len().min(end - start),
            score: 1.0,
            method: BindingMethod::ExplicitHint,
        })
    }

    fn level_exact(
        &self,
        template: &Template,
        haystack: &[u8],
        needle: &[u8],
    ) -> Option<BindingResult> {
        let pos = find_subsequence(haystack, needle, 0)?;
        let start = pos % template.len().max(1);
        Some(BindingResult {
            start,
            end: start + needle.len(),
            match_length: needle.len(),
            score: 1.0,
            method: BindingMethod::ExactMatch,
        })
    }

    fn level_mutation_anchor(
        &self,
        template: &Template,
        needle: &[u8],
        direction: Direction,
        ctx: &MutagenesisContext,
    ) -> Option<BindingResult> {
        let edit_offset = ctx.edit_offset?;
        let len = needle.len() as i64;
        let (start, end) = match direction {
            Direction::Forward => {
                let start = edit_offset as i64 - MUTATION_ANCHOR_FORWARD_FLANK as i64;
                (start, start + len)
            }
            Direction::Reverse => {
                let end = edit_offset as i64 + MUTATION_ANCHOR_REVERSE_FLANK as i64;
                (end - len, end)
            }
        };
        // The estimate is only bounds-checked, never verified against the
        // template: a documented approximation.
        if template.is_circular() {
            let start = start.rem_euclid(template.len() as i64) as usize;
            return Some(self.mutation_anchor_result(start, needle.len()));
        }
        if start < 0 || end > template.len() as i64 {
            return None;
        }
        Some(self.mutation_anchor_result(start as usize, needle.len()))
    }

    fn mutation_anchor_result(&self, start: usize, len: usize) -> BindingResult {
        BindingResult {
            start,
            end: start + len,
            match_length: len,
            score: MUTATION_ANCHOR_SCORE,
            method: BindingMethod::MutationAnchor,
        }
    }

    fn level_dual_anchor(
        &self,
        template: &Template,
        haystack: &[u8],
        needle: &[u8],
    ) -> Option<BindingResult> {
        let len = needle.len();
        let hi = len / 2;
        let lo = DUAL_ANCHOR_FLOOR.max(len * 2 / 5);
        if hi < lo {
            return None;
        }
        for anchor_len in (lo..=hi).rev() {
            let prefix = &needle[..anchor_len];
            let suffix = &needle[len - anchor_len..];
            let prefix_hits = find_all_subsequences(haystack, prefix);
            if prefix_hits.is_empty() {
                continue;
            }
            let suffix_hits = find_all_subsequences(haystack, suffix);
            let expected_gap = (len - 2 * anchor_len) as i64;
            for &p in &prefix_hits {
                for &s in &suffix_hits {
                    if s <= p {
                        continue;
                    }
                    let gap = s as i64 - (p + anchor_len) as i64;
                    if (gap - expected_gap).abs() <= DUAL_ANCHOR_GAP_TOLERANCE {
                        let start = p % template.len().max(1);
                        return Some(BindingResult {
                            start,
                            end: start + (s + anchor_len - p),
                            match_length: 2 * anchor_len,
                            score: (2 * anchor_len) as f64 / len as f64,
                            method: BindingMethod::DualAnchor,
                        });
                    }
                }
            }
        }
        None
    }

    /// The primer's 3' end sits at the needle's tail for forward primers
    /// and at its head for reverse primers (the needle is the reverse
    /// complement).
    fn level_three_prime_anchor(
        &self,
        template: &Template,
        haystack: &[u8],
        needle: &[u8],
        direction: Direction,
    ) -> Option<BindingResult> {
        let len = needle.len();
        let hi = THREE_PRIME_ANCHOR_MAX.min(len);
        if hi < THREE_PRIME_ANCHOR_MIN {
            return None;
        }
        for anchor_len in (THREE_PRIME_ANCHOR_MIN..=hi).rev() {
            let anchor = match direction {
                Direction::Forward => &needle[len - anchor_len..],
                Direction::Reverse => &needle[..anchor_len],
            };
            let hits = find_all_subsequences(haystack, anchor);
            if hits.len() == 1 {
                let end = match direction {
                    Direction::Forward => hits[0] + anchor_len,
                    Direction::Reverse => hits[0] + len,
                };
                let start = end.saturating_sub(len);
                let start = start % template.len().max(1);
                return Some(BindingResult {
                    start,
                    end: start + len,
                    match_length: anchor_len,
                    score: anchor_len as f64 / len as f64,
                    method: BindingMethod::ThreePrimeAnchor,
                });
            }
        }
        None
    }

    fn level_weighted_scan(
        &self,
        template: &Template,
        haystack: &[u8],
        needle: &[u8],
        direction: Direction,
    ) -> Option<BindingResult> {
        let len = needle.len();
        if haystack.len() < len || len < SCAN_THREE_PRIME_WINDOW {
            return None;
        }
        // the primer's last 10 bases count double; on the needle those sit
        // at the tail (forward) or the head (reverse)
        let in_three_prime_window = |k: usize| match direction {
            Direction::Forward => k >= len - SCAN_THREE_PRIME_WINDOW,
            Direction::Reverse => k < SCAN_THREE_PRIME_WINDOW,
        };

        let mut best: Option<(usize, usize, usize)> = None; // (weighted, matches, offset)
        for offset in 0..=haystack.len() - len {
            let window = &haystack[offset..offset + len];
            let mut matches = 0usize;
            let mut tail_matches = 0usize;
            for (k, (&a, &b)) in window.iter().zip(needle.iter()).enumerate() {
                if a == b {
                    matches += 1;
                    if in_three_prime_window(k) {
                        tail_matches += 1;
                    }
                }
            }
            if tail_matches < SCAN_THREE_PRIME_REQUIRED {
                continue;
            }
            let weighted = matches + tail_matches;
            // strict comparison keeps the earliest best position
            if best.map(|(w, _, _)| weighted > w).unwrap_or(true) {
                best = Some((weighted, matches, offset));
            }
        }

        let (weighted, matches, offset) = best?;
        let start = offset % template.len().max(1);
        Some(BindingResult {
            start,
            end: start + len,
            match_length: matches,
            score: weighted as f64 / (len + SCAN_THREE_PRIME_WINDOW) as f64,
            method: BindingMethod::WeightedScan,
        })
    }
}

/// Forward strand, extended past the origin for circular templates so
/// matches can wrap.
fn search_space(template: &Template, needle_len: usize) -> Vec<u8> {
    let seq = template.forward();
    if template.is_circular() && needle_len > 1 && seq.len() > needle_len {
        let mut extended = seq.to_vec();
        extended.extend_from_slice(&seq[..needle_len - 1]);
        extended
    } else {
        seq.to_vec()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

fn find_all_subsequences(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut ret = vec![];
    let mut from = 0;
    while let Some(pos) = find_subsequence(haystack, needle, from) {
        ret.push(pos);
        from = pos + 1;
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(seq: &str) -> Template {
        Template::from_sequence(seq).unwrap()
    }

    const T60: &str = "GCAGTCCAGGCTACGGTCACATTTAGCATAAGTCAATTGAGACGTTGGACGCTAAGCCAG";

    #[test]
    fn test_exact_match_with_padding() {
        let p = b"GCGTACGTTAGC";
        let t = template(&format!("AAAA{}TTTT", String::from_utf8_lossy(p)));
        let hit = SequenceAligner::new()
            .find_binding(&t, p, Direction::Forward, &BindingRequest::default())
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ExactMatch);
        assert_eq!(hit.score, 1.0);
        assert_eq!(hit.start, 4);
        assert_eq!(hit.end, 4 + p.len());
    }

    #[test]
    fn test_exact_match_reverse_primer() {
        let t = template(T60);
        // reverse primer annealing over template[20..40)
        let site = &t.forward()[20..40];
        let primer = reverse_complement(site);
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Reverse, &BindingRequest::default())
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ExactMatch);
        assert_eq!(hit.start, 20);
        assert_eq!(hit.end, 40);
    }

    #[test]
    fn test_explicit_hint_wins() {
        let t = template(T60);
        let request = BindingRequest {
            hint: Some((5, 25)),
            mutagenesis: None,
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &t.forward()[30..50].to_vec(), Direction::Forward, &request)
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ExplicitHint);
        assert_eq!((hit.start, hit.end), (5, 25));
    }

    #[test]
    fn test_weighted_scan_with_internal_mismatch() {
        let t = template(T60);
        // 22-mer from position 10 with one mismatch at index 5 (well away
        // from the 3' end): exact fails, anchors are not consulted without
        // a mutagenesis context, the weighted scan must place it.
        let mut primer = t.forward()[10..32].to_vec();
        primer[5] = match primer[5] {
            b'A' => b'C',
            _ => b'A',
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Forward, &BindingRequest::default())
            .unwrap();
        assert_eq!(hit.method, BindingMethod::WeightedScan);
        assert_eq!(hit.start, 10);
        assert!(hit.score > 0.0 && hit.score < 1.0);
        assert_eq!(hit.match_length, 21);
    }

    #[test]
    fn test_weighted_scan_reverse_primer_with_mismatch() {
        let t = template(T60);
        // reverse primer over template[20..42) with a mismatch in its 5'
        // half; the doubled window must track the primer's 3' end, which
        // lies at the start of the forward-strand site
        let mut primer = reverse_complement(&t.forward()[20..42]);
        primer[5] = match primer[5] {
            b'A' => b'C',
            _ => b'A',
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Reverse, &BindingRequest::default())
            .unwrap();
        assert_eq!(hit.method, BindingMethod::WeightedScan);
        assert_eq!(hit.start, 20);
        assert_eq!(hit.end, 42);
        assert!(hit.score > 0.0 && hit.score < 1.0);
    }

    #[test]
    fn test_three_prime_anchor_reverse_primer() {
        let t = template(T60);
        // 5' tail the template never contains, then a 3' half annealing
        // over template[20..34)
        let mut primer = b"GGGGGGGGGG".to_vec();
        primer.extend_from_slice(&reverse_complement(&t.forward()[20..34]));
        let request = BindingRequest {
            hint: None,
            mutagenesis: Some(MutagenesisContext { edit_offset: None }),
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Reverse, &request)
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ThreePrimeAnchor);
        assert_eq!(hit.start, 20);
    }

    #[test]
    fn test_mutation_anchor_estimate() {
        let t = template(T60);
        let request = BindingRequest {
            hint: None,
            mutagenesis: Some(MutagenesisContext {
                edit_offset: Some(30),
            }),
        };
        // a primer that exists nowhere on the template
        let primer = b"GTGTGTGTGTGTGTGTGTGT";
        let hit = SequenceAligner::new()
            .find_binding(&t, primer, Direction::Forward, &request)
            .unwrap();
        assert_eq!(hit.method, BindingMethod::MutationAnchor);
        assert_eq!(hit.start, 30 - MUTATION_ANCHOR_FORWARD_FLANK);
        assert_eq!(hit.score, MUTATION_ANCHOR_SCORE);
    }

    #[test]
    fn test_dual_anchor_spans_central_edit() {
        let t = template(T60);
        // 24-mer over template[10..34) with a 3-base central substitution;
        // flagged mutagenic with unknown offset, so the flank estimate is
        // skipped and the anchors must find the flanks.
        let mut primer = t.forward()[10..34].to_vec();
        for k in 11..14 {
            primer[k] = match primer[k] {
                b'A' => b'C',
                _ => b'A',
            };
        }
        let request = BindingRequest {
            hint: None,
            mutagenesis: Some(MutagenesisContext { edit_offset: None }),
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Forward, &request)
            .unwrap();
        assert_eq!(hit.method, BindingMethod::DualAnchor);
        assert_eq!(hit.start, 10);
        assert!(hit.score > 0.5 && hit.score < 1.0);
    }

    #[test]
    fn test_three_prime_anchor_on_tailed_primer() {
        let t = template(T60);
        // synthetic 5' tail the template never contains, 14 template bases
        // at the 3' end
        let mut primer = b"GGGGGGGGGG".to_vec();
        primer.extend_from_slice(&t.forward()[20..34]);
        let request = BindingRequest {
            hint: None,
            mutagenesis: Some(MutagenesisContext { edit_offset: None }),
        };
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Forward, &request)
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ThreePrimeAnchor);
        assert_eq!(hit.end, 34);
    }

    #[test]
    fn test_binding_not_found() {
        let t = template(T60);
        let primer = b"GGGGGGGGGGGGGGGGGGGG";
        let err = SequenceAligner::new()
            .find_binding(&t, primer, Direction::Forward, &BindingRequest::default())
            .unwrap_err();
        assert_eq!(err, DesignError::BindingNotFound);
    }

    #[test]
    fn test_primer_too_short() {
        let t = template(T60);
        let err = SequenceAligner::new()
            .find_binding(&t, b"ATGCATG", Direction::Forward, &BindingRequest::default())
            .unwrap_err();
        assert!(matches!(err, DesignError::InputTooShort { .. }));
    }

    #[test]
    fn test_exact_match_across_circular_origin() {
        let mut t = Template::from_sequence(T60).unwrap();
        t.set_circular(true);
        // primer spanning the origin: last 8 + first 8 bases
        let mut primer = t.forward()[52..60].to_vec();
        primer.extend_from_slice(&t.forward()[..8]);
        let hit = SequenceAligner::new()
            .find_binding(&t, &primer, Direction::Forward, &BindingRequest::default())
            .unwrap();
        assert_eq!(hit.method, BindingMethod::ExactMatch);
        assert_eq!(hit.start, 52);
        assert_eq!(hit.end, 68);
    }

    #[test]
    fn test_locate_annealing_region() {
        let t = template(T60);
        let mut primer = b"GGGGGGGG".to_vec();
        primer.extend_from_slice(&t.forward()[25..43]);
        let (tail_len, hit) = SequenceAligner::new()
            .locate_annealing_region(&t, &primer)
            .unwrap();
        assert_eq!(tail_len, 8);
        assert_eq!(hit.start, 25);
        assert_eq!(hit.end, 43);
    }
}
