use crate::error::DesignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

pub type DnaString = Vec<u8>;

/// Strand a primer anneals to, relative to the template's forward strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// Strips whitespace, uppercases, and rejects anything outside {A,T,G,C}.
///
/// Upstream parsers hand the core cleaned sequence text; this is the single
/// normalization point, so every component downstream can assume strict
/// ATGC bytes.
pub fn clean_sequence(raw: &str) -> Result<DnaString, DesignError> {
    let mut cleaned = Vec::with_capacity(raw.len());
    for c in raw.bytes() {
        if c.is_ascii_whitespace() {
            continue;
        }
        let upper = c.to_ascii_uppercase();
        match upper {
            b'A' | b'T' | b'G' | b'C' => cleaned.push(upper),
            _ => {
                return Err(DesignError::InvalidSequence(format!(
                    "unexpected character '{}'",
                    upper as char
                )))
            }
        }
    }
    if cleaned.is_empty() {
        return Err(DesignError::InvalidSequence("empty sequence".to_string()));
    }
    Ok(cleaned)
}

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        other => other,
    }
}

#[inline(always)]
pub fn reverse_complement(seq: &[u8]) -> DnaString {
    bio::alphabets::dna::revcomp(seq)
}

/// A design template: a cleaned ATGC sequence plus topology.
///
/// Circular templates allow region selection across the origin; all range
/// arithmetic goes through [`Template::range`] so wrap-around is handled in
/// one place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Template {
    seq: DnaString,
    circular: bool,
}

impl Template {
    pub fn from_sequence(sequence: &str) -> Result<Self, DesignError> {
        Ok(Self {
            seq: clean_sequence(sequence)?,
            circular: false,
        })
    }

    pub fn from_sequence_circular(sequence: &str) -> Result<Self, DesignError> {
        let mut ret = Self::from_sequence(sequence)?;
        ret.circular = true;
        Ok(ret)
    }

    #[inline(always)]
    pub fn forward(&self) -> &[u8] {
        &self.seq
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    #[inline(always)]
    pub fn is_circular(&self) -> bool {
        self.circular
    }

    pub fn set_circular(&mut self, circular: bool) {
        self.circular = circular;
    }

    #[inline(always)]
    pub fn base_safe(&self, i: usize) -> Option<u8> {
        let i = if self.circular { i % self.len() } else { i };
        self.seq.get(i).copied()
    }

    /// Extracts `start..end` in template coordinates.
    ///
    /// On circular templates the coordinates may run past the origin in
    /// either direction (negative start, end beyond length); each index is
    /// taken modulo the length. On linear templates any out-of-bounds
    /// coordinate yields `None`. A selection longer than the template is
    /// never valid.
    pub fn range(&self, start: i64, end: i64) -> Option<DnaString> {
        if start >= end {
            return None;
        }
        let len = self.len() as i64;
        if (end - start) > len {
            return None;
        }
        if self.circular {
            Some(
                (start..end)
                    .map(|i| self.seq[i.rem_euclid(len) as usize])
                    .collect(),
            )
        } else {
            if start < 0 || end > len {
                return None;
            }
            Some(self.seq[start as usize..end as usize].to_vec())
        }
    }

    /// Like [`Template::range`] but maps failure to `InvalidRegion`.
    pub fn range_or_err(&self, start: i64, end: i64) -> Result<DnaString, DesignError> {
        self.range(start, end).ok_or(DesignError::InvalidRegion {
            start: start.max(0) as usize,
            end: end.max(0) as usize,
            template_length: self.len(),
        })
    }

    /// Normalizes an i64 offset to a template index.
    #[inline(always)]
    pub fn wrap_index(&self, i: i64) -> usize {
        if self.circular {
            i.rem_euclid(self.len() as i64) as usize
        } else {
            i.clamp(0, self.len() as i64) as usize
        }
    }

    /// Length of the region `start..end`, wrapping on circular templates
    /// when `end < start`.
    pub fn region_length(&self, region: &Range<usize>) -> Option<usize> {
        if region.end >= region.start {
            Some(region.end - region.start)
        } else if self.circular {
            Some(self.len() - region.start + region.end)
        } else {
            None
        }
    }

    pub fn get_forward_string(&self) -> String {
        String::from_utf8_lossy(&self.seq).to_string()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.seq))
    }
}
