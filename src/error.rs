use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Errors produced by the design engine and its components.
///
/// `BindingNotFound` is non-fatal: a failed binding search degrades the
/// affected feature to "unknown" rather than aborting an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DesignError {
    /// Empty input, or characters other than A/T/G/C after cleaning.
    InvalidSequence(String),
    /// Primer shorter than 10 bp or template shorter than 50 bp.
    InputTooShort {
        what: String,
        length: usize,
        minimum: usize,
    },
    /// Region outside template bounds, or end < start on a linear template.
    InvalidRegion {
        start: usize,
        end: usize,
        template_length: usize,
    },
    /// No candidate satisfies the hard Tm/length/GC constraints.
    NoFeasibleDesign(String),
    /// The aligner cascade was exhausted without a match.
    BindingNotFound,
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSequence(message) => write!(f, "Invalid sequence: {message}"),
            Self::InputTooShort {
                what,
                length,
                minimum,
            } => write!(f, "{what} is {length} bp, minimum is {minimum} bp"),
            Self::InvalidRegion {
                start,
                end,
                template_length,
            } => write!(
                f,
                "Region {start}..{end} is not valid on a template of {template_length} bp"
            ),
            Self::NoFeasibleDesign(message) => write!(f, "No feasible design: {message}"),
            Self::BindingNotFound => write!(f, "No binding site found for primer"),
        }
    }
}

impl Error for DesignError {}

impl From<String> for DesignError {
    fn from(message: String) -> Self {
        DesignError::InvalidSequence(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = DesignError::InputTooShort {
            what: "Template".to_string(),
            length: 30,
            minimum: 50,
        };
        assert_eq!(e.to_string(), "Template is 30 bp, minimum is 50 bp");

        let e = DesignError::InvalidRegion {
            start: 55,
            end: 70,
            template_length: 60,
        };
        assert!(e.to_string().contains("55..70"));
    }

    #[test]
    fn test_roundtrip_serde() {
        let e = DesignError::BindingNotFound;
        let json = serde_json::to_string(&e).unwrap();
        let back: DesignError = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
