pub mod binding;
pub mod codon;
pub mod design;
pub mod error;
pub mod folding;
pub mod progressive;
pub mod scoring;
pub mod template;
pub mod thermodynamics;
