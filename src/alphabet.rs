//! Sequence alphabets a substitution model can be attached to
//!
//! The state ordering here is the ordering of rows/columns in every matrix
//! the crate produces, so callers encoding observed data must use
//! [`SequenceType::state_index`] to stay consistent.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Binary (presence/absence) states.
const BINARY_SYMBOLS: [&str; 2] = ["0", "1"];

/// Nucleotide states, in matrix order.
const DNA_SYMBOLS: [&str; 4] = ["A", "C", "G", "T"];

/// Amino-acid states in the conventional PAML/JTT order.
const AMINO_ACID_SYMBOLS: [&str; 20] = [
    "A", "R", "N", "D", "C", "Q", "E", "G", "H", "I",
    "L", "K", "M", "F", "P", "S", "T", "W", "Y", "V",
];

/// Codon position order used when enumerating codons (T, C, A, G).
const CODON_BASES: [char; 4] = ['T', 'C', 'A', 'G'];

/// Stop codons of the standard genetic code
const STOP_CODONS: [&str; 3] = ["TAA", "TAG", "TGA"];

/// The 61 sense codons, enumerated n0*16 + n1*4 + n2 over TCAG
static SENSE_CODONS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut codons = Vec::with_capacity(61);
    for &a in &CODON_BASES {
        for &b in &CODON_BASES {
            for &c in &CODON_BASES {
                let codon: String = [a, b, c].iter().collect();
                if !STOP_CODONS.contains(&codon.as_str()) {
                    codons.push(codon);
                }
            }
        }
    }
    codons
});

static DNA_INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| index_map(DNA_SYMBOLS.iter().copied()));

static AMINO_ACID_INDEX: Lazy<HashMap<String, usize>> =
    Lazy::new(|| index_map(AMINO_ACID_SYMBOLS.iter().copied()));

static CODON_INDEX: Lazy<HashMap<String, usize>> =
    Lazy::new(|| index_map(SENSE_CODONS.iter().map(String::as_str)));

fn index_map<'a>(symbols: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    symbols.enumerate().map(|(i, s)| (s.to_string(), i)).collect()
}

/// Kind of sequence data a model handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    Binary,
    Dna,
    AminoAcid,
    Codon,
    /// Any other state space; states are named by their index.
    Custom(usize),
}

impl SequenceType {
    /// Number of Markov states.
    pub fn alphabet_size(self) -> usize {
        match self {
            SequenceType::Binary => BINARY_SYMBOLS.len(),
            SequenceType::Dna => DNA_SYMBOLS.len(),
            SequenceType::AminoAcid => AMINO_ACID_SYMBOLS.len(),
            SequenceType::Codon => SENSE_CODONS.len(),
            SequenceType::Custom(n) => n,
        }
    }

    /// State symbols in matrix order.
    pub fn symbols(self) -> Vec<String> {
        let owned = |symbols: &[&str]| -> Vec<String> { symbols.iter().map(|s| s.to_string()).collect() };
        match self {
            SequenceType::Binary => owned(&BINARY_SYMBOLS),
            SequenceType::Dna => owned(&DNA_SYMBOLS),
            SequenceType::AminoAcid => owned(&AMINO_ACID_SYMBOLS),
            SequenceType::Codon => SENSE_CODONS.to_vec(),
            SequenceType::Custom(n) => (0..n).map(|i| i.to_string()).collect(),
        }
    }

    /// Matrix index of a state symbol.
    ///
    /// Matching is case-insensitive; for nucleotide-based alphabets `U` is
    /// read as `T`. Returns `None` for gaps, ambiguity codes and stop codons.
    pub fn state_index(self, symbol: &str) -> Option<usize> {
        let key = symbol.trim().to_ascii_uppercase();
        match self {
            SequenceType::Binary => BINARY_SYMBOLS.iter().position(|&s| s == key),
            SequenceType::Dna => DNA_INDEX.get(&key.replace('U', "T")).copied(),
            SequenceType::AminoAcid => AMINO_ACID_INDEX.get(&key).copied(),
            SequenceType::Codon => CODON_INDEX.get(&key.replace('U', "T")).copied(),
            SequenceType::Custom(n) => key.parse::<usize>().ok().filter(|&i| i < n),
        }
    }

    /// Named sequence type for an alphabet size, falling back to `Custom`.
    pub fn from_alphabet_size(n: usize) -> Self {
        [
            SequenceType::Binary,
            SequenceType::Dna,
            SequenceType::AminoAcid,
            SequenceType::Codon,
        ]
        .into_iter()
        .find(|t| t.alphabet_size() == n)
        .unwrap_or(SequenceType::Custom(n))
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Binary => f.write_str("Binary"),
            SequenceType::Dna => f.write_str("DNA"),
            SequenceType::AminoAcid => f.write_str("AminoAcid"),
            SequenceType::Codon => f.write_str("Codon"),
            SequenceType::Custom(n) => write!(f, "Custom({})", n),
        }
    }
}
