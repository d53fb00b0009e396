pub mod equivalence;
pub mod newick;
pub mod permutation;
pub mod taxa;
pub mod topology;
pub mod vector;

pub use self::equivalence::{equivalents, sample_equivalent, Equivalent};
pub use self::newick::relabel;
pub use self::permutation::LeafPermutation;
pub use self::taxa::TaxaMap;
pub use self::topology::Topology;
pub use self::vector::{canonicalize, decode, decode_newick, encode, encode_topology, sample};

use thiserror::Error;

/// A v-vector that does not describe a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty vector: a tree needs at least two taxa")]
    Empty,

    #[error("v[{position}] = {value} is outside 0..={max}")]
    OutOfRange {
        position: usize,
        value: usize,
        max: usize,
    },
}

/// Malformed or unsupported bracket notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected '{found}' at byte {at}")]
    Unexpected { at: usize, found: String },

    #[error("notation ended before the tree was complete")]
    UnexpectedEnd,

    #[error("unterminated quoted label starting at byte {at}")]
    UnterminatedQuote { at: usize },

    #[error("unterminated comment starting at byte {at}")]
    UnterminatedComment { at: usize },

    #[error("invalid branch length '{value}' at byte {at}")]
    BadLength { at: usize, value: String },

    #[error("trailing input after ';' at byte {at}")]
    TrailingInput { at: usize },

    #[error("leaf label '{label}' does not name a known taxon")]
    UnknownLeaf { label: String },

    #[error("leaf identifier {id} is outside 0..{leaves}")]
    LeafOutOfRange { id: usize, leaves: usize },

    #[error("leaf {0} appears more than once")]
    DuplicateLeaf(usize),

    #[error("node with {children} children: only binary trees (or a trifurcating root) are supported")]
    NotBinary { children: usize },

    #[error("a tree needs at least two leaves")]
    TooFewLeaves,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("value {value} is outside 0..{len}")]
    OutOfRange { value: usize, len: usize },

    #[error("value {0} is assigned twice")]
    Repeated(usize),

    #[error("permutation covers {found} leaves, expected {expected}")]
    SizeMismatch { expected: usize, found: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxaError {
    #[error("alignment has no taxa")]
    Empty,

    #[error("taxon name '{0}' appears more than once")]
    Duplicate(String),

    #[error("taxon {0} has a blank name")]
    Blank(usize),
}
