use super::{LeafPermutation, PermutationError, TaxaError};
use serde::Serialize;
use std::collections::HashMap;

/// Characters that cannot appear in an unquoted Newick label.
const RESERVED: &[char] = &['(', ')', ',', ':', ';', '[', ']', '\''];

/// Bijection from integer leaf identifier to taxon name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxaMap {
    names: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TaxaMap {
    /// Identifiers `0..n` follow the alignment's record order.
    pub fn initial<I, S>(columns: I) -> Result<Self, TaxaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = columns
            .into_iter()
            .map(|c| sanitize(c.as_ref()))
            .collect();
        if names.is_empty() {
            return Err(TaxaError::Empty);
        }
        Self::from_names(names)
    }

    fn from_names(names: Vec<String>) -> Result<Self, TaxaError> {
        let mut index = HashMap::with_capacity(names.len());
        for (id, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(TaxaError::Blank(id));
            }
            if index.insert(name.clone(), id).is_some() {
                return Err(TaxaError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names, index })
    }

    /// Produces the mapping that keeps every taxon attached to the same leaf after
    /// identifiers were renumbered by `permutation` (`old -> new`).
    pub fn reorder(&self, permutation: &LeafPermutation) -> Result<Self, PermutationError> {
        if permutation.len() != self.names.len() {
            return Err(PermutationError::SizeMismatch {
                expected: self.names.len(),
                found: permutation.len(),
            });
        }
        let mut names = vec![String::new(); self.names.len()];
        for (old, name) in self.names.iter().enumerate() {
            names[permutation.apply(old)] = name.clone();
        }
        let index = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect();
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }
}

/// Makes a FASTA record name usable as a Newick leaf label.
pub fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                '.'
            } else if RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}
