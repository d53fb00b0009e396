use super::PermutationError;

/// A bijection over leaf identifiers, `old id -> new id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeafPermutation {
    forward: Vec<usize>,
}

impl LeafPermutation {
    pub fn new(forward: Vec<usize>) -> Result<Self, PermutationError> {
        let len = forward.len();
        let mut seen = vec![false; len];
        for &value in &forward {
            if value >= len {
                return Err(PermutationError::OutOfRange { value, len });
            }
            if seen[value] {
                return Err(PermutationError::Repeated(value));
            }
            seen[value] = true;
        }
        Ok(Self { forward })
    }

    /// Built from an ordering: `order[new] = old`.
    pub(crate) fn from_order(order: &[usize]) -> Self {
        let mut forward = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            forward[old] = new;
        }
        Self { forward }
    }

    pub fn identity(len: usize) -> Self {
        Self {
            forward: (0..len).collect(),
        }
    }

    /// Swaps `a` and `b`, fixes everything else. Out-of-range indices are ignored.
    pub fn transposition(len: usize, a: usize, b: usize) -> Self {
        let mut forward: Vec<usize> = (0..len).collect();
        if a < len && b < len {
            forward.swap(a, b);
        }
        Self { forward }
    }

    pub fn reversal(len: usize) -> Self {
        Self {
            forward: (0..len).rev().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.forward.iter().enumerate().all(|(i, &v)| i == v)
    }

    /// New identifier of leaf `old`.
    pub fn apply(&self, old: usize) -> usize {
        self.forward[old]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.forward
    }
}
