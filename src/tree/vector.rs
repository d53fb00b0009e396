//! The v-vector codec.
//!
//! A tree over taxa `0..=k` is built by sequential addition. Position `i` of the vector
//! grafts taxon `i + 1` onto the rooted tree over taxa `0..=i`, which has `2i + 1` edges:
//!
//! * `v[i] = p` with `p <= i` grafts onto the edge above leaf `p`;
//! * `v[i] = i + r` with `1 <= r <= i` grafts onto the edge above the internal node that
//!   was created when taxon `r` was added.
//!
//! `v[0]` is therefore always `0`, and there are exactly `(2k - 1)!!` valid vectors.

use super::{DecodeError, LeafPermutation, ParseError, Topology};

/// Largest admissible value at `position`.
#[inline]
pub fn max_value(position: usize) -> usize {
    2 * position
}

pub fn validate(v: &[usize]) -> Result<(), DecodeError> {
    if v.is_empty() {
        return Err(DecodeError::Empty);
    }
    for (position, &value) in v.iter().enumerate() {
        let max = max_value(position);
        if value > max {
            return Err(DecodeError::OutOfRange {
                position,
                value,
                max,
            });
        }
    }
    Ok(())
}

/// Number of distinct vectors of length `k`, or `None` on overflow.
pub fn tree_count(k: usize) -> Option<u128> {
    (0..k).try_fold(1u128, |acc, i| acc.checked_mul(2 * i as u128 + 1))
}

/// Builds the tree described by `v`.
pub fn decode(v: &[usize]) -> Result<Topology, DecodeError> {
    validate(v)?;

    let mut tree = Topology::seed();
    // joints[r] = internal node created when taxon r was added
    let mut joints = vec![usize::MAX; v.len() + 1];

    for (i, &value) in v.iter().enumerate() {
        let target = if value <= i {
            tree.leaf_node(value)
        } else {
            joints[value - i]
        };
        joints[i + 1] = tree.graft_above(target, i + 1);
    }

    Ok(tree)
}

/// Decodes straight to bracket notation with integer leaves.
pub fn decode_newick(v: &[usize], rooted: bool) -> Result<String, DecodeError> {
    Ok(decode(v)?.to_newick(rooted))
}

/// Recovers the vector of a tree by pruning leaves from the largest identifier down.
pub fn encode_topology(tree: &Topology) -> Vec<usize> {
    let k = tree.leaf_count().saturating_sub(1);
    let mut work = tree.clone();
    let mut owner = vec![0usize; tree.node_count()];
    let mut siblings = vec![0usize; k + 1];

    for leaf in (1..=k).rev() {
        // Every leaf but the last has a parent while leaves remain above it.
        if let Some((joint, sibling)) = work.prune_leaf(leaf) {
            owner[joint] = leaf;
            siblings[leaf] = sibling;
        }
    }

    // Owners are only fully known once every leaf has been pruned.
    (1..=k)
        .map(|leaf| {
            let position = leaf - 1;
            let sibling = siblings[leaf];
            match tree.leaf_id(sibling) {
                Some(id) => id,
                None => position + owner[sibling],
            }
        })
        .collect()
}

/// Parses integer-labelled notation and returns its vector.
///
/// Rooted notation round-trips exactly. Unrooted notation is rooted above its last
/// top-level subtree first, so the result describes the same unrooted tree.
pub fn encode(notation: &str) -> Result<Vec<usize>, ParseError> {
    Ok(encode_topology(&Topology::from_newick(notation)?))
}

/// Draws a uniformly random vector of length `k`.
pub fn sample(k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    (0..k).map(|i| rng.usize(0..=max_value(i))).collect()
}

/// Renumbers leaves in the order they appear in the rooted notation and re-encodes.
///
/// Returns the new vector with the permutation (`old -> new`) that was applied, so the
/// caller can move the taxa mapping along with it. Applying the rule twice changes nothing.
pub fn canonicalize(v: &[usize]) -> Result<(Vec<usize>, LeafPermutation), DecodeError> {
    let tree = decode(v)?;
    let permutation = LeafPermutation::from_order(&tree.leaf_order());
    let renumbered = tree.relabel(&permutation);
    Ok((encode_topology(&renumbered), permutation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_position_is_fixed() {
        assert!(validate(&[0]).is_ok());
        assert_eq!(
            validate(&[1]),
            Err(DecodeError::OutOfRange {
                position: 0,
                value: 1,
                max: 0
            })
        );
    }

    #[test]
    fn test_tree_count_is_double_factorial() {
        assert_eq!(tree_count(1), Some(1));
        assert_eq!(tree_count(2), Some(3));
        assert_eq!(tree_count(3), Some(15));
        assert_eq!(tree_count(4), Some(105));
    }

    #[test]
    fn test_exhaustive_small_space_is_bijective() {
        let mut seen = std::collections::BTreeSet::new();
        for a in 0..=2 {
            for b in 0..=4 {
                let v = vec![0, a, b];
                let tree = decode(&v).unwrap();
                assert_eq!(encode_topology(&tree), v);
                assert!(seen.insert(tree.clusters()));
            }
        }
        assert_eq!(seen.len(), 15);
    }
}
