//! Alternative encodings of one topology.
//!
//! The same tree has many vectors: one per addition order, and, when the root carries no
//! meaning, one per rooting as well. Each equivalent carries the leaf permutation that
//! produced it so the taxa mapping can follow.

use super::{vector, DecodeError, LeafPermutation, Topology};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalent {
    pub v: Vec<usize>,
    /// `old -> new` leaf identifiers; apply it to the taxa mapping alongside `v`.
    pub permutation: LeafPermutation,
}

/// Identity, every transposition `(0 x)`, then the reversal.
fn addition_orders(leaves: usize) -> Vec<LeafPermutation> {
    let mut orders = Vec::with_capacity(leaves + 1);
    orders.push(LeafPermutation::identity(leaves));
    for x in 1..leaves {
        orders.push(LeafPermutation::transposition(leaves, 0, x));
    }
    orders.push(LeafPermutation::reversal(leaves));
    orders
}

fn encodings(tree: &Topology, permutation: &LeafPermutation, rooted: bool) -> Vec<Vec<usize>> {
    let relabeled = tree.relabel(permutation);
    if rooted {
        vec![vector::encode_topology(&relabeled)]
    } else {
        relabeled
            .rootings()
            .iter()
            .map(vector::encode_topology)
            .collect()
    }
}

/// Every distinct vector, other than `v` itself, that encodes the tree of `v` under one of
/// the enumerated addition orders (and, if `rooted` is false, any rooting).
pub fn equivalents(v: &[usize], rooted: bool) -> Result<Vec<Equivalent>, DecodeError> {
    let tree = vector::decode(v)?;
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    seen.insert(v.to_vec());

    let mut out = Vec::new();
    for permutation in addition_orders(tree.leaf_count()) {
        for encoded in encodings(&tree, &permutation, rooted) {
            if seen.insert(encoded.clone()) {
                out.push(Equivalent {
                    v: encoded,
                    permutation: permutation.clone(),
                });
            }
        }
    }
    Ok(out)
}

/// Draws one equivalent at random.
///
/// An order (and a rooting, when unrooted) is drawn uniformly. If that draw reproduces `v`,
/// the pick falls back to a uniform choice from [`equivalents`]. `None` means `v` has no
/// alternative encoding.
pub fn sample_equivalent(
    v: &[usize],
    rooted: bool,
    rng: &mut fastrand::Rng,
) -> Result<Option<Equivalent>, DecodeError> {
    let tree = vector::decode(v)?;
    let orders = addition_orders(tree.leaf_count());
    let permutation = orders[rng.usize(..orders.len())].clone();

    let relabeled = tree.relabel(&permutation);
    let candidate = if rooted {
        Some(relabeled)
    } else {
        relabeled.rooting(rng.usize(..relabeled.rooting_count()))
    };

    if let Some(candidate) = candidate {
        let encoded = vector::encode_topology(&candidate);
        if encoded != v {
            return Ok(Some(Equivalent {
                v: encoded,
                permutation,
            }));
        }
    }

    let mut all = equivalents(v, rooted)?;
    if all.is_empty() {
        return Ok(None);
    }
    let pick = rng.usize(..all.len());
    Ok(Some(all.swap_remove(pick)))
}
