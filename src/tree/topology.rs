use super::newick::{self, RawTree};
use super::{LeafPermutation, ParseError, TaxaMap};
use std::collections::BTreeSet;
use std::fmt::Write;

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    leaf: Option<usize>,
}

impl Node {
    fn leaf(id: usize, parent: Option<usize>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            leaf: Some(id),
        }
    }

    fn internal(parent: Option<usize>, children: Vec<usize>) -> Self {
        Self {
            parent,
            children,
            leaf: None,
        }
    }
}

/// A binary tree over leaves `0..n`, stored as an arena.
///
/// The tree is always rooted in memory. Whether the root carries meaning is decided by
/// the caller at notation time (`to_newick`) and comparison time (`same_as`).
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    root: usize,
    /// leaf id -> node index
    leaf_nodes: Vec<usize>,
}

impl Topology {
    /// The one-leaf tree that sequential addition starts from.
    pub(crate) fn seed() -> Self {
        Self {
            nodes: vec![Node::leaf(0, None)],
            root: 0,
            leaf_nodes: vec![0],
        }
    }

    /// Parses notation whose leaves are integer identifiers `0..n`.
    pub fn from_newick(notation: &str) -> Result<Self, ParseError> {
        let raw = newick::parse(notation)?;
        Self::from_raw(raw, |label| label.parse::<usize>().ok())
    }

    /// Parses notation whose leaves are taxon names, resolved through `taxa`.
    pub fn from_named_newick(notation: &str, taxa: &TaxaMap) -> Result<Self, ParseError> {
        let raw = newick::parse(notation)?;
        Self::from_raw(raw, |label| taxa.id_of(label))
    }

    fn from_raw<F>(raw: RawTree, resolve: F) -> Result<Self, ParseError>
    where
        F: Fn(&str) -> Option<usize>,
    {
        let leaf_count = raw.nodes.iter().filter(|n| n.children.is_empty()).count();
        if leaf_count < 2 {
            return Err(ParseError::TooFewLeaves);
        }

        let mut nodes = Vec::with_capacity(raw.nodes.len() + 1);
        let mut leaf_nodes = vec![usize::MAX; leaf_count];

        for (idx, raw_node) in raw.nodes.iter().enumerate() {
            if raw_node.children.is_empty() {
                let label = raw_node.label.clone().unwrap_or_default();
                let id = resolve(&label).ok_or(ParseError::UnknownLeaf { label })?;
                if id >= leaf_count {
                    return Err(ParseError::LeafOutOfRange {
                        id,
                        leaves: leaf_count,
                    });
                }
                if leaf_nodes[id] != usize::MAX {
                    return Err(ParseError::DuplicateLeaf(id));
                }
                leaf_nodes[id] = idx;
                nodes.push(Node::leaf(id, raw_node.parent));
            } else {
                let arity = raw_node.children.len();
                let trifurcating_root = idx == raw.root && arity == 3;
                if arity != 2 && !trifurcating_root {
                    return Err(ParseError::NotBinary { children: arity });
                }
                nodes.push(Node::internal(raw_node.parent, raw_node.children.clone()));
            }
        }

        let mut tree = Self {
            nodes,
            root: raw.root,
            leaf_nodes,
        };

        // An unrooted notation lists three subtrees at the top; root it above the third.
        if tree.nodes[tree.root].children.len() == 3 {
            let root = tree.root;
            let third = tree.nodes[root].children[2];
            let pair = vec![
                tree.nodes[root].children[0],
                tree.nodes[root].children[1],
            ];
            let joint = tree.push(Node::internal(Some(root), pair.clone()));
            for child in pair {
                tree.nodes[child].parent = Some(joint);
            }
            tree.nodes[root].children = vec![joint, third];
        }

        Ok(tree)
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_nodes.len()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn leaf_node(&self, id: usize) -> usize {
        self.leaf_nodes[id]
    }

    /// Leaf identifier carried by `node`, or `None` for internal nodes.
    pub(crate) fn leaf_id(&self, node: usize) -> Option<usize> {
        self.nodes[node].leaf
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(p) => {
                for child in self.nodes[p].children.iter_mut() {
                    if *child == old {
                        *child = new;
                    }
                }
            }
            None => self.root = new,
        }
    }

    /// Grafts a new leaf onto the edge above `target`. Returns the new internal node,
    /// whose children are `target` and the new leaf, in that order.
    pub(crate) fn graft_above(&mut self, target: usize, id: usize) -> usize {
        debug_assert_eq!(self.leaf_nodes.len(), id, "leaves are added in order");
        let parent = self.nodes[target].parent;
        let joint = self.nodes.len();
        let leaf = joint + 1;
        self.nodes.push(Node::internal(parent, vec![target, leaf]));
        self.nodes.push(Node::leaf(id, Some(joint)));
        self.replace_child(parent, target, joint);
        self.nodes[target].parent = Some(joint);
        self.leaf_nodes.push(leaf);
        joint
    }

    /// Detaches leaf `id` and splices out its parent. Returns `(removed parent, sibling)`.
    /// The detached nodes stay in the arena, unreachable.
    pub(crate) fn prune_leaf(&mut self, id: usize) -> Option<(usize, usize)> {
        let leaf = self.leaf_nodes[id];
        let joint = self.nodes[leaf].parent?;
        let sibling = *self.nodes[joint].children.iter().find(|&&c| c != leaf)?;
        let grand = self.nodes[joint].parent;
        self.nodes[sibling].parent = grand;
        self.replace_child(grand, joint, sibling);
        self.nodes[leaf].parent = None;
        Some((joint, sibling))
    }

    /// Node indices in left-to-right preorder.
    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev());
        }
        order
    }

    /// Leaf identifiers in the order they appear in the rooted notation.
    pub fn leaf_order(&self) -> Vec<usize> {
        self.preorder()
            .into_iter()
            .filter_map(|n| self.nodes[n].leaf)
            .collect()
    }

    /// Renumbers leaves: leaf `old` becomes `permutation.apply(old)`.
    pub fn relabel(&self, permutation: &LeafPermutation) -> Topology {
        let mut out = self.clone();
        for (old, &node) in self.leaf_nodes.iter().enumerate() {
            let new = permutation.apply(old);
            out.nodes[node].leaf = Some(new);
            out.leaf_nodes[new] = node;
        }
        out
    }

    fn write_subtree(&self, start: usize, out: &mut String) {
        enum Step {
            Enter(usize),
            Text(&'static str),
        }
        let mut stack = vec![Step::Enter(start)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(text) => out.push_str(text),
                Step::Enter(node) => match self.nodes[node].leaf {
                    Some(id) => {
                        let _ = write!(out, "{}", id);
                    }
                    None => {
                        out.push('(');
                        stack.push(Step::Text(")"));
                        for (i, &child) in self.nodes[node].children.iter().enumerate().rev() {
                            stack.push(Step::Enter(child));
                            if i > 0 {
                                stack.push(Step::Text(","));
                            }
                        }
                    }
                },
            }
        }
    }

    /// Bracket notation with integer leaves and no branch lengths.
    ///
    /// Unrooted output folds the root into a trifurcation: `((0,1),2)` becomes `(0,1,2)`.
    pub fn to_newick(&self, rooted: bool) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 4);
        let top = &self.nodes[self.root].children;

        if rooted || top.len() != 2 {
            self.write_subtree(self.root, &mut out);
            out.push(';');
            return out;
        }

        let (a, b) = (top[0], top[1]);
        let parts: Vec<usize> = if self.nodes[a].leaf.is_none() {
            let mut p = self.nodes[a].children.clone();
            p.push(b);
            p
        } else if self.nodes[b].leaf.is_none() {
            let mut p = vec![a];
            p.extend(self.nodes[b].children.iter().copied());
            p
        } else {
            vec![a, b]
        };

        out.push('(');
        for (i, &part) in parts.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.write_subtree(part, &mut out);
        }
        out.push_str(");");
        out
    }

    /// Sorted leaf sets below every node, indexed by node.
    fn leaf_sets(&self) -> Vec<Vec<usize>> {
        let mut sets: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for node in self.preorder().into_iter().rev() {
            let mut set = match self.nodes[node].leaf {
                Some(id) => vec![id],
                None => self.nodes[node]
                    .children
                    .iter()
                    .flat_map(|&c| sets[c].iter().copied())
                    .collect(),
            };
            set.sort_unstable();
            sets[node] = set;
        }
        sets
    }

    /// Leaf sets of all internal nodes. Equal clusters mean equal rooted topologies.
    pub fn clusters(&self) -> BTreeSet<Vec<usize>> {
        let sets = self.leaf_sets();
        self.preorder()
            .into_iter()
            .filter(|&n| self.nodes[n].leaf.is_none())
            .map(|n| sets[n].clone())
            .collect()
    }

    /// Non-trivial bipartitions, each written as the side without leaf 0.
    /// Equal splits mean equal unrooted topologies.
    pub fn splits(&self) -> BTreeSet<Vec<usize>> {
        let n = self.leaf_count();
        let sets = self.leaf_sets();
        let mut out = BTreeSet::new();
        for node in self.preorder() {
            if node == self.root {
                continue;
            }
            let below = &sets[node];
            let side: Vec<usize> = if below.first() == Some(&0) {
                (0..n).filter(|id| below.binary_search(id).is_err()).collect()
            } else {
                below.clone()
            };
            if side.len() >= 2 && side.len() + 2 <= n {
                out.insert(side);
            }
        }
        out
    }

    /// Structural equality over the same leaf identifiers.
    pub fn same_as(&self, other: &Topology, rooted: bool) -> bool {
        if self.leaf_count() != other.leaf_count() {
            return false;
        }
        if rooted {
            self.clusters() == other.clusters()
        } else {
            self.splits() == other.splits()
        }
    }

    /// Undirected adjacency with the root suppressed, plus one entry per unrooted edge.
    fn unrooted(&self) -> (Vec<Vec<usize>>, Vec<(usize, usize)>) {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        let mut edges = Vec::new();
        let top = self.nodes[self.root].children.clone();

        for node in self.preorder() {
            if node == self.root {
                continue;
            }
            let Some(parent) = self.nodes[node].parent else {
                continue;
            };
            if parent == self.root {
                // The two root edges form one unrooted edge; keep it once.
                if node == top[0] {
                    adjacency[top[0]].push(top[1]);
                    adjacency[top[1]].push(top[0]);
                    edges.push((top[0], top[1]));
                }
                continue;
            }
            adjacency[node].push(parent);
            adjacency[parent].push(node);
            edges.push((node, parent));
        }
        (adjacency, edges)
    }

    /// Roots the unrooted tree on the edge `x - y`; the root's children are the `x` side
    /// and the `y` side, in that order.
    fn rooted_at(&self, adjacency: &[Vec<usize>], x: usize, y: usize) -> Topology {
        let mut out = Topology {
            nodes: Vec::with_capacity(self.nodes.len()),
            root: 0,
            leaf_nodes: vec![0; self.leaf_count()],
        };
        out.nodes.push(Node::internal(None, Vec::new()));

        // (old node, neighbour we came from, new parent)
        let mut stack = vec![(y, x, 0), (x, y, 0)];
        while let Some((old, from, parent)) = stack.pop() {
            let new = out.push(Node {
                parent: Some(parent),
                children: Vec::new(),
                leaf: self.nodes[old].leaf,
            });
            out.nodes[parent].children.push(new);
            if let Some(id) = self.nodes[old].leaf {
                out.leaf_nodes[id] = new;
                continue;
            }
            for &next in adjacency[old].iter().rev() {
                if next != from {
                    stack.push((next, old, new));
                }
            }
        }
        out
    }

    /// Number of distinct rootings: one per edge of the unrooted tree.
    pub fn rooting_count(&self) -> usize {
        2 * self.leaf_count() - 3
    }

    /// Every rooting of the underlying unrooted tree. The first one is `self`.
    pub fn rootings(&self) -> Vec<Topology> {
        let (adjacency, edges) = self.unrooted();
        edges
            .into_iter()
            .map(|(x, y)| self.rooted_at(&adjacency, x, y))
            .collect()
    }

    /// The `index`-th rooting, in the order of [`Topology::rootings`].
    pub fn rooting(&self, index: usize) -> Option<Topology> {
        let (adjacency, edges) = self.unrooted();
        edges
            .get(index)
            .map(|&(x, y)| self.rooted_at(&adjacency, x, y))
    }
}
