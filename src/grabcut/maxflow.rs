//! Minimum s-t cut over a sparse pixel graph.
//!
//! The solver grows two search trees, one from the source terminal and one
//! from the sink terminal, augments along the path found where they touch,
//! and re-attaches orphaned nodes to restore the trees (Boykov-Kolmogorov).
//! Grid graphs from images reuse most of the trees between augmentations,
//! which keeps the run time close to linear in the pixel count.
//!
//! Visiting order is fixed: active nodes are processed first-in first-out,
//! seeded in node-index order, and each node's edges are scanned from the
//! most recently added one backwards. Identical graphs therefore always
//! produce identical partitions.

use std::collections::VecDeque;

use crate::error::{GrabCutError, GrabCutResult};

/// Sentinel for "no edge" in the intrusive adjacency lists.
const NIL: usize = usize::MAX;

/// Side of the cut a node ends up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Source terminal side, meaning foreground
    Source,
    /// Sink terminal side, meaning background
    Sink,
}

impl Side {
    /// 0 for the source tree, 1 for the sink tree.
    ///
    /// XOR-ing an edge index with this selects the edge that carries flow
    /// away from the tree root, since edge pairs `2k` and `2k + 1` are
    /// reverses of each other.
    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Source => 0,
            Self::Sink => 1,
        }
    }
}

/// Result of a cut: one side per node, plus the value of the maximum flow
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    sides: Vec<Side>,
    flow: f64,
}

impl Partition {
    /// Builds a partition from explicit sides, with zero flow.
    pub fn from_sides(sides: Vec<Side>) -> Self {
        Self { sides, flow: 0.0 }
    }

    /// Number of nodes covered
    #[inline]
    pub fn len(&self) -> usize {
        self.sides.len()
    }

    /// Whether the partition covers no nodes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    /// Side of `node`
    #[inline]
    pub fn side(&self, node: usize) -> Side {
        self.sides[node]
    }

    /// Sides in node order
    pub fn sides(&self) -> impl Iterator<Item = Side> + '_ {
        self.sides.iter().copied()
    }

    /// Value of the maximum flow, equal to the cut cost up to the constant
    /// shared by both terminal weights of each node.
    #[inline]
    pub fn flow(&self) -> f64 {
        self.flow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    /// Not part of either search tree
    Free,
    /// Attached directly to its terminal
    Terminal,
    /// Lost its parent during the last augmentation
    Orphan,
    /// Edge from this node to its parent
    Edge(usize),
}

#[derive(Debug, Clone)]
struct Node {
    first: usize,
    parent: Parent,
    tree: Side,
    timestamp: usize,
    dist: usize,
    /// Residual terminal capacity: positive towards the source, negative towards the sink
    weight: f64,
}

#[derive(Debug, Clone)]
struct Edge {
    dst: usize,
    next: usize,
    weight: f64,
}

/// Capacitated graph with two implicit terminals
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    flow: f64,
}

impl FlowGraph {
    /// Creates an empty graph with room for `nodes` nodes and `edges` undirected edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(2 * edges),
            flow: 0.0,
        }
    }

    /// Appends a node with no terminal weight and returns its index.
    pub fn add_node(&mut self) -> usize {
        self.nodes.push(Node {
            first: NIL,
            parent: Parent::Free,
            tree: Side::Source,
            timestamp: 0,
            dist: 0,
            weight: 0.0,
        });
        self.nodes.len() - 1
    }

    /// Number of nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Adds capacities from the source to `node` and from `node` to the sink.
    ///
    /// Only the difference of the two capacities affects the cut, so the
    /// smaller one is pushed straight into the flow value and the node keeps
    /// the remainder. Negative inputs are therefore allowed.
    pub fn add_terminal_weights(
        &mut self,
        node: usize,
        source: f64,
        sink: f64,
    ) -> GrabCutResult<()> {
        let count = self.nodes.len();
        let vertex = self.nodes.get_mut(node).ok_or_else(|| {
            GrabCutError::InternalFault(format!(
                "terminal edge references node {node} of a {count}-node graph"
            ))
        })?;

        let (mut source, mut sink) = (source, sink);
        if vertex.weight > 0.0 {
            source += vertex.weight;
        } else {
            sink -= vertex.weight;
        }
        self.flow += source.min(sink);
        vertex.weight = source - sink;
        Ok(())
    }

    /// Adds an edge `i -> j` with capacity `weight` and `j -> i` with `reverse_weight`.
    pub fn add_edge(
        &mut self,
        i: usize,
        j: usize,
        weight: f64,
        reverse_weight: f64,
    ) -> GrabCutResult<()> {
        let count = self.nodes.len();
        if i >= count || j >= count || i == j {
            return Err(GrabCutError::InternalFault(format!(
                "edge ({i}, {j}) is invalid in a {count}-node graph"
            )));
        }
        if weight < 0.0 || reverse_weight < 0.0 {
            return Err(GrabCutError::InternalFault(format!(
                "edge ({i}, {j}) has negative capacity ({weight}, {reverse_weight})"
            )));
        }

        let forward = self.edges.len();
        self.edges.push(Edge {
            dst: j,
            next: self.nodes[i].first,
            weight,
        });
        self.nodes[i].first = forward;

        self.edges.push(Edge {
            dst: i,
            next: self.nodes[j].first,
            weight: reverse_weight,
        });
        self.nodes[j].first = forward + 1;
        Ok(())
    }

    /// Computes the maximum flow and returns the corresponding minimum cut.
    ///
    /// Nodes left outside both search trees at the end can be placed on
    /// either side without changing the cut cost; they go to the source side.
    pub fn solve(mut self) -> Partition {
        let mut active = VecDeque::with_capacity(self.nodes.len());
        let mut queued = vec![false; self.nodes.len()];
        let mut orphans = Vec::new();
        let mut current_ts = 0usize;

        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.timestamp = 0;
            if node.weight != 0.0 {
                node.parent = Parent::Terminal;
                node.tree = if node.weight < 0.0 { Side::Sink } else { Side::Source };
                node.dist = 1;
                active.push_back(index);
                queued[index] = true;
            } else {
                node.parent = Parent::Free;
            }
        }

        loop {
            let Some(bridge) = self.grow(&mut active, &mut queued) else {
                break;
            };
            self.augment(bridge, &mut orphans);
            current_ts += 1;
            self.adopt(&mut orphans, &mut active, &mut queued, current_ts);
        }

        let sides = self
            .nodes
            .iter()
            .map(|node| match (node.parent, node.tree) {
                (Parent::Free, _) => Side::Source,
                (_, tree) => tree,
            })
            .collect();

        Partition {
            sides,
            flow: self.flow,
        }
    }

    /// Grows both trees until an edge from the source tree into the sink
    /// tree is found, returning that edge.
    fn grow(&mut self, active: &mut VecDeque<usize>, queued: &mut [bool]) -> Option<usize> {
        while let Some(&v) = active.front() {
            if self.nodes[v].parent != Parent::Free {
                let tree = self.nodes[v].tree;
                let vt = tree.index();
                let mut ei = self.nodes[v].first;
                while ei != NIL {
                    let next = self.edges[ei].next;
                    if self.edges[ei ^ vt].weight <= 0.0 {
                        ei = next;
                        continue;
                    }
                    let u = self.edges[ei].dst;
                    let (v_ts, v_dist) = (self.nodes[v].timestamp, self.nodes[v].dist);
                    let neighbor = &mut self.nodes[u];

                    if neighbor.parent == Parent::Free {
                        neighbor.tree = tree;
                        neighbor.parent = Parent::Edge(ei ^ 1);
                        neighbor.timestamp = v_ts;
                        neighbor.dist = v_dist + 1;
                        if !queued[u] {
                            queued[u] = true;
                            active.push_back(u);
                        }
                    } else if neighbor.tree != tree {
                        return Some(ei ^ vt);
                    } else if neighbor.dist > v_dist + 1 && neighbor.timestamp <= v_ts {
                        neighbor.parent = Parent::Edge(ei ^ 1);
                        neighbor.timestamp = v_ts;
                        neighbor.dist = v_dist + 1;
                    }
                    ei = next;
                }
            }
            active.pop_front();
            queued[v] = false;
        }
        None
    }

    /// Walks from the bridge edge to the root of the tree selected by `k`
    /// (1 for the source tree, 0 for the sink tree), returning the root.
    fn tree_root(&self, bridge: usize, k: usize, mut visit: impl FnMut(usize)) -> usize {
        let mut v = self.edges[bridge ^ k].dst;
        while let Parent::Edge(ei) = self.nodes[v].parent {
            visit(ei);
            v = self.edges[ei].dst;
        }
        v
    }

    fn augment(&mut self, bridge: usize, orphans: &mut Vec<usize>) {
        let mut bottleneck = self.edges[bridge].weight;
        for k in [1, 0] {
            let edges = &self.edges;
            let root = self.tree_root(bridge, k, |ei| {
                bottleneck = bottleneck.min(edges[ei ^ k].weight);
            });
            bottleneck = bottleneck.min(self.nodes[root].weight.abs());
        }

        self.edges[bridge].weight -= bottleneck;
        self.edges[bridge ^ 1].weight += bottleneck;
        self.flow += bottleneck;

        for k in [1, 0] {
            let mut v = self.edges[bridge ^ k].dst;
            while let Parent::Edge(ei) = self.nodes[v].parent {
                self.edges[ei ^ (k ^ 1)].weight += bottleneck;
                self.edges[ei ^ k].weight -= bottleneck;
                if self.edges[ei ^ k].weight <= 0.0 {
                    orphans.push(v);
                    self.nodes[v].parent = Parent::Orphan;
                }
                v = self.edges[ei].dst;
            }

            let root = &mut self.nodes[v];
            if k == 1 {
                root.weight -= bottleneck;
            } else {
                root.weight += bottleneck;
            }
            if root.weight == 0.0 {
                orphans.push(v);
                root.parent = Parent::Orphan;
            }
        }
    }

    /// Distance from `u` to its tree root, caching distances along the way,
    /// or `None` when the chain ends at an orphan.
    fn distance_to_root(&mut self, start: usize, current_ts: usize) -> Option<usize> {
        let mut u = start;
        let mut d = 0usize;
        loop {
            if self.nodes[u].timestamp == current_ts {
                d += self.nodes[u].dist;
                break;
            }
            d += 1;
            match self.nodes[u].parent {
                Parent::Terminal => {
                    self.nodes[u].timestamp = current_ts;
                    self.nodes[u].dist = 1;
                    break;
                }
                Parent::Edge(ej) => u = self.edges[ej].dst,
                Parent::Orphan | Parent::Free => return None,
            }
        }

        let mut d = d;
        let mut u = start;
        while self.nodes[u].timestamp != current_ts {
            self.nodes[u].timestamp = current_ts;
            self.nodes[u].dist = d;
            d -= 1;
            match self.nodes[u].parent {
                Parent::Edge(ej) => u = self.edges[ej].dst,
                _ => break,
            }
        }
        Some(self.nodes[start].dist)
    }

    fn adopt(
        &mut self,
        orphans: &mut Vec<usize>,
        active: &mut VecDeque<usize>,
        queued: &mut [bool],
        current_ts: usize,
    ) {
        while let Some(v) = orphans.pop() {
            let tree = self.nodes[v].tree;
            let toward = tree.index() ^ 1;
            let mut best: Option<(usize, usize)> = None;

            let mut ei = self.nodes[v].first;
            while ei != NIL {
                let next = self.edges[ei].next;
                let u = self.edges[ei].dst;
                if self.edges[ei ^ toward].weight > 0.0
                    && self.nodes[u].tree == tree
                    && self.nodes[u].parent != Parent::Free
                {
                    if let Some(dist) = self.distance_to_root(u, current_ts) {
                        let d = dist + 1;
                        if best.map_or(true, |(_, min_dist)| d < min_dist) {
                            best = Some((ei, d));
                        }
                    }
                }
                ei = next;
            }

            if let Some((edge, dist)) = best {
                let node = &mut self.nodes[v];
                node.parent = Parent::Edge(edge);
                node.timestamp = current_ts;
                node.dist = dist;
                continue;
            }

            self.nodes[v].parent = Parent::Free;
            self.nodes[v].timestamp = 0;

            let mut ei = self.nodes[v].first;
            while ei != NIL {
                let next = self.edges[ei].next;
                let u = self.edges[ei].dst;
                let parent = self.nodes[u].parent;
                if self.nodes[u].tree == tree && parent != Parent::Free {
                    if self.edges[ei ^ toward].weight > 0.0 && !queued[u] {
                        queued[u] = true;
                        active.push_back(u);
                    }
                    if let Parent::Edge(ej) = parent {
                        if self.edges[ej].dst == v {
                            orphans.push(u);
                            self.nodes[u].parent = Parent::Orphan;
                        }
                    }
                }
                ei = next;
            }
        }
    }
}
