//! Coupling graphs with integer vertex ids.

use serde::{Deserialize, Serialize};

/// Whether edges were declared with or without a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphKind {
    /// Edges are one-way as declared.
    Directed,
    /// Declaring `(u, v)` also declares `(v, u)`.
    Undirected,
}

/// A coupling graph over vertices `0..n`.
///
/// Successor and predecessor lists keep insertion order; every iteration
/// over adjacency is deterministic given the construction order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    n: u32,
    kind: GraphKind,
    succ: Vec<Vec<u32>>,
    pred: Vec<Vec<u32>>,
}

impl Graph {
    /// Create a graph with `n` vertices and no edges.
    pub fn new(n: u32, kind: GraphKind) -> Self {
        Graph {
            n,
            kind,
            succ: vec![vec![]; n as usize],
            pred: vec![vec![]; n as usize],
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn size(&self) -> u32 {
        self.n
    }

    /// The declared kind.
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Add an edge `u → v`. For undirected graphs the reverse direction is
    /// added as well. Duplicates are ignored.
    pub fn add_edge(&mut self, u: u32, v: u32) {
        self.put_directed(u, v);
        if self.kind == GraphKind::Undirected {
            self.put_directed(v, u);
        }
    }

    fn put_directed(&mut self, u: u32, v: u32) {
        debug_assert!(u < self.n && v < self.n, "edge endpoint out of bounds");
        if self.succ[u as usize].contains(&v) {
            return;
        }
        self.succ[u as usize].push(v);
        self.pred[v as usize].push(u);
    }

    /// True if the edge `u → v` was declared (directly, or implied by an
    /// undirected declaration).
    #[inline]
    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.succ[u as usize].contains(&v)
    }

    /// True if either direction between `u` and `v` exists.
    #[inline]
    pub fn has_any_edge(&self, u: u32, v: u32) -> bool {
        self.has_edge(u, v) || self.has_edge(v, u)
    }

    /// True if only the reverse direction `v → u` was declared.
    #[inline]
    pub fn is_reverse(&self, u: u32, v: u32) -> bool {
        !self.has_edge(u, v) && self.has_edge(v, u)
    }

    /// Successors of `u`, in insertion order.
    pub fn succ(&self, u: u32) -> &[u32] {
        &self.succ[u as usize]
    }

    /// Predecessors of `u`, in insertion order.
    pub fn pred(&self, u: u32) -> &[u32] {
        &self.pred[u as usize]
    }

    /// Neighbours of `u` under the undirected closure: successors first,
    /// then predecessors that are not also successors.
    pub fn adj(&self, u: u32) -> impl Iterator<Item = u32> + '_ {
        let succ = &self.succ[u as usize];
        succ.iter().copied().chain(
            self.pred[u as usize]
                .iter()
                .copied()
                .filter(move |p| !succ.contains(p)),
        )
    }

    /// All declared edges `(u, v)`, vertex by vertex.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.succ
            .iter()
            .enumerate()
            .flat_map(|(u, vs)| vs.iter().map(move |&v| (u as u32, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directed_edges() {
        let mut g = Graph::new(3, GraphKind::Directed);
        g.add_edge(0, 1);
        g.add_edge(2, 1);

        assert!(g.has_edge(0, 1));
        assert!(!g.has_edge(1, 0));
        assert!(g.has_any_edge(1, 0));
        assert!(g.is_reverse(1, 2));
        assert!(!g.is_reverse(2, 1));
    }

    #[test]
    fn test_undirected_edges() {
        let mut g = Graph::new(3, GraphKind::Undirected);
        g.add_edge(0, 1);

        assert!(g.has_edge(0, 1));
        assert!(g.has_edge(1, 0));
        assert!(!g.is_reverse(0, 1));
    }

    #[test]
    fn test_adj_closure() {
        let mut g = Graph::new(4, GraphKind::Directed);
        g.add_edge(0, 1);
        g.add_edge(2, 0);
        g.add_edge(0, 3);

        let neighbors: Vec<u32> = g.adj(0).collect();
        assert_eq!(neighbors, vec![1, 3, 2]);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let mut g = Graph::new(2, GraphKind::Undirected);
        g.add_edge(0, 1);
        g.add_edge(1, 0);
        g.add_edge(0, 1);
        assert_eq!(g.succ(0), &[1]);
        assert_eq!(g.succ(1), &[0]);
    }
}
