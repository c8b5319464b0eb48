//! Shortest-path distances between physical qubits.

use std::collections::VecDeque;

use crate::graph::Graph;
use crate::mapping::UNDEF;

/// BFS distances under the undirected closure of a graph, memoised one
/// source row at a time.
///
/// Unreachable pairs report [`UNDEF`] (`u32::MAX`). Rows are deterministic
/// given the adjacency insertion order.
#[derive(Debug, Default)]
pub struct BfsDistance {
    rows: Vec<Option<Vec<u32>>>,
}

impl BfsDistance {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance from `u` to `v` in `g`.
    ///
    /// The first query from a source runs a full BFS and memoises the row.
    pub fn get(&mut self, g: &Graph, u: u32, v: u32) -> u32 {
        let n = g.size() as usize;
        if self.rows.len() != n {
            self.rows = vec![None; n];
        }

        let row = self.rows[u as usize].get_or_insert_with(|| Self::bfs(g, u));
        row[v as usize]
    }

    /// The whole distance row from `u`.
    pub fn row(&mut self, g: &Graph, u: u32) -> &[u32] {
        self.get(g, u, u);
        self.rows[u as usize].as_deref().expect("row just computed")
    }

    fn bfs(g: &Graph, src: u32) -> Vec<u32> {
        let mut dist = vec![UNDEF; g.size() as usize];
        let mut queue = VecDeque::new();

        dist[src as usize] = 0;
        queue.push_back(src);

        while let Some(u) = queue.pop_front() {
            for v in g.adj(u) {
                if dist[v as usize] == UNDEF {
                    dist[v as usize] = dist[u as usize] + 1;
                    queue.push_back(v);
                }
            }
        }

        dist
    }
}

/// A BFS shortest path between two vertices, endpoints included.
///
/// Returns an empty path when `to` is unreachable from `from`.
pub fn bfs_path(g: &Graph, from: u32, to: u32) -> Vec<u32> {
    if from == to {
        return vec![from];
    }

    let mut parent = vec![UNDEF; g.size() as usize];
    let mut queue = VecDeque::new();
    parent[from as usize] = from;
    queue.push_back(from);

    while let Some(u) = queue.pop_front() {
        for v in g.adj(u) {
            if parent[v as usize] != UNDEF {
                continue;
            }
            parent[v as usize] = u;
            if v == to {
                let mut path = vec![to];
                let mut cur = to;
                while cur != from {
                    cur = parent[cur as usize];
                    path.push(cur);
                }
                path.reverse();
                return path;
            }
            queue.push_back(v);
        }
    }

    vec![]
}
