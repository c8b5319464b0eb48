//! 4-approximation token-swap search (Miltzow et al.).

use std::collections::VecDeque;

use crate::error::{ArchError, ArchResult};
use crate::graph::Graph;
use crate::mapping::{InverseMap, UNDEF};
use crate::token_swap::{Swap, SwapSeq, TokenSwapFinder};

// DFS colors. Silver marks vertices already on the explicit stack.
const WHITE: u8 = 0;
const SILVER: u8 = 1;
const GRAY: u8 = 2;
const BLACK: u8 = 3;

/// Approximate token-swap finder with a 4x bound on the optimal swap
/// count for total assignments.
///
/// Preprocessing computes, for every ordered pair `(u, w)`, the "good
/// neighbours" of `u` toward `w`: the neighbours of `u` lying on some
/// shortest `u → w` path. Each round either rotates tokens along a
/// directed cycle of the good-neighbour graph or performs one "unhappy"
/// swap into an in-place vertex. `UNDEF` entries are wildcards.
#[derive(Debug, Default)]
pub struct ApproxSwapFinder {
    n: u32,
    /// `matrix[u][w]` lists the good neighbours of `u` toward `w`.
    matrix: Vec<Vec<Vec<u32>>>,
}

impl ApproxSwapFinder {
    /// Create an unbound finder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenSwapFinder for ApproxSwapFinder {
    fn set_graph(&mut self, g: &Graph) -> ArchResult<()> {
        self.n = g.size();
        self.matrix = (0..self.n).map(|u| good_vertices_bfs(g, u)).collect();
        Ok(())
    }

    fn find(&mut self, from: &InverseMap, to: &InverseMap) -> ArchResult<SwapSeq> {
        let n = self.n as usize;
        if from.len() != n || to.len() != n {
            return Err(ArchError::AssignmentSizeMismatch {
                got: from.len().max(to.len()),
                expected: n,
            });
        }

        let mut from_inv = from.clone();
        let to_inv = to.clone();

        // Destination of each token; UNDEF if the token may rest anywhere.
        let mut to_map = vec![UNDEF; n];
        for (i, &t) in to_inv.iter().enumerate() {
            if t != UNDEF {
                to_map[t as usize] = i as u32;
            }
        }

        let mut inplace = vec![false; n];
        let mut gprime: Vec<Vec<u32>> = vec![vec![]; n];
        for i in 0..n {
            let token = from_inv[i];
            if token == UNDEF || to_map[token as usize] == UNDEF {
                inplace[i] = true;
            } else {
                inplace[i] = from_inv[i] == to_inv[i];
                gprime[i] = self.matrix[i][to_map[token as usize] as usize].clone();
            }
        }

        let mut swapseq = SwapSeq::new();

        loop {
            // 1. Look for a happy chain: a directed cycle in gprime.
            let mut swappath: Vec<u32> = vec![];
            for i in 0..n as u32 {
                if !inplace[i as usize] {
                    swappath = find_cycle_dfs(i, &gprime);
                    if !swappath.is_empty() {
                        break;
                    }
                }
            }

            // 2. Otherwise an unhappy swap: an out-of-place vertex pointing
            //    at an in-place one.
            if swappath.is_empty() {
                'outer: for u in 0..n {
                    if inplace[u] {
                        continue;
                    }
                    for &v in &gprime[u] {
                        if inplace[v as usize] {
                            swappath = vec![u as u32, v];
                            break 'outer;
                        }
                    }
                }
            }

            if swappath.is_empty() {
                break;
            }

            // 3. Swap along what we found.
            for w in swappath.windows(2) {
                let (u, v) = (w[0], w[1]);
                swapseq.push(Swap { u, v });
                from_inv.swap(u as usize, v as usize);
            }

            // Only swapped vertices change their mind about where to go.
            for &u in &swappath {
                let u = u as usize;
                let token = from_inv[u];
                if token == UNDEF || to_map[token as usize] == UNDEF {
                    inplace[u] = true;
                    gprime[u].clear();
                    continue;
                }
                inplace[u] = from_inv[u] == to_inv[u];
                gprime[u] = self.matrix[u][to_map[token as usize] as usize].clone();
            }
        }

        Ok(swapseq)
    }
}

/// Iterative DFS cycle search in the good-neighbour graph. Returns the
/// cycle's vertices (empty when acyclic).
fn find_cycle_dfs(src: u32, adj: &[Vec<u32>]) -> Vec<u32> {
    let n = adj.len();
    let mut color = vec![WHITE; n];
    let mut parent = vec![UNDEF; n];
    let mut stack = vec![src];
    color[src as usize] = SILVER;

    let mut cycle_edge: Option<(u32, u32)> = None;

    'dfs: while let Some(&u) = stack.last() {
        if color[u as usize] == GRAY {
            color[u as usize] = BLACK;
            stack.pop();
            continue;
        }
        color[u as usize] = GRAY;

        for &v in &adj[u as usize] {
            match color[v as usize] {
                WHITE => {
                    parent[v as usize] = u;
                    color[v as usize] = SILVER;
                    stack.push(v);
                }
                GRAY => {
                    cycle_edge = Some((u, v));
                    break 'dfs;
                }
                _ => {}
            }
        }
    }

    let Some((mut from, to)) = cycle_edge else {
        return vec![];
    };

    let mut cycle = vec![from];
    while from != to {
        from = parent[from as usize];
        cycle.push(from);
    }
    cycle
}

/// For each target vertex `w`, the neighbours of `src` lying on some
/// shortest path from `src` to `w`.
fn good_vertices_bfs(g: &Graph, src: u32) -> Vec<Vec<u32>> {
    let n = g.size() as usize;
    let mut good = vec![vec![false; n]; n];
    let mut dist = vec![UNDEF; n];
    let mut queue = VecDeque::new();

    dist[src as usize] = 0;
    queue.push_back(src);

    while let Some(u) = queue.pop_front() {
        for v in g.adj(u) {
            if dist[v as usize] == UNDEF {
                dist[v as usize] = dist[u as usize] + 1;
                queue.push_back(v);
            }

            if dist[v as usize] == dist[u as usize] + 1 {
                // v is on a shortest path through u: v inherits u's good
                // vertices, and is a good vertex of itself.
                good[v as usize][v as usize] = true;
                let (gu, gv) = if u < v {
                    let (a, b) = good.split_at_mut(v as usize);
                    (&a[u as usize], &mut b[0])
                } else {
                    let (a, b) = good.split_at_mut(u as usize);
                    (&b[0], &mut a[v as usize])
                };
                for i in 0..n {
                    gv[i] |= gu[i];
                }
            }
        }
    }

    let first_steps: Vec<u32> = g.adj(src).collect();
    (0..n)
        .map(|w| {
            first_steps
                .iter()
                .copied()
                .filter(|&v| good[w][v as usize])
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;
    use crate::token_swap::apply_swaps;

    fn line(n: u32) -> Graph {
        let mut g = Graph::new(n, GraphKind::Undirected);
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g
    }

    #[test]
    fn test_good_vertices_on_line() {
        let g = line(4);
        let good = good_vertices_bfs(&g, 0);
        // Toward vertex 3 the only useful first step from 0 is 1.
        assert_eq!(good[3], vec![1]);
        // Toward 0 itself there is nothing to do.
        assert!(good[0].is_empty());
    }

    #[test]
    fn test_cycle_dfs_finds_two_cycle() {
        let adj = vec![vec![1], vec![0]];
        let cycle = find_cycle_dfs(0, &adj);
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn test_identity_is_empty() {
        let g = line(5);
        let mut finder = ApproxSwapFinder::new();
        finder.set_graph(&g).unwrap();
        let id: Vec<u32> = (0..5).collect();
        assert!(finder.find(&id, &id).unwrap().is_empty());
    }

    #[test]
    fn test_line_reversal() {
        let g = line(5);
        let mut finder = ApproxSwapFinder::new();
        finder.set_graph(&g).unwrap();
        let from: Vec<u32> = (0..5).collect();
        let to: Vec<u32> = (0..5).rev().collect();
        let swaps = finder.find(&from, &to).unwrap();
        assert_eq!(apply_swaps(&from, &swaps), to);
    }

    #[test]
    fn test_sixteen_qubit_relocation_terminates() {
        // Tokens parked in the first 8 slots must move to the last 8 in
        // reversed order; the rest are wildcards.
        let g = line(16);
        let mut finder = ApproxSwapFinder::new();
        finder.set_graph(&g).unwrap();

        let tokens = [0u32, 15, 1, 14, 13, 3, 12, 4];
        let mut from = vec![UNDEF; 16];
        let mut to = vec![UNDEF; 16];
        for (i, &t) in tokens.iter().enumerate() {
            from[i] = t;
            to[15 - i] = t;
        }

        let swaps = finder.find(&from, &to).unwrap();
        let result = apply_swaps(&from, &swaps);
        for (i, &t) in to.iter().enumerate() {
            if t != UNDEF {
                assert_eq!(result[i], t, "token mismatch at slot {i}");
            }
        }
    }
}
