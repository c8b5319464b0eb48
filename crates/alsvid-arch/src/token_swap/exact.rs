//! Exact token-swap search over the permutation Cayley graph.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::error::{ArchError, ArchResult};
use crate::graph::Graph;
use crate::mapping::{InverseMap, UNDEF};
use crate::token_swap::{Swap, SwapSeq, TokenSwapFinder};

/// Optimal token-swap finder.
///
/// Preprocessing runs one BFS over the Cayley graph of all `n!`
/// permutations of the vertices, where each edge is a swap along a graph
/// edge; a query is then a table lookup. Only usable while `n! ≤ 10^6`
/// (`n ≤ 9`); larger graphs are rejected by [`TokenSwapFinder::set_graph`].
#[derive(Debug, Default)]
pub struct ExactSwapFinder {
    n: u32,
    perms: Vec<Vec<u32>>,
    ids: FxHashMap<Vec<u32>, u32>,
    swaps: Vec<SwapSeq>,
}

/// Upper bound on the permutation-space size the exact finder accepts.
const MAX_PERMUTATIONS: u64 = 1_000_000;

impl ExactSwapFinder {
    /// Create an unbound finder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All permutations of `0..n`, in the preprocessing order.
    ///
    /// Exposed for the exact dynamic-programming allocator, which walks
    /// the same permutation space.
    pub fn permutations(&self) -> &[Vec<u32>] {
        &self.perms
    }

    fn preprocess(&mut self, g: &Graph) {
        let n = self.n as usize;

        self.perms.clear();
        self.ids.clear();
        let mut perm: Vec<u32> = (0..self.n).collect();
        loop {
            self.ids.insert(perm.clone(), self.perms.len() as u32);
            self.perms.push(perm.clone());
            if !next_permutation(&mut perm) {
                break;
            }
        }

        tracing::debug!(
            permutations = self.perms.len(),
            "preprocessing exact token-swap table"
        );

        // BFS from the identity records the shortest swap word reaching
        // every permutation.
        self.swaps = vec![SwapSeq::new(); self.perms.len()];
        let mut inserted = vec![false; self.perms.len()];
        let mut queue = VecDeque::new();

        inserted[0] = true;
        queue.push_back(0u32);

        while let Some(id) = queue.pop_front() {
            let cur = self.perms[id as usize].clone();

            for u in 0..n as u32 {
                for v in g.adj(u) {
                    let mut next = cur.clone();
                    next.swap(u as usize, v as usize);

                    let next_id = self.ids[&next];
                    if !inserted[next_id as usize] {
                        inserted[next_id as usize] = true;
                        let mut word = self.swaps[id as usize].clone();
                        word.push(Swap { u, v });
                        self.swaps[next_id as usize] = word;
                        queue.push_back(next_id);
                    }
                }
            }
        }
    }

    fn target_id(&self, source: &[u32], target: &[u32]) -> u32 {
        let n = source.len();

        // Canonicalise: relabel tokens so the source becomes the identity.
        let mut translator = vec![0u32; n];
        for (i, &t) in source.iter().enumerate() {
            translator[t as usize] = i as u32;
        }
        let real_target: Vec<u32> = target.iter().map(|&t| translator[t as usize]).collect();

        self.ids[&real_target]
    }
}

impl TokenSwapFinder for ExactSwapFinder {
    fn set_graph(&mut self, g: &Graph) -> ArchResult<()> {
        let n = g.size();
        if factorial(n) > MAX_PERMUTATIONS {
            return Err(ArchError::PermutationSpaceTooLarge { qubits: n });
        }
        self.n = n;
        self.preprocess(g);
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

        let (from, to) = complete_wildcards(from, to);
        Ok(self.swaps[self.target_id(&from, &to) as usize].clone())
    }
}

fn factorial(n: u32) -> u64 {
    (1..=n as u64).try_fold(1u64, u64::checked_mul).unwrap_or(u64::MAX)
}

/// Lexicographic next permutation; false once the sequence wrapped.
fn next_permutation(perm: &mut [u32]) -> bool {
    if perm.len() < 2 {
        return false;
    }

    let mut i = perm.len() - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }

    let mut j = perm.len() - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}

/// Complete wildcard entries so both assignments are total permutations.
///
/// `from` wildcards take the unused tokens in increasing order; `to`
/// wildcards prefer the token `from` already holds at that slot (so
/// untouched positions stay untouched), then the remaining tokens in
/// increasing order.
fn complete_wildcards(from: &InverseMap, to: &InverseMap) -> (Vec<u32>, Vec<u32>) {
    let n = from.len();

    let mut from = from.clone();
    let mut used = vec![false; n];
    for &t in from.iter().filter(|&&t| t != UNDEF) {
        used[t as usize] = true;
    }
    let mut next = 0usize;
    for slot in from.iter_mut().filter(|s| **s == UNDEF) {
        while used[next] {
            next += 1;
        }
        used[next] = true;
        *slot = next as u32;
    }

    let mut to = to.clone();
    let mut used = vec![false; n];
    for &t in to.iter().filter(|&&t| t != UNDEF) {
        used[t as usize] = true;
    }
    for i in 0..n {
        if to[i] == UNDEF && !used[from[i] as usize] {
            to[i] = from[i];
            used[from[i] as usize] = true;
        }
    }
    let mut next = 0usize;
    for slot in to.iter_mut().filter(|s| **s == UNDEF) {
        while used[next] {
            next += 1;
        }
        used[next] = true;
        *slot = next as u32;
    }

    (from, to)
}
