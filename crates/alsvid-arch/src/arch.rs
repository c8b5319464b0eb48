//! Register-aware device graphs.

use rustc_hash::FxHashMap;
use serde::Deserialize;

use alsvid_ir::Arg;

use crate::error::{ArchError, ArchResult};
use crate::graph::{Graph, GraphKind};

/// A coupling graph together with the device's named registers and, per
/// physical qubit, the argument node that names it in rewritten programs.
///
/// The graph is immutable for the lifetime of a compilation and is shared
/// by reference across analyses.
#[derive(Debug, Clone)]
pub struct ArchGraph {
    graph: Graph,
    regs: Vec<(String, u32)>,
    nodes: Vec<Arg>,
    ids: FxHashMap<String, u32>,
}

impl ArchGraph {
    /// Build an architecture from named registers and string-id edges.
    ///
    /// Vertices are numbered register by register, index by index, in the
    /// order given. Edge endpoints use the `name[index]` form.
    pub fn from_parts(
        regs: Vec<(String, u32)>,
        edges: &[(String, String)],
        kind: GraphKind,
    ) -> ArchResult<Self> {
        let n: u32 = regs.iter().map(|(_, size)| size).sum();
        let mut nodes = Vec::with_capacity(n as usize);
        let mut ids = FxHashMap::default();

        for (name, size) in &regs {
            for i in 0..*size {
                let arg = Arg::idx(name.clone(), i);
                ids.insert(arg.to_string(), nodes.len() as u32);
                nodes.push(arg);
            }
        }

        let mut graph = Graph::new(n, kind);
        for (u, v) in edges {
            let u = *ids
                .get(u)
                .ok_or_else(|| ArchError::UnknownQubit(u.clone()))?;
            let v = *ids
                .get(v)
                .ok_or_else(|| ArchError::UnknownQubit(v.clone()))?;
            graph.add_edge(u, v);
        }

        Ok(ArchGraph {
            graph,
            regs,
            nodes,
            ids,
        })
    }

    /// Load an architecture from its JSON description.
    ///
    /// ```json
    /// {
    ///   "qubits": 2,
    ///   "registers": [{ "name": "q", "qubits": 2 }],
    ///   "adj": [[{ "v": "q[1]" }], []]
    /// }
    /// ```
    ///
    /// Edges are directed exactly as written.
    pub fn from_json(text: &str) -> ArchResult<Self> {
        #[derive(Deserialize)]
        struct RegDesc {
            name: String,
            qubits: u32,
        }

        #[derive(Deserialize)]
        struct AdjEntry {
            v: String,
        }

        #[derive(Deserialize)]
        struct ArchDesc {
            qubits: u32,
            registers: Vec<RegDesc>,
            adj: Vec<Vec<AdjEntry>>,
        }

        let desc: ArchDesc = serde_json::from_str(text)?;
        let regs: Vec<(String, u32)> = desc
            .registers
            .into_iter()
            .map(|r| (r.name, r.qubits))
            .collect();

        let declared: u32 = regs.iter().map(|(_, s)| s).sum();
        if declared != desc.qubits {
            return Err(ArchError::InvalidDescription(format!(
                "register sizes sum to {declared}, but 'qubits' is {}",
                desc.qubits
            )));
        }
        if desc.adj.len() != desc.qubits as usize {
            return Err(ArchError::InvalidDescription(format!(
                "'adj' has {} rows for {} qubits",
                desc.adj.len(),
                desc.qubits
            )));
        }

        let mut arch = ArchGraph::from_parts(regs, &[], GraphKind::Directed)?;
        for (u, row) in desc.adj.iter().enumerate() {
            for entry in row {
                let v = arch.uid(&entry.v)?;
                arch.graph.add_edge(u as u32, v);
            }
        }
        Ok(arch)
    }

    /// The underlying coupling graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of physical qubits.
    #[inline]
    pub fn size(&self) -> u32 {
        self.graph.size()
    }

    /// See [`Graph::has_edge`].
    #[inline]
    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.graph.has_edge(u, v)
    }

    /// See [`Graph::has_any_edge`].
    #[inline]
    pub fn has_any_edge(&self, u: u32, v: u32) -> bool {
        self.graph.has_any_edge(u, v)
    }

    /// See [`Graph::is_reverse`].
    #[inline]
    pub fn is_reverse(&self, u: u32, v: u32) -> bool {
        self.graph.is_reverse(u, v)
    }

    /// Neighbours under the undirected closure.
    pub fn adj(&self, u: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph.adj(u)
    }

    /// The device registers with their sizes, in declaration order.
    pub fn regs(&self) -> &[(String, u32)] {
        &self.regs
    }

    /// The argument node naming physical qubit `i`.
    pub fn node(&self, i: u32) -> ArchResult<&Arg> {
        self.nodes
            .get(i as usize)
            .ok_or(ArchError::VertexOutOfBounds {
                vertex: i,
                size: self.size(),
            })
    }

    /// Resolve a `name[index]` string to its vertex id.
    pub fn uid(&self, s: &str) -> ArchResult<u32> {
        self.ids
            .get(s)
            .copied()
            .ok_or_else(|| ArchError::UnknownQubit(s.to_string()))
    }
}
