//! Built-in device descriptions.

use crate::arch::ArchGraph;
use crate::graph::GraphKind;

/// Look up a preset architecture by name.
///
/// Known presets: `square5`, `ibmqx2`, `linear16`.
pub fn by_name(name: &str) -> Option<ArchGraph> {
    match name {
        "square5" => Some(square5()),
        "ibmqx2" => Some(ibmqx2()),
        "linear16" => Some(linear16()),
        _ => None,
    }
}

/// The names of all presets.
pub fn names() -> &'static [&'static str] {
    &["square5", "ibmqx2", "linear16"]
}

fn edges(pairs: &[(u32, u32)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|&(u, v)| (format!("q[{u}]"), format!("q[{v}]")))
        .collect()
}

/// A 5-qubit device of two triangles sharing qubit 2, undirected:
/// `{0-1, 0-2, 1-2, 3-2, 4-2, 3-4}`.
pub fn square5() -> ArchGraph {
    ArchGraph::from_parts(
        vec![("q".into(), 5)],
        &edges(&[(0, 1), (0, 2), (1, 2), (3, 2), (4, 2), (3, 4)]),
        GraphKind::Undirected,
    )
    .expect("square5 preset must be well formed")
}

/// The IBM QX2 device: 5 qubits with directed CX edges.
pub fn ibmqx2() -> ArchGraph {
    ArchGraph::from_parts(
        vec![("q".into(), 5)],
        &edges(&[(1, 0), (2, 0), (2, 1), (3, 2), (3, 4), (4, 2)]),
        GraphKind::Directed,
    )
    .expect("ibmqx2 preset must be well formed")
}

/// A 16-qubit line, undirected.
pub fn linear16() -> ArchGraph {
    let pairs: Vec<(u32, u32)> = (0..15).map(|i| (i, i + 1)).collect();
    ArchGraph::from_parts(
        vec![("q".into(), 16)],
        &edges(&pairs),
        GraphKind::Undirected,
    )
    .expect("linear16 preset must be well formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square5() {
        let arch = square5();
        assert_eq!(arch.size(), 5);
        assert!(arch.has_edge(0, 1) && arch.has_edge(1, 0));
        assert!(arch.has_edge(3, 4));
        assert!(!arch.has_any_edge(0, 4));
    }

    #[test]
    fn test_ibmqx2_directions() {
        let arch = ibmqx2();
        assert!(arch.has_edge(1, 0));
        assert!(!arch.has_edge(0, 1));
        assert!(arch.is_reverse(0, 1));
    }

    #[test]
    fn test_lookup() {
        for name in names() {
            assert!(by_name(name).is_some());
        }
        assert!(by_name("nope").is_none());
    }
}
