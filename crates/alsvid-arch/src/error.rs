//! Error types for the architecture crate.

use thiserror::Error;

/// Errors that can occur building or querying device descriptions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchError {
    /// Vertex index outside the graph.
    #[error("Vertex {vertex} out of bounds for graph of size {size}")]
    VertexOutOfBounds { vertex: u32, size: u32 },

    /// A qubit string id did not resolve.
    #[error("No physical qubit named '{0}'")]
    UnknownQubit(String),

    /// Malformed coupling-graph description.
    #[error("Invalid architecture description: {0}")]
    InvalidDescription(String),

    /// JSON syntax error in an architecture file.
    #[error("Architecture JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The exact token-swap finder was asked for an infeasible size.
    #[error("Permutation space too large for exact search: {qubits} qubits")]
    PermutationSpaceTooLarge { qubits: u32 },

    /// Token-swap inputs disagree in size with the graph.
    #[error("Assignment size {got} does not match graph size {expected}")]
    AssignmentSizeMismatch { got: usize, expected: usize },
}

/// Result type for architecture operations.
pub type ArchResult<T> = Result<T, ArchError>;
