//! Error types for the QASM front end.

use thiserror::Error;

/// Errors that can occur while parsing a program.
///
/// Covers both syntactic failures (malformed source) and the semantic
/// checks the parser performs while building the module (name resolution,
/// arity, register kind).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    /// Invalid version tag.
    #[error("Unsupported OPENQASM version: {0}")]
    InvalidVersion(String),

    /// Unknown include file.
    #[error("Unknown include file: \"{0}\"")]
    UnknownInclude(String),

    /// Undefined register or gate-local name.
    #[error("Undefined identifier '{name}' at line {line}")]
    UndefinedIdentifier { name: String, line: usize },

    /// Duplicate declaration.
    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Call to an undeclared gate.
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Wrong number of quantum arguments in a call.
    #[error("Gate '{gate}' expects {expected} qubits, got {got}")]
    WrongQubitCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of classical parameters in a call.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Classical register used where a qubit is required, or vice versa.
    #[error("Register '{name}' cannot be used in a {expected} position")]
    WrongRegisterKind { name: String, expected: String },

    /// Indexed access beyond the register size.
    #[error("Index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: u32,
        size: u32,
    },

    /// IR error during module construction.
    #[error("Module error: {0}")]
    Ir(#[from] alsvid_ir::IrError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
