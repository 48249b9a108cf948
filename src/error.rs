//! Error types for the PoE tree simulator.
//!
//! This module provides a unified error type [`PoeError`] that covers
//! every structurally invalid operation: DSL parsing, topology edits,
//! configuration and snapshot restore. Numeric edge cases inside a tick
//! (zero voltage, zero-length cables) never produce errors; they are
//! clamped by the solver instead.

use thiserror::Error;

use crate::topology::NodeId;

/// Result type alias using [`PoeError`].
pub type Result<T> = std::result::Result<T, PoeError>;

/// Unified error type for all PoE simulator operations.
#[derive(Error, Debug)]
pub enum PoeError {
    // ============ DSL Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Unknown node type keyword
    #[error("Unknown node type '{node_type}' at line {line} (expected 'ps' or 'ns')")]
    UnknownNodeType { node_type: String, line: usize },

    /// Unknown `key=value` parameter on a node line
    #[error("Unknown parameter '{param}' for node '{node}' at line {line}")]
    UnknownParameter {
        node: String,
        param: String,
        line: usize,
    },

    /// Two node lines declare the same name
    #[error("Duplicate node name '{name}' at line {line}")]
    DuplicateNode { name: String, line: usize },

    /// A node line or `.poe` directive references an undeclared node
    #[error("Unknown node '{name}' referenced at line {line}")]
    UnknownNodeName { name: String, line: usize },

    // ============ Topology Errors ============
    /// Node id not present in the topology
    #[error("Node {id} not found in topology")]
    NodeNotFound { id: NodeId },

    /// Port index out of range for a node
    #[error("Port {port} not found on node {node}")]
    PortNotFound { node: NodeId, port: usize },

    /// A parent-less node was added while a root already exists
    #[error("Topology already has a root node ({root})")]
    RootAlreadyExists { root: NodeId },

    /// The root of the tree must be a power source
    #[error("Root node must be a power source ('ps')")]
    RootMustBeSource,

    /// Power sources cannot hang below another node
    #[error("Power source cannot be attached below node {parent}")]
    SourceMustBeRoot { parent: NodeId },

    /// A source-only operation was applied to a switch, or the reverse
    #[error("Node {id} is not a {expected}")]
    WrongNodeKind { id: NodeId, expected: &'static str },

    /// Invalid tree structure (cycles, broken links, order violations)
    #[error("Invalid topology: {message}")]
    InvalidTopology { message: String },

    /// Snapshot cannot be restored
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot { message: String },

    /// Non-finite numeric input to a setter
    #[error("Invalid value for {param}: {value}")]
    InvalidParameter { param: &'static str, value: f64 },

    // ============ Configuration Errors ============
    /// Configuration value out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key '{key}'")]
    UnknownConfigKey { key: String },

    // ============ Simulation Errors ============
    /// The tree did not settle within the tick budget
    #[error("Topology did not settle after {ticks} ticks (residual: {residual:.2e})")]
    ConvergenceFailure { ticks: usize, residual: f64 },

    // ============ I/O Errors ============
    /// Error reading topology file
    #[error("Failed to read topology file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing the report
    #[error("Report output error: {message}")]
    ReportError { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl PoeError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(ticks: usize, residual: f64) -> Self {
        Self::ConvergenceFailure { ticks, residual }
    }
}

/// Reject NaN and infinities coming from setters.
pub(crate) fn ensure_finite(param: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PoeError::InvalidParameter { param, value })
    }
}
