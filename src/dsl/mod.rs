//! Topology description language.
//!
//! A small line-oriented format for describing a PoE distribution tree,
//! so a topology can be kept in a file and handed to the CLI or the WASM
//! front-end.
//!
//! # Grammar Overview
//!
//! ```text
//! file      = { line }
//! line      = comment | directive | node | empty
//! comment   = ('#' | ';') { any_char }
//! directive = ".config" key number
//!           | ".poe" name number { number }
//! node      = type name [parent] { key '=' number }
//!
//! type      = "ps" | "ns"
//! number    = ['-'|'+'] digits ['.' digits] [exponent] [suffix]
//! suffix    = 'u' | 'm' | 'k' | 'M'
//! ```
//!
//! # Node Parameters
//!
//! | Type | Key | Meaning |
//! |------|-----|---------|
//! | ps | `voltage` | Output voltage (V) |
//! | ps | `maxw` | Capacity (W) |
//! | ns | `len` | Cable length from the parent (m) |
//! | ns | `power` | Housekeeping power (W) |
//! | ns | `ports` | Number of ports to create |
//!
//! # Example
//!
//! ```text
//! # Two-hop chain with a PoE camera
//! .config damping 0.2
//!
//! ps UPS  voltage=48 maxw=300
//! ns CORE UPS  len=300
//! ns EDGE CORE len=1.2k ports=4
//! .poe EDGE 12.95
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a topology description into an AST.
pub fn parse(input: &str) -> Result<TopologyAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a topology file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<TopologyAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::PoeError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
