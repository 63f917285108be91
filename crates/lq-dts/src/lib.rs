//! Reader and writer for the layered-queue description language.
//!
//! The language is a flat, devicetree-like format: labelled brace blocks
//! holding typed properties. Parsing is all-or-nothing; any syntax error
//! aborts with the byte offset it refers to and no partial node collection.
//!
//! ## Modules
//!
//! - [`lexer`]: comment stripping, brace checking, tokens
//! - [`parse`]: block tree and flat typed-node collection
//! - [`write`]: deterministic text rendering of blocks

pub mod error;
pub mod lexer;
pub mod parse;
pub mod write;

pub use error::ParseError;
pub use parse::{collect_nodes, parse_blocks, parse_int, parse_nodes};
pub use write::{render_block, render_property, write_blocks};
