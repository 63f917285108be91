//! Core data model for the layered-queue description compiler.
//!
//! A description is parsed into [`Block`]s (brace blocks exactly as written),
//! the blocks that declare a `compatible` type become [`ParsedNode`]s, and the
//! resolver turns those into immutable [`ResolvedNode`]s that carry their
//! assigned [`SignalId`] and fully resolved reference properties.
//!
//! ## Modules
//!
//! - [`property`]: the closed [`PropertyValue`] union and ordered property map
//! - [`node`]: raw blocks, parsed nodes, and the [`NodeKind`] classification
//! - [`signal`]: signal identities
//! - [`resolved`]: resolved nodes and the [`Topology`] they form

pub mod node;
pub mod property;
pub mod resolved;
pub mod signal;

pub use node::{Block, HwBus, NodeKind, OutputFamily, ParsedNode, PdoDirection, Span};
pub use property::{normalize_name, Properties, PropertyValue};
pub use resolved::{ResolvedNode, Topology};
pub use signal::SignalId;
