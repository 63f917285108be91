//! Symbol and signal resolution.
//!
//! Turns the flat [`ParsedNode`](lq_core::ParsedNode) collection into an
//! immutable [`Topology`](lq_core::Topology): every producer gets a unique
//! [`SignalId`](lq_core::SignalId) and every reference property is rewritten
//! to the identity of its target. Resolution is a single flat label lookup;
//! there is no transitive walk and so no cycle detection.
//!
//! ## Modules
//!
//! - [`symbol`]: label table
//! - [`assign`]: identity assignment policy
//! - [`references`]: reference properties per node kind
//! - [`resolve`]: the resolution pass and the signal table

pub mod assign;
pub mod error;
pub mod references;
pub mod resolve;
pub mod symbol;

pub use assign::assign_identities;
pub use error::ResolveError;
pub use resolve::{resolve, signal_table, SignalEntry};
pub use symbol::SymbolTable;
