//! CLI command implementations.

pub mod compile;
pub mod eds;
pub mod hil;
pub mod inspect;
pub mod targets;
