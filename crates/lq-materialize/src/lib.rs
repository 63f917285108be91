//! Engine artifact generation for layered-queue descriptions.
//!
//! Turns a resolved [`Topology`](lq_core::Topology) into the C files that
//! configure the target engine, with every static array sized exactly.
//!
//! ## Modules
//!
//! - [`resource`]: exact counts and the `LQ_*` sizing macros
//! - [`codegen`]: typed emission items, their renderer and one generator per file
//! - [`artifact`]: rendered files and atomic write-then-rename
//! - [`pipeline`]: the staged orchestrator and the platform stage
//! - [`report`]: human-readable summary of a run

pub mod artifact;
pub mod codegen;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod resource;

pub use artifact::{write_all, Artifact};
pub use error::MaterializationError;
pub use pipeline::{fingerprint, materialize, platform_artifact, PipelineConfig, PipelineOutput};
pub use report::CompileReport;
pub use resource::{analyze, ResourceCounts, DEFAULT_RING_BUFFER_DEPTH};
