//! Summary of one compilation.

use std::fmt;

use serde::Serialize;

use crate::resource::ResourceCounts;

#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    /// Description file name.
    pub source: String,
    /// Short SHA-256 of the description text.
    pub fingerprint: String,
    pub nodes: usize,
    pub resources: ResourceCounts,
    /// Output families that received a dispatch case.
    pub output_families: Vec<String>,
    /// Fault wake callbacks given weak defaults.
    pub wake_callbacks: Vec<String>,
    /// Names of the artifacts produced, in write order.
    pub artifacts: Vec<String>,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Compile Report ===")?;
        writeln!(f, "Source: {} (sha256:{})", self.source, self.fingerprint)?;
        writeln!(f, "Nodes: {}", self.nodes)?;
        writeln!(f)?;
        write!(f, "{}", self.resources)?;

        writeln!(f)?;
        if self.output_families.is_empty() {
            writeln!(f, "--- Output families: none ---")?;
        } else {
            writeln!(f, "--- Output families: {} ---", self.output_families.join(", "))?;
        }
        if !self.wake_callbacks.is_empty() {
            writeln!(f, "--- Wake callbacks ({}) ---", self.wake_callbacks.len())?;
            for name in &self.wake_callbacks {
                writeln!(f, "  {name}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "--- Artifacts ({}) ---", self.artifacts.len())?;
        for name in &self.artifacts {
            writeln!(f, "  {name}")?;
        }
        Ok(())
    }
}
