//! `lqc inspect`: resolved signals and resource counts, nothing written.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use lq_eds::splice_nodes;
use lq_materialize::{analyze, ResourceCounts, DEFAULT_RING_BUFFER_DEPTH};
use lq_resolve::{signal_table, SignalEntry};

use super::compile::load;

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub source: String,
    pub nodes: usize,
    pub signals: Vec<SignalEntry>,
    pub resources: ResourceCounts,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Inspect: {} ===", self.source)?;
        writeln!(f, "Nodes: {}", self.nodes)?;
        writeln!(f)?;
        writeln!(f, "--- Signals ({}) ---", self.signals.len())?;
        for entry in &self.signals {
            writeln!(f, "  {:>4}  {:<20} {}", entry.id.index(), entry.kind, entry.producer)?;
        }
        writeln!(f)?;
        write!(f, "{}", self.resources)
    }
}

/// Resolve `input` and collect what `inspect` shows.
pub fn inspect(input: &Path, ring_buffer_depth: Option<u32>) -> Result<InspectReport> {
    let loaded = load(input)?;
    let nodes = splice_nodes(&loaded.blocks, &loaded.import);
    let topology =
        lq_resolve::resolve(&nodes).with_context(|| format!("resolving {}", input.display()))?;
    Ok(InspectReport {
        source: input.display().to_string(),
        nodes: topology.len(),
        signals: signal_table(&topology),
        resources: analyze(
            &topology,
            ring_buffer_depth.unwrap_or(DEFAULT_RING_BUFFER_DEPTH),
        ),
    })
}

pub fn run(input: &Path, format: Option<&str>, ring_buffer_depth: Option<u32>) -> Result<()> {
    let report = inspect(input, ring_buffer_depth)?;
    match format.unwrap_or("text") {
        "text" => print!("{report}"),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        other => bail!("unknown format: '{other}'. Choose: text, json"),
    }
    Ok(())
}
