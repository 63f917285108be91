//! Materialization pipeline orchestrator.

use std::path::Path;

use log::{debug, info};
use sha2::{Digest, Sha256};

use lq_core::Topology;
use lq_targets::{platform_source, HwInput, Platform};

use crate::artifact::Artifact;
use crate::codegen::{
    banner_text, bounds, dispatch, engine, header, render, source, Banner, GENERATED_HEADER,
    GENERATED_SOURCE, RESOURCE_BOUNDS,
};
use crate::error::Result;
use crate::report::CompileReport;
use crate::resource::{analyze, ResourceCounts, DEFAULT_RING_BUFFER_DEPTH};

/// Hex digits of the SHA-256 kept in banners.
const FINGERPRINT_LEN: usize = 16;

/// Configuration for the materialization pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Provenance written into every banner.
    pub banner: Banner,
    /// Ring-buffer depth when the topology has no engine override.
    pub ring_buffer_depth: u32,
}

impl PipelineConfig {
    /// Banner for `path` with the fingerprint of `text`.
    pub fn for_source(path: &Path, text: &str) -> Self {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            banner: Banner {
                source,
                fingerprint: fingerprint(text),
            },
            ring_buffer_depth: DEFAULT_RING_BUFFER_DEPTH,
        }
    }
}

/// Output of a successful materialization run. Nothing has been written yet.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Core artifacts: header, source, resource bounds.
    pub artifacts: Vec<Artifact>,
    pub counts: ResourceCounts,
    pub report: CompileReport,
}

/// Short SHA-256 of a description, as it appears in banners.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..FINGERPRINT_LEN].to_string()
}

/// Run the core generators:
/// resource analysis -> family check -> header + source + bounds -> report.
///
/// Every artifact is rendered in memory; any failure returns before a
/// single file exists.
pub fn materialize(topology: &Topology, config: &PipelineConfig) -> Result<PipelineOutput> {
    // Stage 1: Static sizing
    let counts = analyze(topology, config.ring_buffer_depth);

    // Stage 2: Output families, rejecting any without an encoding
    let families = dispatch::families_used(topology)?;
    let wakes = engine::wake_callbacks(topology)?;
    let inputs = HwInput::collect(topology);

    // Stage 3: Render
    let artifacts = vec![
        Artifact::new(
            GENERATED_HEADER,
            render(&header::generated_header(&config.banner, &inputs, &wakes)),
        ),
        Artifact::new(
            GENERATED_SOURCE,
            render(&source::generated_source(
                topology,
                &config.banner,
                &inputs,
                &wakes,
                &families,
            )?),
        ),
        Artifact::new(
            RESOURCE_BOUNDS,
            render(&bounds::resource_bounds(&counts, &config.banner)),
        ),
    ];
    debug!(
        "rendered {} core artifact(s) for {} node(s)",
        artifacts.len(),
        topology.len()
    );

    // Stage 4: Report
    let report = CompileReport {
        source: config.banner.source.clone(),
        fingerprint: config.banner.fingerprint.clone(),
        nodes: topology.len(),
        resources: counts.clone(),
        output_families: families.iter().map(|f| f.as_str().to_string()).collect(),
        wake_callbacks: wakes,
        artifacts: artifacts.iter().map(|a| a.name.clone()).collect(),
    };

    Ok(PipelineOutput {
        artifacts,
        counts,
        report,
    })
}

/// Render `lq_platform_<name>.c`. An unknown name fails here, after the
/// core artifacts are already on disk.
pub fn platform_artifact(
    topology: &Topology,
    platform: &str,
    config: &PipelineConfig,
) -> Result<Artifact> {
    let platform: Platform = platform.parse()?;
    let inputs = HwInput::collect(topology);
    info!("generating {platform} backend for {} input(s)", inputs.len());
    Ok(Artifact::new(
        platform.artifact_name(),
        platform_source(platform, &inputs, &banner_text(&config.banner)),
    ))
}
