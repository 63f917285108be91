//! `lqc compile`: description -> engine, platform and HIL artifacts.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;

use lq_eds::{expand_text, header_guard, import_devices, signals_header, splice_nodes, Import};
use lq_hil::{compile_harness, derive_tests, write_suite, DeriveConfig, HIL_RUNNER, HIL_TESTS};
use lq_materialize::{materialize, platform_artifact, write_all, Artifact, PipelineConfig};

use crate::manifest::Project;

/// Everything `compile` takes besides the two paths, after merging the
/// command line over `lqc.toml`.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub platform: Option<String>,
    pub expand_eds: bool,
    pub signals_header: Option<PathBuf>,
    pub hil: bool,
    pub ring_buffer_depth: Option<u32>,
    pub max_latency_us: Option<i64>,
}

impl CompileOptions {
    /// Fill anything the command line left unset from the project file.
    pub fn with_project(mut self, project: Option<&Project>) -> Self {
        let Some(project) = project else {
            return self;
        };
        let config = &project.manifest;
        if self.platform.is_none() {
            self.platform = config.compile.platform.clone();
        }
        if self.signals_header.is_none() {
            self.signals_header = project.signals_header();
        }
        self.hil = self.hil && config.hil.enabled;
        self.ring_buffer_depth = self.ring_buffer_depth.or(config.compile.ring_buffer_depth);
        self.max_latency_us = self.max_latency_us.or(config.hil.max_latency_us);
        self
    }
}

/// A description read from disk together with its EDS import.
pub struct Loaded {
    pub text: String,
    pub blocks: Vec<lq_core::Block>,
    pub import: Import,
}

/// Read and parse `input`, then import any EDS files its stubs name.
///
/// Import warnings are logged by the importer and kept on
/// [`Loaded::import`]; they are not printed again here.
pub fn load(input: &Path) -> Result<Loaded> {
    if !input.is_file() {
        bail!("input description not found: {}", input.display());
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let blocks =
        lq_dts::parse_blocks(&text).with_context(|| format!("parsing {}", input.display()))?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let import = import_devices(&blocks, base_dir);
    Ok(Loaded {
        text,
        blocks,
        import,
    })
}

/// Run the compiler. Returns every path written.
pub fn run(input: &Path, output_dir: &Path, options: &CompileOptions) -> Result<Vec<PathBuf>> {
    let loaded = load(input)?;
    let mut written = Vec::new();

    if options.expand_eds {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "description".to_string());
        let expanded = Artifact::new(
            format!("{stem}.expanded.dts"),
            expand_text(&loaded.text, &loaded.import),
        );
        written.extend(write_all(output_dir, &[expanded])?);
        if let Some(path) = &options.signals_header {
            written.extend(write_signals_header(path, &loaded.import)?);
        }
        report_written(&written);
        return Ok(written);
    }

    // Resolution must succeed before anything touches the output directory.
    let nodes = splice_nodes(&loaded.blocks, &loaded.import);
    let topology =
        lq_resolve::resolve(&nodes).with_context(|| format!("resolving {}", input.display()))?;

    let mut config = PipelineConfig::for_source(input, &loaded.text);
    if let Some(depth) = options.ring_buffer_depth {
        config.ring_buffer_depth = depth;
    }
    let output = materialize(&topology, &config)
        .with_context(|| format!("generating engine for {}", input.display()))?;

    let mut artifacts = output.artifacts;
    if options.hil {
        let derive = DeriveConfig {
            max_latency_us: options
                .max_latency_us
                .unwrap_or(DeriveConfig::default().max_latency_us),
        };
        let tests = derive_tests(&topology, &derive);
        info!("derived {} HIL case(s)", tests.len());
        artifacts.push(Artifact::new(HIL_TESTS, write_suite(&tests)));
        artifacts.push(Artifact::new(HIL_RUNNER, compile_harness(&tests, &config.banner)));
    }
    written.extend(write_all(output_dir, &artifacts)?);

    if let Some(path) = &options.signals_header {
        written.extend(write_signals_header(path, &loaded.import)?);
    }

    // The platform stage runs last; its failure leaves the files above in place.
    if let Some(platform) = &options.platform {
        let artifact = platform_artifact(&topology, platform, &config)
            .with_context(|| format!("platform stage for '{platform}'"))?;
        written.extend(write_all(output_dir, &[artifact])?);
    }

    println!("{}", output.report);
    report_written(&written);
    Ok(written)
}

/// Write `SIG_<NAME>` definitions for every imported device.
pub fn write_signals_header(path: &Path, import: &Import) -> Result<Vec<PathBuf>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("signals header path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let text = signals_header(&header_guard(&file_name), &import.signal_sets());
    Ok(write_all(dir, &[Artifact::new(file_name, text)])?)
}

fn report_written(paths: &[PathBuf]) {
    for path in paths {
        println!("  wrote {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_EDS: &str = r#"/ {
    rpm: adc@0 { compatible = "lq,hw-adc-input"; };
    motor: canopen@7 {
        compatible = "lq,protocol-canopen";
        eds-file = "absent.eds";
    };
    out { compatible = "lq,cyclic-output"; source = <&rpm>; };
};
"#;

    #[test]
    fn missing_eds_is_carried_as_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bus.dts");
        std::fs::write(&input, MISSING_EDS).unwrap();

        let loaded = load(&input).unwrap();
        assert!(loaded.import.is_empty());
        assert_eq!(loaded.import.warnings.len(), 1);
        assert_eq!(loaded.import.warnings[0].stub, "motor");

        let written = run(
            &input,
            &dir.path().join("gen"),
            &CompileOptions {
                hil: false,
                ..CompileOptions::default()
            },
        )
        .unwrap();
        assert_eq!(written.len(), 3);
    }
}
