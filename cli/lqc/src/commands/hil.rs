//! `lqc hil`: compile a hand-written test description into a runner.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use lq_hil::{compile_harness, parse_suite, HIL_RUNNER};
use lq_materialize::{write_all, Artifact, PipelineConfig};

pub fn run(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    if !input.is_file() {
        bail!("test description not found: {}", input.display());
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let tests = parse_suite(&text).with_context(|| format!("compiling {}", input.display()))?;
    if tests.is_empty() {
        log::warn!("{} declares no test cases", input.display());
    }

    let banner = PipelineConfig::for_source(input, &text).banner;
    let runner = Artifact::new(HIL_RUNNER, compile_harness(&tests, &banner));
    let mut written = write_all(output_dir, &[runner])?;
    let path = written.remove(0);
    let steps: usize = tests.iter().map(|t| t.steps.len()).sum();
    println!("{} case(s), {steps} step(s)", tests.len());
    println!("  wrote {}", path.display());
    Ok(path)
}
