//! `lqc.toml` project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "lqc.toml";

/// The whole project file. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LqcManifest {
    pub project: ProjectConfig,
    pub compile: CompileConfig,
    pub hil: HilConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
}

/// Defaults for `lqc compile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompileConfig {
    /// Default for `--platform`.
    pub platform: Option<String>,
    /// Ring-buffer depth when the description has no engine override.
    pub ring_buffer_depth: Option<u32>,
    /// Default for `--signals-header`, relative to the manifest's directory.
    pub signals_header: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HilConfig {
    pub enabled: bool,
    pub max_latency_us: Option<i64>,
}

impl Default for HilConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_latency_us: None,
        }
    }
}

impl LqcManifest {
    /// Search upward from `start_dir` for `lqc.toml`, returning it with the
    /// directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = std::fs::canonicalize(start_dir).unwrap_or_else(|_| start_dir.to_path_buf());
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: LqcManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                log::info!("using {}", candidate.display());
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing lqc.toml")
    }
}

/// A manifest together with the directory its relative paths refer to.
#[derive(Debug, Clone)]
pub struct Project {
    pub manifest: LqcManifest,
    pub dir: PathBuf,
}

impl Project {
    /// The project governing `input`, if any.
    pub fn for_input(input: &Path) -> Result<Option<Self>> {
        let start = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(LqcManifest::find_and_load(&start)?.map(|(manifest, dir)| Project { manifest, dir }))
    }

    pub fn signals_header(&self) -> Option<PathBuf> {
        self.manifest
            .compile
            .signals_header
            .as_ref()
            .map(|p| self.dir.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = LqcManifest::from_str(
            r#"
[project]
name = "engine-ecu"

[compile]
platform = "stm32"
ring-buffer-depth = 128
signals-header = "include/lq_signals.h"

[hil]
enabled = false
max-latency-us = 8000
"#,
        )
        .unwrap();
        assert_eq!(manifest.project.name.as_deref(), Some("engine-ecu"));
        assert_eq!(manifest.compile.platform.as_deref(), Some("stm32"));
        assert_eq!(manifest.compile.ring_buffer_depth, Some(128));
        assert_eq!(
            manifest.compile.signals_header,
            Some(PathBuf::from("include/lq_signals.h"))
        );
        assert!(!manifest.hil.enabled);
        assert_eq!(manifest.hil.max_latency_us, Some(8000));
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = LqcManifest::from_str("").unwrap();
        assert!(manifest.compile.platform.is_none());
        assert!(manifest.hil.enabled);
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(LqcManifest::from_str("[compile\nplatform = ").is_err());
        assert!(LqcManifest::from_str("[compile]\nring-buffer-depth = \"deep\"").is_err());
    }

    #[test]
    fn found_from_a_nested_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "[compile]\nsignals-header = \"out/sig.h\"\n",
        )
        .unwrap();
        let nested = dir.path().join("hw").join("boards");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::for_input(&nested.join("ecu.dts")).unwrap().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(project.dir, root);
        assert_eq!(project.signals_header(), Some(root.join("out/sig.h")));
    }
}
