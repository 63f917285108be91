//! Locating device stubs and splicing their expansion back in.
//!
//! Import is planned once from the block tree. The plan can then be applied
//! to the tree (the compile path) or to the source text (`--expand-eds`),
//! and both produce the same nodes.

use std::path::{Path, PathBuf};

use log::{info, warn};

use lq_core::{Block, NodeKind, ParsedNode, Span};
use lq_dts::render_block;

use crate::dictionary::{EdsDevice, DEFAULT_NODE_ID};
use crate::error::ImportWarning;
use crate::pdo::{PdoLayout, SignalBases};
use crate::project::{device_block, stub_label};
use crate::signals::DeviceSignals;

/// A stub whose EDS file was read and projected.
#[derive(Debug, Clone)]
pub struct ImportedDevice {
    /// Prefix used for generated labels.
    pub label: String,
    /// Byte range of the stub in the description source.
    pub span: Span,
    pub path: PathBuf,
    pub device: EdsDevice,
    pub layout: PdoLayout,
    /// The block that replaces the stub.
    pub block: Block,
}

/// Result of scanning a description for device stubs.
#[derive(Debug, Clone, Default)]
pub struct Import {
    pub devices: Vec<ImportedDevice>,
    pub warnings: Vec<ImportWarning>,
}

impl Import {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Header view of every imported device, in source order.
    pub fn signal_sets(&self) -> Vec<DeviceSignals<'_>> {
        self.devices
            .iter()
            .map(|d| DeviceSignals {
                label: &d.label,
                product: &d.device.info.product_name,
                layout: &d.layout,
            })
            .collect()
    }

    fn replacement(&self, span: Span) -> Option<&Block> {
        self.devices
            .iter()
            .find(|d| d.span == span)
            .map(|d| &d.block)
    }
}

/// A CANopen device node that still names an EDS file.
pub fn is_stub(block: &Block) -> bool {
    let Some(compatible) = block.compatible() else {
        return false;
    };
    NodeKind::classify(compatible, &block.properties) == NodeKind::CanopenDevice
        && block.properties.str("eds-file").is_some()
}

/// Find every stub in the tree and import its EDS file.
///
/// Paths are resolved against `base_dir`. A file that is missing or
/// unreadable produces a warning and leaves its stub untouched.
///
/// The first device's identities start at 100 (transmit) and 0 (receive);
/// each later device continues both ranges where the previous one stopped.
pub fn import_devices(blocks: &[Block], base_dir: &Path) -> Import {
    let mut import = Import::default();
    let mut bases = SignalBases::default();
    for block in blocks.iter().flat_map(Block::walk) {
        if !is_stub(block) {
            continue;
        }
        let label = stub_label(block);
        let file = block.properties.str("eds-file").unwrap_or_default();
        let path = base_dir.join(file);

        let node_id = match block.properties.int("node-id") {
            None => DEFAULT_NODE_ID,
            Some(id) => match u8::try_from(id) {
                Ok(id) => id,
                Err(_) => {
                    push_warning(&mut import, &label, &path, format!("node-id {id} out of range"));
                    continue;
                }
            },
        };

        let device = match EdsDevice::load(&path) {
            Ok(device) => device,
            Err(e) => {
                push_warning(&mut import, &label, &path, e.to_string());
                continue;
            }
        };
        let layout = PdoLayout::with_bases(&device, node_id, bases);
        bases = layout.next_bases(bases);
        info!(
            "imported {} for '{label}': node {node_id}, {} TPDO(s), {} RPDO(s), {} signal(s)",
            path.display(),
            layout.tpdos.len(),
            layout.rpdos.len(),
            layout.signal_count()
        );
        let replacement = device_block(block, &device, &layout);
        import.devices.push(ImportedDevice {
            label,
            span: block.span,
            path,
            device,
            layout,
            block: replacement,
        });
    }
    import
}

fn push_warning(import: &mut Import, stub: &str, path: &Path, reason: String) {
    let warning = ImportWarning {
        stub: stub.to_string(),
        path: path.to_path_buf(),
        reason,
    };
    warn!("{warning}");
    import.warnings.push(warning);
}

/// Apply an import to the block tree.
pub fn splice_blocks(blocks: &[Block], import: &Import) -> Vec<Block> {
    blocks.iter().map(|b| splice_one(b, import)).collect()
}

fn splice_one(block: &Block, import: &Import) -> Block {
    if let Some(replacement) = import.replacement(block.span) {
        let mut replaced = replacement.clone();
        replaced.span = block.span;
        return replaced;
    }
    let mut copy = block.clone();
    copy.children = block
        .children
        .iter()
        .map(|c| splice_one(c, import))
        .collect();
    copy
}

/// Apply an import to the tree and lift the typed nodes.
pub fn splice_nodes(blocks: &[Block], import: &Import) -> Vec<ParsedNode> {
    lq_dts::collect_nodes(&splice_blocks(blocks, import))
}

/// Apply an import to the source text.
///
/// Each stub's byte range is replaced by its rendered expansion, indented to
/// the stub's column; every other byte is preserved.
pub fn expand_text(src: &str, import: &Import) -> String {
    let mut devices: Vec<_> = import.devices.iter().collect();
    devices.sort_by_key(|d| d.span.start);

    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for device in devices {
        let Span { start, end } = device.span;
        if start < cursor || end > src.len() {
            continue;
        }
        out.push_str(&src[cursor..start]);

        let line_start = src[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = &src[line_start..start];
        let depth = if column.chars().all(|c| c == ' ' || c == '\t') {
            column.replace('\t', "    ").len() / 4
        } else {
            0
        };
        let rendered = render_block(&device.block, depth);
        // The stub's own indentation is already in the output.
        let trimmed = rendered.trim_start_matches(' ').trim_end_matches('\n');
        out.push_str(trimmed);
        cursor = end;
    }
    out.push_str(&src[cursor..]);
    out
}
