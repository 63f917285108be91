//! `lqc eds`: inspect one EDS file on its own.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use lq_eds::{header_guard, signals_header, DeviceSignals, EdsDevice, PdoLayout, DEFAULT_NODE_ID};
use lq_materialize::{write_all, Artifact};

#[derive(Debug, Clone, Default)]
pub struct EdsOptions {
    pub node_id: Option<u8>,
    pub list_objects: bool,
    pub signals_header: Option<PathBuf>,
}

pub fn run(path: &Path, options: &EdsOptions) -> Result<()> {
    if !path.is_file() {
        bail!("EDS file not found: {}", path.display());
    }
    let device = EdsDevice::load(path).with_context(|| format!("reading {}", path.display()))?;
    let layout = PdoLayout::new(&device, options.node_id.unwrap_or(DEFAULT_NODE_ID));

    print!("{}", summary(&device, &layout));
    if options.list_objects {
        println!();
        print!("{}", device.object_table());
    }

    if let Some(header) = &options.signals_header {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = header
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("signals header path has no file name: {}", header.display()))?;
        let devices = [DeviceSignals {
            label: &label,
            product: &device.info.product_name,
            layout: &layout,
        }];
        let dir = match header.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let text = signals_header(&header_guard(&file_name), &devices);
        for written in write_all(dir, &[Artifact::new(file_name, text)])? {
            println!("  wrote {}", written.display());
        }
    }
    Ok(())
}

/// Device identity followed by every PDO and its mapped signals.
pub fn summary(device: &EdsDevice, layout: &PdoLayout) -> String {
    let mut out = String::new();
    let info = &device.info;
    let _ = writeln!(out, "=== EDS Device ===");
    let _ = writeln!(out, "Vendor:  {} (0x{:08X})", info.vendor_name, info.vendor_number);
    let _ = writeln!(out, "Product: {} (0x{:08X})", info.product_name, info.product_number);
    let _ = writeln!(out, "Node id: {}", layout.node_id);
    let _ = writeln!(out, "TPDOs:   {}", layout.tpdos.len());
    let _ = writeln!(out, "RPDOs:   {}", layout.rpdos.len());
    for pdo in layout.pdos() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- {} (COB-ID 0x{:03X}) ---", pdo.name(), pdo.cob_id);
        for mapped in &pdo.signals {
            let _ = writeln!(
                out,
                "  [{:>3}] {} (0x{:04X}:{:02X}, {} bits)",
                mapped.signal.index(),
                mapped.name,
                mapped.entry.index,
                mapped.entry.sub_index,
                mapped.entry.length
            );
        }
    }
    out
}
