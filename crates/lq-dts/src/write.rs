//! Deterministic description writer.
//!
//! Renders [`Block`]s back to description text: four-space indentation,
//! properties in insertion order, then children separated by a blank line.
//! Generated topologies and expanded device stubs go through here so that
//! their layout never depends on how they were built.

use std::fmt::Write as _;

use lq_core::{Block, PropertyValue};

/// Render a sequence of top-level blocks, each followed by a newline.
pub fn write_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&render_block(block, 0));
    }
    out
}

/// Render one block at the given nesting depth, ending with `};\n`.
pub fn render_block(block: &Block, depth: usize) -> String {
    let mut out = String::new();
    let pad = "    ".repeat(depth);

    let _ = write!(out, "{pad}");
    if let Some(label) = &block.label {
        let _ = write!(out, "{label}: ");
    }
    out.push_str(&block.name);
    if let Some(addr) = &block.address {
        let _ = write!(out, "@{addr}");
    }
    out.push_str(" {\n");

    for (name, value) in block.properties.iter() {
        let _ = writeln!(out, "{pad}    {}", render_property(name, value));
    }
    for (i, child) in block.children.iter().enumerate() {
        if i > 0 || !block.properties.is_empty() {
            out.push('\n');
        }
        out.push_str(&render_block(child, depth + 1));
    }

    let _ = writeln!(out, "{pad}}};");
    out
}

/// `name = value;`, or `name;` for a flag.
pub fn render_property(name: &str, value: &PropertyValue) -> String {
    match value {
        PropertyValue::Flag => format!("{name};"),
        PropertyValue::Str(s) => format!("{name} = \"{}\";", escape(s)),
        other => format!("{name} = {other};"),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
