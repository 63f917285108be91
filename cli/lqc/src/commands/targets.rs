//! `lqc targets`: the built-in platform backends.

use anyhow::Result;

use lq_targets::Platform;

pub fn list() -> Result<()> {
    println!("Built-in platforms:");
    println!();
    for platform in Platform::ALL {
        println!("  {:<8} {}", platform.name(), platform.description());
    }
    println!();
    println!("Use 'lqc compile <input> <output-dir> --platform=<name>'.");
    Ok(())
}
