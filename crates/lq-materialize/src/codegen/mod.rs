//! C artifact generation: resolved topology → typed items → text.
//!
//! Each generator returns a `Vec<Item>` for one file. Nothing here touches
//! the filesystem; [`crate::artifact`] does that once every file has rendered.

pub mod bounds;
pub mod dispatch;
pub mod engine;
pub mod header;
pub mod isr;
pub mod item;
pub mod render;
pub mod source;

pub use item::{Banner, Fields, Function, Init, Item, Stmt};
pub use render::{banner_text, render};

/// Declaration header.
pub const GENERATED_HEADER: &str = "lq_generated.h";
/// Initializer source.
pub const GENERATED_SOURCE: &str = "lq_generated.c";
/// Resource-bounds header.
pub const RESOURCE_BOUNDS: &str = "lq_resource_bounds.h";
