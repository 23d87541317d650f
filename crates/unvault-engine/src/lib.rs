//! Capability surface for the native codec engine.
//!
//! The engine that actually parses and decompresses archive formats is an
//! opaque native module. This crate pins down the minimal contract the
//! orchestration layer depends on:
//!
//! - `reader.rs` - `Engine` / `ArchiveReader` / `ExtractCallback` traits
//! - `variant.rs` - the dynamically-tagged property cell
//! - `module.rs` - native module discovery and the process-wide engine slot
//! - `error.rs` - engine-boundary errors
//!
//! Everything behind these traits is replaceable, which is also how the
//! orchestration crate tests itself without a native module present.

pub use error::{Error, Result};
pub use module::{discover_module, global_engine, set_engine};
pub use reader::{
    ArchiveReader, Engine, ExtractCallback, FormatSelector, InputStream, OperationResult, PropId,
};
pub use variant::Variant;

mod error;
mod module;
mod reader;
mod variant;
