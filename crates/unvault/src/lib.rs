//! Multi-format archive enumeration and extraction over an opaque codec
//! engine.
//!
//! The engine owns the actual format parsing and decompression; this
//! crate owns everything around it: deciding which format a byte stream
//! is, decoding the engine's dynamically-typed per-entry properties into
//! typed metadata, and driving the engine's pull-based extraction
//! protocol with deterministic sink cleanup.
//!
//! # Architecture
//!
//! - `format.rs` - Format catalog and detection
//! - `entry.rs` - Entry metadata model
//! - `property.rs` - Typed property decoding
//! - `session.rs` - Session lifecycle and extraction
//! - `bridge.rs` - Pull-protocol callback bridge
//!
//! # Example
//!
//! ```rust,ignore
//! let mut session = unvault::Session::open("backup.7z", None)?;
//! for entry in session.entries()? {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//! session.extract("./out", false)?;
//! ```

pub use entry::Entry;
pub use error::{Error, Result};
pub use format::{Format, detect_by_extension, detect_by_signature};
pub use session::{ExtractOptions, Session};

pub use unvault_engine as engine;

mod bridge;
mod entry;
mod error;
mod format;
mod property;
mod session;
