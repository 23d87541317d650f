use std::time::SystemTime;

/// Metadata for one archived item.
///
/// Entries are immutable once materialized. `index` is the stable key the
/// codec engine addresses the item by for the lifetime of its session,
/// and is what [`crate::Session::extract_entry`] takes for on-demand
/// single-item extraction.
#[derive(Clone, Debug)]
pub struct Entry {
    /// Archive-internal path; may contain directory separators.
    pub path: String,
    pub is_folder: bool,
    pub is_encrypted: bool,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compressed size in bytes; zero when the archive does not store it.
    pub packed_size: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    /// CRC-32 of the uncompressed data; zero when absent (folders,
    /// archives without stored CRCs).
    pub crc32: u32,
    /// Platform-defined attribute bit flags.
    pub attributes: u32,
    pub comment: String,
    pub host_os: String,
    /// Compression method name as reported by the engine.
    pub method: String,
    /// Set on entries that continue from a previous volume.
    pub split_before: bool,
    /// Set on entries that continue into the next volume.
    pub split_after: bool,
    pub(crate) index: u32,
}

impl Entry {
    /// The engine-side index of this entry.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_file(&self) -> bool {
        !self.is_folder
    }

    /// Last component of the archive-internal path.
    pub fn name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or("")
    }
}
