use std::io::{Read, Seek, Write};

use crate::error::Result;
use crate::variant::Variant;

/// Input stream a reader takes ownership of when it opens an archive.
///
/// `Seek` is mandatory: both signature sniffing and the engine's own
/// header scan rewind, and a stream that cannot seek backward would be
/// silently corrupted by either.
pub trait InputStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> InputStream for T {}

/// Opaque format identifier understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatSelector(pub u32);

/// Per-entry property identifiers a reader can be queried for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropId {
    Path,
    IsFolder,
    Size,
    PackedSize,
    Attributes,
    CreationTime,
    LastWriteTime,
    LastAccessTime,
    Encrypted,
    Crc,
    Comment,
    Method,
    HostOs,
    SplitBefore,
    SplitAfter,
}

/// Completion code the engine reports for each extracted item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Ok,
    UnsupportedMethod,
    DataError,
    CrcError,
    Unavailable,
}

impl OperationResult {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Pull protocol the engine drives during bulk extraction.
///
/// The engine calls back synchronously from within `extract`: for each
/// selected index, in ascending order, `get_stream` then incremental
/// writes then `set_operation_result`, with no overlap between indices.
/// The sink handed out by `get_stream` must stay writable until that
/// index's `set_operation_result` arrives.
pub trait ExtractCallback {
    /// Advisory: total number of bytes the engine expects to produce.
    fn set_total(&mut self, total: u64);

    /// Advisory: bytes produced so far.
    fn set_completed(&mut self, completed: u64);

    /// Returns the sink for `index`, or `None` to skip output for it.
    fn get_stream(&mut self, index: u32) -> Result<Option<&mut dyn Write>>;

    /// Invoked once the engine has finished writing `index`.
    fn set_operation_result(&mut self, index: u32, result: OperationResult);
}

/// One open archive inside the engine.
///
/// Readers wrap a native handle; `release` must be idempotent and is also
/// invoked via drop glue by whoever owns the box.
pub trait ArchiveReader {
    /// Validates the archive header, consuming ownership of the input
    /// stream. `check_window` bounds how far the engine may scan while
    /// looking for the header.
    fn open(&mut self, input: Box<dyn InputStream>, check_window: u64) -> Result<()>;

    /// Number of items in the archive. Only meaningful after `open`.
    fn item_count(&self) -> u64;

    /// Fetches one property cell for the item at `index`.
    fn property(&mut self, index: u32, prop: PropId) -> Result<Variant>;

    /// Bulk extraction over `indices` (`None` = every item), driving
    /// `callback` re-entrantly from within this call.
    fn extract(
        &mut self,
        indices: Option<&[u32]>,
        test: bool,
        password: Option<&str>,
        callback: &mut dyn ExtractCallback,
    ) -> Result<()>;

    /// Releases the native handle and the owned input stream. Idempotent.
    fn release(&mut self);
}

/// Factory for format-specific archive readers.
pub trait Engine: Send + Sync {
    fn create_reader(&self, selector: FormatSelector) -> Result<Box<dyn ArchiveReader>>;
}
