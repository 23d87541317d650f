//! Session lifecycle and extraction tests against a fake codec engine.

use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use unvault::engine::{
    ArchiveReader, Engine, ExtractCallback, FormatSelector, InputStream, OperationResult, PropId,
    Variant,
};
use unvault::{Error, Format, Session};

const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const RAR4_MAGIC: &[u8] = &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00];
const RAR5_MAGIC: &[u8] = &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x01, 0x00];

#[derive(Clone)]
struct FakeItem {
    path: &'static str,
    is_folder: bool,
    data: &'static [u8],
    crc: Option<u32>,
}

fn file(path: &'static str, data: &'static [u8]) -> FakeItem {
    FakeItem {
        path,
        is_folder: false,
        data,
        crc: None,
    }
}

fn folder(path: &'static str) -> FakeItem {
    FakeItem {
        path,
        is_folder: true,
        data: &[],
        crc: None,
    }
}

/// In-memory engine implementing the full capability surface.
#[derive(Default)]
struct FakeEngine {
    items: Vec<FakeItem>,
    reject_open: bool,
    fail_index: Option<u32>,
    readers_created: Arc<AtomicUsize>,
    property_calls: Arc<AtomicUsize>,
}

impl FakeEngine {
    fn with_items(items: Vec<FakeItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            ..Self::default()
        })
    }
}

impl Engine for FakeEngine {
    fn create_reader(
        &self,
        _selector: FormatSelector,
    ) -> unvault::engine::Result<Box<dyn ArchiveReader>> {
        self.readers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeReader {
            items: self.items.clone(),
            reject_open: self.reject_open,
            fail_index: self.fail_index,
            property_calls: self.property_calls.clone(),
            stream: None,
        }))
    }
}

struct FakeReader {
    items: Vec<FakeItem>,
    reject_open: bool,
    fail_index: Option<u32>,
    property_calls: Arc<AtomicUsize>,
    stream: Option<Box<dyn InputStream>>,
}

impl ArchiveReader for FakeReader {
    fn open(
        &mut self,
        input: Box<dyn InputStream>,
        _check_window: u64,
    ) -> unvault::engine::Result<()> {
        if self.reject_open {
            return Err(unvault::engine::Error::OpenRejected);
        }
        self.stream = Some(input);
        Ok(())
    }

    fn item_count(&self) -> u64 {
        self.items.len() as u64
    }

    fn property(&mut self, index: u32, prop: PropId) -> unvault::engine::Result<Variant> {
        self.property_calls.fetch_add(1, Ordering::SeqCst);
        let item = &self.items[index as usize];
        Ok(match prop {
            PropId::Path => Variant::Str(item.path.to_string()),
            PropId::IsFolder => Variant::Bool(item.is_folder),
            PropId::Size => Variant::U64(item.data.len() as u64),
            PropId::Crc => item.crc.map(Variant::U32).unwrap_or(Variant::Empty),
            PropId::Encrypted | PropId::SplitBefore | PropId::SplitAfter => Variant::Bool(false),
            // Everything else is unset, like a minimal real archive.
            _ => Variant::Empty,
        })
    }

    fn extract(
        &mut self,
        indices: Option<&[u32]>,
        _test: bool,
        _password: Option<&str>,
        callback: &mut dyn ExtractCallback,
    ) -> unvault::engine::Result<()> {
        let selected: Vec<u32> = match indices {
            Some(set) => set.to_vec(),
            None => (0..self.items.len() as u32).collect(),
        };
        let total = selected
            .iter()
            .map(|&i| self.items[i as usize].data.len() as u64)
            .sum();
        callback.set_total(total);

        let mut completed = 0u64;
        for &index in &selected {
            let item = &self.items[index as usize];
            if let Some(sink) = callback.get_stream(index)? {
                // Two writes, to exercise incremental output.
                let half = item.data.len() / 2;
                sink.write_all(&item.data[..half])?;
                sink.write_all(&item.data[half..])?;
            }
            let result = if self.fail_index == Some(index) {
                OperationResult::DataError
            } else {
                OperationResult::Ok
            };
            callback.set_operation_result(index, result);
            completed += item.data.len() as u64;
            callback.set_completed(completed);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.stream = None;
    }
}

/// Seekable stream that records being dropped.
struct TrackedStream {
    inner: Cursor<Vec<u8>>,
    dropped: Arc<AtomicBool>,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for TrackedStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn zip_stream() -> Cursor<Vec<u8>> {
    let mut data = ZIP_MAGIC.to_vec();
    data.resize(64, 0);
    Cursor::new(data)
}

#[test]
fn stream_format_detected_by_signature() {
    let engine = FakeEngine::with_items(vec![]);
    let session = Session::open_stream_with(engine, zip_stream(), None).unwrap();
    assert_eq!(session.format(), Format::Zip);
}

#[test]
fn unknown_stream_is_rejected() {
    let engine = FakeEngine::with_items(vec![]);
    let garbage = Cursor::new(vec![0xDE; 64]);
    let err = Session::open_stream_with(engine, garbage, None).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn missing_path_is_not_found() {
    let engine = FakeEngine::with_items(vec![]);
    let err = Session::open_with(engine, "/no/such/archive.zip", None).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn path_format_detected_by_extension_without_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weird.zip");
    // Garbage content: extension alone must decide.
    fs::write(&path, [0u8; 32]).unwrap();

    let engine = FakeEngine::with_items(vec![]);
    let session = Session::open_with(engine, &path, None).unwrap();
    assert_eq!(session.format(), Format::Zip);
}

#[test]
fn rar_extension_falls_through_to_signature() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::with_items(vec![]);

    let rar5 = dir.path().join("a.rar");
    let mut data = RAR5_MAGIC.to_vec();
    data.resize(32, 0);
    fs::write(&rar5, &data).unwrap();
    let session = Session::open_with(engine.clone(), &rar5, None).unwrap();
    assert_eq!(session.format(), Format::Rar5);

    let rar4 = dir.path().join("b.rar");
    let mut data = RAR4_MAGIC.to_vec();
    data.resize(32, 0);
    fs::write(&rar4, &data).unwrap();
    let session = Session::open_with(engine, &rar4, None).unwrap();
    assert_eq!(session.format(), Format::Rar);
}

#[test]
fn opening_is_lazy_and_entries_are_memoized() {
    let engine = FakeEngine::with_items(vec![
        file("a.txt", b"alpha"),
        file("b.txt", b"bravo"),
    ]);
    let readers = engine.readers_created.clone();
    let queries = engine.property_calls.clone();

    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();
    assert_eq!(readers.load(Ordering::SeqCst), 0, "construction must not open");

    let first: Vec<String> = session
        .entries()
        .unwrap()
        .iter()
        .map(|e| e.path.clone())
        .collect();
    assert_eq!(readers.load(Ordering::SeqCst), 1);
    let queries_after_first = queries.load(Ordering::SeqCst);
    assert!(queries_after_first > 0);

    let second: Vec<String> = session
        .entries()
        .unwrap()
        .iter()
        .map(|e| e.path.clone())
        .collect();
    assert_eq!(first, second);
    assert_eq!(
        queries.load(Ordering::SeqCst),
        queries_after_first,
        "second entries() call must not re-query the engine"
    );
    assert_eq!(readers.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_cells_decode_to_zero_values() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"alpha")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();
    let entry = &session.entries().unwrap()[0];
    assert_eq!(entry.packed_size, 0);
    assert_eq!(entry.crc32, 0);
    assert_eq!(entry.attributes, 0);
    assert_eq!(entry.comment, "");
    assert_eq!(entry.modified, None);
}

#[test]
fn rejected_header_surfaces_open_failed() {
    let engine = Arc::new(FakeEngine {
        reject_open: true,
        ..FakeEngine::default()
    });
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();
    let err = session.entries().unwrap_err();
    assert!(matches!(err, Error::OpenFailed));
    // The session is unusable afterward.
    assert!(matches!(session.entries(), Err(Error::SessionClosed)));
}

#[test]
fn extracts_folder_and_file_entries() {
    const README: &[u8] = &[b'x'; 120];
    let engine = FakeEngine::with_items(vec![
        folder("docs/"),
        FakeItem {
            crc: Some(0xABCD_1234),
            ..file("docs/readme.txt", README)
        },
    ]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    {
        let entries = session.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_folder);
        assert!(entries[1].is_file());
        assert_eq!(entries[1].size, 120);
        assert_eq!(entries[1].crc32, 0xABCD_1234);
        assert_eq!(entries[1].name(), "readme.txt");
    }

    let out = tempfile::tempdir().unwrap();
    session.extract(out.path(), true).unwrap();

    assert!(out.path().join("docs").is_dir());
    let written = fs::read(out.path().join("docs/readme.txt")).unwrap();
    assert_eq!(written.len(), 120);
    assert_eq!(written, README);
}

#[test]
fn overwrite_policy_controls_existing_files() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"new content")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("a.txt");
    fs::write(&dest, b"old content").unwrap();

    session.extract(out.path(), false).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"old content");

    session.extract(out.path(), true).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"new content");
}

#[test]
fn skip_all_resolver_touches_nothing() {
    let engine = FakeEngine::with_items(vec![folder("docs/"), file("docs/a.txt", b"alpha")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    let out = tempfile::tempdir().unwrap();
    session.extract_with(|_| None).unwrap();
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn engine_failure_mid_extract_is_surfaced_after_cleanup() {
    let engine = Arc::new(FakeEngine {
        items: vec![
            file("a.txt", b"aaaa"),
            file("b.txt", b"bbbb"),
            file("c.txt", b"cccc"),
        ],
        fail_index: Some(1),
        ..FakeEngine::default()
    });
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let err = session.extract(out.path(), true).unwrap_err();
    match err {
        Error::Entry { index, result } => {
            assert_eq!(index, 1);
            assert_eq!(result, OperationResult::DataError);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The entry finished before the failure was fully written and its
    // sink released.
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"aaaa");
}

#[test]
fn single_entry_extraction_by_index() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"alpha"), file("b.txt", b"bravo")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("nested/just-b.txt");
    session.extract_entry(1, &dest).unwrap();

    assert_eq!(fs::read(&dest).unwrap(), b"bravo");
    assert!(!out.path().join("a.txt").exists());
}

#[test]
fn single_entry_extraction_into_buffer() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"alpha")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();

    let mut buffer = Vec::new();
    session.extract_entry_to(0, &mut buffer).unwrap();
    assert_eq!(buffer, b"alpha");

    let err = session.extract_entry_to(7, &mut buffer).unwrap_err();
    assert!(matches!(err, Error::InvalidIndex(7)));
}

#[test]
fn teardown_before_open_releases_the_stream() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"alpha")]);
    let dropped = Arc::new(AtomicBool::new(false));
    let stream = TrackedStream {
        inner: zip_stream(),
        dropped: dropped.clone(),
    };

    let session = Session::open_stream_with(engine, stream, None).unwrap();
    assert!(!dropped.load(Ordering::SeqCst));
    drop(session);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn close_is_idempotent() {
    let engine = FakeEngine::with_items(vec![file("a.txt", b"alpha")]);
    let mut session = Session::open_stream_with(engine, zip_stream(), None).unwrap();
    session.entries().unwrap();
    session.close();
    session.close();
    assert!(matches!(session.entries(), Err(Error::SessionClosed)));
}
