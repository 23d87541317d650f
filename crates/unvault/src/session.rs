use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use unvault_engine::{ArchiveReader, Engine, InputStream, global_engine};

use crate::bridge::ExtractBridge;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::format::{self, Format};
use crate::property;

/// Bytes the engine may scan while validating the archive header.
const HEADER_CHECK_WINDOW: u64 = 1 << 15;

/// Extraction tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Replace existing destination files. Off by default.
    pub overwrite: bool,
    /// Password handed to the engine for encrypted archives.
    pub password: Option<String>,
}

impl ExtractOptions {
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

enum State {
    /// Format selected, stream attached, nothing validated yet.
    Unopened { stream: Box<dyn InputStream> },
    /// Engine accepted the header; the reader owns the stream now.
    Opened { reader: Box<dyn ArchiveReader> },
    Closed,
}

/// One open archive: an input stream, an engine reader handle, and a
/// memoized entry list.
///
/// Opening is lazy (first [`entries`](Self::entries) access) and
/// idempotent. Teardown via [`close`](Self::close) or drop is safe at any
/// point, including before opening ever happened, and never runs twice.
///
/// Sessions are single-threaded: the engine re-enters the callback bridge
/// synchronously during extraction, and nothing here locks.
pub struct Session {
    engine: Arc<dyn Engine>,
    format: Format,
    state: State,
    entries: Option<Vec<Entry>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens an archive file using the process-wide engine.
    ///
    /// With no explicit `format`, detection tries the extension first and
    /// falls back to signature sniffing.
    pub fn open(path: impl AsRef<Path>, format: Option<Format>) -> Result<Self> {
        Self::open_with(engine_handle()?, path, format)
    }

    /// [`open`](Self::open) with an explicit engine.
    pub fn open_with(
        engine: Arc<dyn Engine>,
        path: impl AsRef<Path>,
        format: Option<Format>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let format = match format {
            Some(format) => format,
            None => detect_for_path(path)?,
        };
        let file = File::open(path)?;
        debug!(path = %path.display(), ?format, "archive session created");
        Ok(Self::from_parts(engine, format, Box::new(file)))
    }

    /// Opens an archive from a byte stream using the process-wide engine.
    ///
    /// With no explicit `format`, only signature sniffing is available;
    /// the stream position is restored after the sniff.
    pub fn open_stream<S>(stream: S, format: Option<Format>) -> Result<Self>
    where
        S: Read + Seek + Send + 'static,
    {
        Self::open_stream_with(engine_handle()?, stream, format)
    }

    /// [`open_stream`](Self::open_stream) with an explicit engine.
    pub fn open_stream_with<S>(
        engine: Arc<dyn Engine>,
        mut stream: S,
        format: Option<Format>,
    ) -> Result<Self>
    where
        S: Read + Seek + Send + 'static,
    {
        let format = match format {
            Some(format) => format,
            None => format::detect_by_signature(&mut stream)?.ok_or(Error::UnknownFormat)?,
        };
        debug!(?format, "stream session created");
        Ok(Self::from_parts(engine, format, Box::new(stream)))
    }

    fn from_parts(engine: Arc<dyn Engine>, format: Format, stream: Box<dyn InputStream>) -> Self {
        Self {
            engine,
            format,
            state: State::Unopened { stream },
            entries: None,
        }
    }

    /// The format this session was created with.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The archive's entries, in engine index order.
    ///
    /// The first call transitions the session to its opened state and
    /// materializes the list; later calls return the memoized list
    /// without touching the engine again.
    pub fn entries(&mut self) -> Result<&[Entry]> {
        if self.entries.is_none() {
            self.ensure_open()?;
            let reader = self.reader_mut()?;
            let count = reader.item_count();
            debug!(count, "materializing entry list");
            let mut list = Vec::with_capacity(count as usize);
            for index in 0..count {
                list.push(property::read_entry(reader, index as u32)?);
            }
            self.entries = Some(list);
        }
        Ok(self.entries.as_deref().unwrap_or_default())
    }

    /// Extracts every entry under `out_dir` at its archive-internal path.
    ///
    /// When `overwrite` is false, existing destination files are left
    /// untouched and their entries skipped.
    pub fn extract(&mut self, out_dir: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let options = ExtractOptions::default().overwrite(overwrite);
        self.extract_with_options(out_dir, &options)
    }

    /// [`extract`](Self::extract) with full options.
    pub fn extract_with_options(
        &mut self,
        out_dir: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<()> {
        let out_dir = out_dir.as_ref().to_path_buf();
        let overwrite = options.overwrite;
        self.extract_resolved(
            |entry| {
                let dest = out_dir.join(&entry.path);
                if entry.is_file() && !overwrite && dest.exists() {
                    return None;
                }
                Some(dest)
            },
            options.password.as_deref(),
        )
    }

    /// Extracts with a caller-supplied destination resolver.
    ///
    /// The resolver runs once per entry in index order; returning `None`
    /// skips the entry entirely. Folder entries get their resolved path
    /// created as a directory; file entries get a sink created there,
    /// with parent directories made as needed.
    pub fn extract_with<F>(&mut self, resolver: F) -> Result<()>
    where
        F: FnMut(&Entry) -> Option<PathBuf>,
    {
        self.extract_resolved(resolver, None)
    }

    fn extract_resolved<F>(&mut self, mut resolver: F, password: Option<&str>) -> Result<()>
    where
        F: FnMut(&Entry) -> Option<PathBuf>,
    {
        let entries = self.entries()?.to_vec();
        let mut sinks: Vec<Option<Box<dyn Write>>> = Vec::with_capacity(entries.len());
        for entry in &entries {
            let slot = match resolver(entry) {
                None => None,
                Some(path) if entry.is_folder => {
                    fs::create_dir_all(&path).map_err(|source| {
                        Error::DirectoryCreationFailed {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    None
                }
                Some(path) => Some(create_sink(&path)?),
            };
            sinks.push(slot);
        }
        debug!(
            total = entries.len(),
            selected = sinks.iter().filter(|slot| slot.is_some()).count(),
            "starting extraction"
        );
        self.run_extract(None, sinks, password)
    }

    /// Extracts a single entry to `destination` by its stable index.
    pub fn extract_entry(&mut self, index: u32, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        let is_folder = {
            self.entries()?
                .get(index as usize)
                .ok_or(Error::InvalidIndex(index))?
                .is_folder
        };
        if is_folder {
            return fs::create_dir_all(destination).map_err(|source| {
                Error::DirectoryCreationFailed {
                    path: destination.to_path_buf(),
                    source,
                }
            });
        }
        let mut sink = create_sink(destination)?;
        self.extract_entry_to(index, &mut sink)
    }

    /// Extracts a single entry into any writer (file, buffer, socket).
    pub fn extract_entry_to<W: Write>(&mut self, index: u32, sink: &mut W) -> Result<()> {
        let total = self.entries()?.len();
        if index as usize >= total {
            return Err(Error::InvalidIndex(index));
        }
        let mut sinks: Vec<Option<Box<dyn Write + '_>>> = (0..total).map(|_| None).collect();
        sinks[index as usize] = Some(Box::new(sink));
        self.run_extract(Some(&[index]), sinks, None)
    }

    fn run_extract<'a>(
        &mut self,
        indices: Option<&[u32]>,
        sinks: Vec<Option<Box<dyn Write + 'a>>>,
        password: Option<&str>,
    ) -> Result<()> {
        let reader = self.reader_mut()?;
        let mut bridge = ExtractBridge::new(sinks);
        // The bridge owns every sink from here on and releases each one
        // exactly once, whether the engine call succeeds or not.
        reader
            .extract(indices, false, password, &mut bridge)
            .map_err(|source| Error::Engine { source })?;
        if let Some((index, result)) = bridge.first_failure() {
            return Err(Error::Entry { index, result });
        }
        Ok(())
    }

    /// Lazy one-time transition to the opened state.
    fn ensure_open(&mut self) -> Result<()> {
        if matches!(self.state, State::Opened { .. }) {
            return Ok(());
        }
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Opened { reader } => {
                self.state = State::Opened { reader };
                Ok(())
            }
            State::Closed => Err(Error::SessionClosed),
            State::Unopened { stream } => {
                let selector = self.format.selector().ok_or(Error::UnknownFormat)?;
                let mut reader = self
                    .engine
                    .create_reader(selector)
                    .map_err(|source| Error::Engine { source })?;
                match reader.open(stream, HEADER_CHECK_WINDOW) {
                    Ok(()) => {
                        debug!(format = ?self.format, "archive opened");
                        self.state = State::Opened { reader };
                        Ok(())
                    }
                    Err(err) => {
                        // A rejected header leaves the session closed;
                        // retry means a new session.
                        debug!(error = %err, "header validation rejected the stream");
                        reader.release();
                        Err(Error::OpenFailed)
                    }
                }
            }
        }
    }

    fn reader_mut(&mut self) -> Result<&mut dyn ArchiveReader> {
        match &mut self.state {
            State::Opened { reader } => Ok(reader.as_mut()),
            _ => Err(Error::SessionClosed),
        }
    }

    /// Releases the engine reader handle and the input stream. Idempotent,
    /// and safe when opening never happened.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Opened { mut reader } => reader.release(),
            State::Unopened { stream } => drop(stream),
            State::Closed => {}
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn engine_handle() -> Result<Arc<dyn Engine>> {
    global_engine().map_err(|source| Error::Engine { source })
}

fn detect_for_path(path: &Path) -> Result<Format> {
    if let Some(format) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(format::detect_by_extension)
    {
        return Ok(format);
    }
    let mut file = File::open(path)?;
    format::detect_by_signature(&mut file)?.ok_or(Error::UnknownFormat)
}

fn create_sink(path: &Path) -> Result<Box<dyn Write>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let file = File::create(path).map_err(|source| Error::SinkCreationFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(file))
}
