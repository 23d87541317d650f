use std::io::{self, Read, Seek, SeekFrom};

use unvault_engine::FormatSelector;

/// Archive formats the catalog knows how to hand to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Zip,
    SevenZip,
    /// Pre-RAR5 archives.
    Rar,
    Rar5,
    Tar,
    GZip,
    BZip2,
    Xz,
    Cab,
    Wim,
    Undefined,
}

impl Format {
    /// The engine-side identifier for this format. `Undefined` has none.
    pub fn selector(self) -> Option<FormatSelector> {
        let id = match self {
            Self::Zip => 0x01,
            Self::BZip2 => 0x02,
            Self::Rar => 0x03,
            Self::SevenZip => 0x07,
            Self::Cab => 0x08,
            Self::Xz => 0x0C,
            Self::Rar5 => 0xCC,
            Self::Wim => 0xE6,
            Self::Tar => 0xEE,
            Self::GZip => 0xEF,
            Self::Undefined => return None,
        };
        Some(FormatSelector(id))
    }
}

/// Extension table. `.rar` is deliberately absent: pre-RAR5 and RAR5
/// share the extension but need different engine selectors, so rar
/// resolution always falls through to the signature table.
const EXTENSIONS: &[(&str, Format)] = &[
    ("zip", Format::Zip),
    ("7z", Format::SevenZip),
    ("tar", Format::Tar),
    ("gz", Format::GZip),
    ("tgz", Format::GZip),
    ("bz2", Format::BZip2),
    ("xz", Format::Xz),
    ("cab", Format::Cab),
    ("wim", Format::Wim),
];

/// Magic signatures at stream offset 0, longest first so a shorter
/// signature never shadows a more specific one (RAR5 vs pre-RAR5).
///
/// Tar has no entry here: its magic sits at offset 257, outside the
/// offset-0 window, so tar is resolved by extension only.
const SIGNATURES: &[(&[u8], Format)] = &[
    (&[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x01, 0x00], Format::Rar5),
    (&[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00], Format::Rar),
    (&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C], Format::SevenZip),
    (&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00], Format::Xz),
    (&[0x4D, 0x53, 0x57, 0x49, 0x4D, 0x00], Format::Wim),
    (&[0x50, 0x4B, 0x03, 0x04], Format::Zip),
    (&[0x4D, 0x53, 0x43, 0x46], Format::Cab),
    (&[0x42, 0x5A, 0x68], Format::BZip2),
    (&[0x1F, 0x8B], Format::GZip),
];

/// Longest registered signature, in bytes.
const MAX_SIGNATURE_LEN: usize = 8;

/// Resolves a format from a file extension (without the dot).
pub fn detect_by_extension(ext: &str) -> Option<Format> {
    EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|&(_, format)| format)
}

/// Resolves a format by sniffing the magic bytes at the current stream
/// position. The position is restored afterward, so detection never
/// consumes the caller's stream.
///
/// Returns `None` when no signature matches or when fewer bytes than the
/// longest registered signature are available; a short prefix is not
/// enough to guess from.
pub fn detect_by_signature<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Format>> {
    let start = reader.stream_position()?;
    let mut header = [0u8; MAX_SIGNATURE_LEN];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    reader.seek(SeekFrom::Start(start))?;

    if filled < MAX_SIGNATURE_LEN {
        return Ok(None);
    }
    Ok(SIGNATURES
        .iter()
        .find(|(sig, _)| header.starts_with(sig))
        .map(|&(_, format)| format))
}
