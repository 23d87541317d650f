use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

/// Seconds between the FILETIME epoch (1601-01-01) and the Unix epoch.
const FILETIME_UNIX_DIFF_SECS: u64 = 11_644_473_600;

/// A dynamically-tagged property cell returned by the codec engine.
///
/// The engine picks the payload type at runtime per property, so every
/// read goes through a conversion that states the expected type and fails
/// loudly on disagreement. Conversions consume the cell, so whatever the
/// payload owns is dropped on every path, success or failure.
///
/// `Empty` is the engine's "property not stored" sentinel; conversions to
/// scalar types map it to the type's zero value rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Empty,
    Bool(bool),
    U32(u32),
    U64(u64),
    Str(String),
    /// Windows FILETIME: 100 ns ticks since 1601-01-01.
    FileTime(u64),
}

impl Variant {
    /// Name of the runtime tag, for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::Str(_) => "string",
            Self::FileTime(_) => "filetime",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Self::Empty => Ok(String::new()),
            Self::Str(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Empty => Ok(false),
            Self::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }

    pub fn into_u32(self) -> Result<u32> {
        match self {
            Self::Empty => Ok(0),
            Self::U32(v) => Ok(v),
            other => Err(mismatch("u32", &other)),
        }
    }

    /// Engines report sizes as either 32- or 64-bit integers depending on
    /// magnitude, so the narrower tag widens here.
    pub fn into_u64(self) -> Result<u64> {
        match self {
            Self::Empty => Ok(0),
            Self::U32(v) => Ok(u64::from(v)),
            Self::U64(v) => Ok(v),
            other => Err(mismatch("u64", &other)),
        }
    }

    /// Converts a FILETIME payload to `SystemTime`; `Empty` means the
    /// archive did not store this timestamp.
    pub fn into_timestamp(self) -> Result<Option<SystemTime>> {
        match self {
            Self::Empty => Ok(None),
            Self::FileTime(ticks) => Ok(Some(filetime_to_system(ticks))),
            other => Err(mismatch("filetime", &other)),
        }
    }
}

fn mismatch(expected: &'static str, actual: &Variant) -> Error {
    Error::PropertyTypeMismatch {
        expected,
        actual: actual.tag(),
    }
}

fn filetime_to_system(ticks: u64) -> SystemTime {
    let since_1601 = Duration::new(ticks / 10_000_000, ((ticks % 10_000_000) * 100) as u32);
    let epoch_diff = Duration::from_secs(FILETIME_UNIX_DIFF_SECS);
    if since_1601 >= epoch_diff {
        SystemTime::UNIX_EPOCH + (since_1601 - epoch_diff)
    } else {
        SystemTime::UNIX_EPOCH - (epoch_diff - since_1601)
    }
}
