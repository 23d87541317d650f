//! Typed reads over the engine's dynamically-tagged property cells.

use std::time::SystemTime;

use unvault_engine::{ArchiveReader, PropId, Variant};

use crate::entry::Entry;
use crate::error::{Error, Result};

/// Materializes the full metadata record for one item by querying the
/// reader property by property.
pub(crate) fn read_entry(reader: &mut dyn ArchiveReader, index: u32) -> Result<Entry> {
    Ok(Entry {
        path: string_prop(reader, index, PropId::Path)?,
        is_folder: bool_prop(reader, index, PropId::IsFolder)?,
        is_encrypted: bool_prop(reader, index, PropId::Encrypted)?,
        size: u64_prop(reader, index, PropId::Size)?,
        packed_size: u64_prop(reader, index, PropId::PackedSize)?,
        created: time_prop(reader, index, PropId::CreationTime)?,
        modified: time_prop(reader, index, PropId::LastWriteTime)?,
        accessed: time_prop(reader, index, PropId::LastAccessTime)?,
        crc32: u32_prop(reader, index, PropId::Crc)?,
        attributes: u32_prop(reader, index, PropId::Attributes)?,
        comment: string_prop(reader, index, PropId::Comment)?,
        host_os: string_prop(reader, index, PropId::HostOs)?,
        method: string_prop(reader, index, PropId::Method)?,
        split_before: bool_prop(reader, index, PropId::SplitBefore)?,
        split_after: bool_prop(reader, index, PropId::SplitAfter)?,
        index,
    })
}

fn cell(reader: &mut dyn ArchiveReader, index: u32, prop: PropId) -> Result<Variant> {
    reader
        .property(index, prop)
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}

fn string_prop(reader: &mut dyn ArchiveReader, index: u32, prop: PropId) -> Result<String> {
    cell(reader, index, prop)?
        .into_string()
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}

fn bool_prop(reader: &mut dyn ArchiveReader, index: u32, prop: PropId) -> Result<bool> {
    cell(reader, index, prop)?
        .into_bool()
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}

fn u32_prop(reader: &mut dyn ArchiveReader, index: u32, prop: PropId) -> Result<u32> {
    cell(reader, index, prop)?
        .into_u32()
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}

fn u64_prop(reader: &mut dyn ArchiveReader, index: u32, prop: PropId) -> Result<u64> {
    cell(reader, index, prop)?
        .into_u64()
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}

fn time_prop(
    reader: &mut dyn ArchiveReader,
    index: u32,
    prop: PropId,
) -> Result<Option<SystemTime>> {
    cell(reader, index, prop)?
        .into_timestamp()
        .map_err(|source| Error::Property {
            index,
            prop,
            source,
        })
}
