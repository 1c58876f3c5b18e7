// CHAP and CTOC frames
//
// CHAP payload:
//   element id       NUL-terminated string
//   start time       u32 BE, milliseconds
//   end time         u32 BE, milliseconds
//   start offset     u32 BE, bytes (0xFFFFFFFF = unset)
//   end offset       u32 BE, bytes (0xFFFFFFFF = unset)
//   sub-frames       optional, until the end of the payload
//
// CTOC payload:
//   element id       NUL-terminated string
//   flags            u8 (0x02 top-level, 0x01 ordered)
//   entry count      u8
//   entries          entry count NUL-terminated element ids
//   sub-frames       optional, until the end of the payload

use std::collections::BTreeMap;
use std::io::Cursor;

use serde::Serialize;
use tracing::{debug, trace};

use super::frames::{frame_ids, FrameData};
use super::v2::{Id3Frame, Version};
use crate::error::{EmbeddedError, Field, Id3Error, Result};
use crate::utils::io::{read_chapter_u32, read_terminated_string, read_u8};

/// Sub-frames nested in a CHAP or CTOC frame, keyed by frame name
pub type EmbeddedFrames = BTreeMap<String, FrameData>;

/// A single chapter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chapter {
    pub element_id: String,
    pub start_time: u32,
    pub end_time: u32,
    pub start_offset: u32,
    pub end_offset: u32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: EmbeddedFrames,
}

impl Chapter {
    /// Chapter title from the nested title frame, or "" when there is none
    pub fn title(&self) -> &str {
        embedded_title(&self.embedded)
    }
}

/// CTOC flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TocFlags {
    pub top_level: bool,
    pub ordered: bool,
}

impl TocFlags {
    pub fn from_byte(byte: u8) -> Self {
        TocFlags {
            top_level: byte & 0x02 != 0,
            ordered: byte & 0x01 != 0,
        }
    }
}

/// A table of contents node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChapterToc {
    pub element_id: String,
    pub flags: TocFlags,
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: EmbeddedFrames,
}

impl ChapterToc {
    /// Title from the nested title frame, or "" when there is none
    pub fn title(&self) -> &str {
        embedded_title(&self.embedded)
    }
}

// TIT2, or TT2 from a 2.2 tag
fn embedded_title(embedded: &EmbeddedFrames) -> &str {
    let frame = embedded
        .get(frame_ids::TITLE)
        .or_else(|| embedded.get(frame_ids::TITLE_V22));
    match frame {
        Some(FrameData::Text(title)) => title,
        _ => "",
    }
}

/// Decode a CHAP payload (frame header already stripped).
///
/// An empty payload decodes to `Chapter::default()`.
pub fn read_chap_frame(b: &[u8], version: Version) -> Result<Chapter> {
    decode_chap(b, version, 0)
}

/// Decode a CTOC payload (frame header already stripped).
pub fn read_ctoc_frame(b: &[u8], version: Version) -> Result<ChapterToc> {
    decode_ctoc(b, version, 0)
}

pub(crate) fn decode_chap(b: &[u8], version: Version, depth: usize) -> Result<Chapter> {
    if b.is_empty() {
        return Ok(Chapter::default());
    }

    let (element_id, mut reader) = split_element_id(b)?;

    let start_time = read_field(&mut reader, Field::StartTime)?;
    let end_time = read_field(&mut reader, Field::EndTime)?;
    let start_offset = read_field(&mut reader, Field::StartOffset)?;
    let end_offset = read_field(&mut reader, Field::EndOffset)?;

    let embedded = read_trailing_frames(&mut reader, version, depth)?;

    Ok(Chapter {
        element_id,
        start_time,
        end_time,
        start_offset,
        end_offset,
        embedded,
    })
}

pub(crate) fn decode_ctoc(b: &[u8], version: Version, depth: usize) -> Result<ChapterToc> {
    let (element_id, mut reader) = split_element_id(b)?;

    let flags = read_u8(&mut reader).map_err(|source| Id3Error::TruncatedField {
        field: Field::Flags,
        source,
    })?;
    let entry_count = read_u8(&mut reader).map_err(|source| Id3Error::TruncatedField {
        field: Field::EntryCount,
        source,
    })?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for index in 0..entry_count as usize {
        let entry = read_terminated_string(&mut reader)
            .map_err(|source| Id3Error::EntryRead { index, source })?;
        entries.push(entry);
    }

    let embedded = read_trailing_frames(&mut reader, version, depth)?;

    Ok(ChapterToc {
        element_id,
        flags: TocFlags::from_byte(flags),
        entries,
        embedded,
    })
}

/// Element id up to the first NUL, and a reader over the bytes after it
fn split_element_id(b: &[u8]) -> Result<(String, Cursor<&[u8]>)> {
    let ix = b
        .iter()
        .position(|&c| c == 0)
        .ok_or(Id3Error::MissingElementIdTerminator)?;
    let element_id = String::from_utf8_lossy(&b[..ix]).into_owned();
    Ok((element_id, Cursor::new(&b[ix + 1..])))
}

fn read_field(reader: &mut Cursor<&[u8]>, field: Field) -> Result<u32> {
    read_chapter_u32(reader).map_err(|source| Id3Error::TruncatedField { field, source })
}

fn read_trailing_frames(reader: &mut Cursor<&[u8]>, version: Version, depth: usize) -> Result<EmbeddedFrames> {
    let remaining = available(reader);
    collect_embedded(reader, remaining, version, depth + 1)
}

fn available(reader: &Cursor<&[u8]>) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

/// Read `remaining` bytes of back-to-back sub-frames.
///
/// Each sub-frame's header-reported size is subtracted from `remaining`; the
/// region must be used up exactly. A later sub-frame replaces an earlier one
/// with the same name.
pub fn read_embedded_frames(
    reader: &mut Cursor<&[u8]>,
    remaining: u64,
    version: Version,
) -> Result<EmbeddedFrames> {
    collect_embedded(reader, remaining, version, 1)
}

fn collect_embedded(
    reader: &mut Cursor<&[u8]>,
    mut remaining: u64,
    version: Version,
    depth: usize,
) -> Result<EmbeddedFrames> {
    let mut frames = EmbeddedFrames::new();

    while remaining > 0 {
        let left = available(reader);
        if remaining > left {
            return Err(EmbeddedError::Underrun {
                declared: remaining,
                available: left,
            }
            .into());
        }

        let frame = Id3Frame::read_nested(reader, version, depth)
            .map_err(|e| EmbeddedError::Frame(Box::new(e)))?
            .ok_or(EmbeddedError::MissingFrame { remaining })?;

        let size = frame.total_size();
        if size > remaining {
            return Err(EmbeddedError::Overrun {
                name: frame.name,
                size,
                remaining,
            }
            .into());
        }
        remaining -= size;
        trace!(frame = %frame.name, size, remaining, "embedded frame");

        if frames.insert(frame.name.clone(), frame.data).is_some() {
            debug!(frame = %frame.name, "embedded frame replaces an earlier one");
        }
    }

    Ok(frames)
}
