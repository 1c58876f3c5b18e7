// ID3v2 tag implementation

use std::fmt;
use std::io::{self, Cursor, Read};

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::chapters::{Chapter, ChapterToc};
use super::frames::FrameData;
use crate::error::{Id3Error, Result};
use crate::utils::io::{parse_synchsafe, read_be_u32, read_synchsafe_u32};

/// ID3v2 revision, selecting the frame header layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V22,
    V23,
    V24,
}

impl Version {
    /// Map the major version byte of the tag header
    pub fn from_major(major: u8) -> Option<Self> {
        match major {
            2 => Some(Version::V22),
            3 => Some(Version::V23),
            4 => Some(Version::V24),
            _ => None,
        }
    }

    pub fn major(self) -> u8 {
        match self {
            Version::V22 => 2,
            Version::V23 => 3,
            Version::V24 => 4,
        }
    }

    /// Size of a frame header in bytes
    pub fn frame_header_size(self) -> u32 {
        match self {
            Version::V22 => 6,
            Version::V23 | Version::V24 => 10,
        }
    }

    fn frame_id_len(self) -> usize {
        match self {
            Version::V22 => 3,
            Version::V23 | Version::V24 => 4,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "2.{}", self.major())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// ID3v2 header structure
#[derive(Debug)]
pub struct Id3v2Header {
    pub version: (u8, u8),
    pub flags: u8,
    pub size: u32,
}

/// ID3v2 tag structure
#[derive(Debug)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    pub version: Version,
    pub frames: Vec<Id3Frame>,
}

/// ID3v2 frame structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Id3Frame {
    pub name: String,
    pub size: u32,
    pub flags: u16,
    pub header_size: u32,
    pub data: FrameData,
}

impl Id3v2Header {
    const HEADER_SIZE: usize = 10;
    const ID: [u8; 3] = [b'I', b'D', b'3'];

    pub const FLAG_UNSYNCHRONISATION: u8 = 0x80;
    pub const FLAG_EXTENDED_HEADER: u8 = 0x40;

    /// Read ID3v2 header from reader
    ///
    /// Returns `None` when the stream does not start with an ID3v2 tag.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut buffer = [0u8; Self::HEADER_SIZE];
        match reader.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        // Check for ID3 identifier
        if buffer[0..3] != Self::ID {
            return Ok(None);
        }

        Ok(Some(Id3v2Header {
            version: (buffer[3], buffer[4]),
            flags: buffer[5],
            size: parse_synchsafe([buffer[6], buffer[7], buffer[8], buffer[9]]),
        }))
    }
}

impl Id3v2Tag {
    /// Read ID3v2 tag from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let header = match Id3v2Header::read(reader)? {
            Some(h) => h,
            None => return Ok(None),
        };

        let version = Version::from_major(header.version.0)
            .ok_or(Id3Error::UnsupportedVersion(header.version.0))?;

        let mut body = Vec::new();
        reader.by_ref().take(header.size as u64).read_to_end(&mut body)?;
        if body.len() < header.size as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("tag declares {} bytes but only {} follow", header.size, body.len()),
            )
            .into());
        }

        // 2.4 frame sizes count stored bytes, so unsynchronisation is undone per frame there
        let unsynchronised = header.flags & Id3v2Header::FLAG_UNSYNCHRONISATION != 0;
        if unsynchronised && version != Version::V24 {
            body = remove_unsynchronisation(&body);
        }

        let mut cursor = Cursor::new(body.as_slice());
        if header.flags & Id3v2Header::FLAG_EXTENDED_HEADER != 0 && version != Version::V22 {
            skip_extended_header(&mut cursor, version)?;
        }

        let frames = read_frames(&mut cursor, version, unsynchronised && version == Version::V24);
        debug!(%version, frames = frames.len(), "read ID3v2 tag");

        Ok(Some(Id3v2Tag {
            header,
            version,
            frames,
        }))
    }

    /// First frame with the given name
    pub fn frame(&self, name: &str) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.name == name)
    }

    /// CHAP frames in tag order
    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.frames.iter().filter_map(|f| match &f.data {
            FrameData::Chapter(chapter) => Some(chapter.as_ref()),
            _ => None,
        })
    }

    /// CTOC frames in tag order
    pub fn tables_of_contents(&self) -> impl Iterator<Item = &ChapterToc> {
        self.frames.iter().filter_map(|f| match &f.data {
            FrameData::ChapterToc(toc) => Some(toc.as_ref()),
            _ => None,
        })
    }
}

/// Walk top-level frames until padding or the end of the body.
///
/// A frame that fails to decode ends the walk; frames read so far are kept.
fn read_frames(cursor: &mut Cursor<&[u8]>, version: Version, unsynchronised: bool) -> Vec<Id3Frame> {
    let header_size = version.frame_header_size() as u64;
    let len = cursor.get_ref().len() as u64;
    let mut frames = Vec::new();

    while len.saturating_sub(cursor.position()) >= header_size {
        let offset = cursor.position();
        match Id3Frame::read_frame(cursor, version, 0, unsynchronised) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {
                debug!(offset, "reached padding");
                break;
            }
            Err(e) => {
                warn!(offset, error = %e, "stopping frame walk");
                break;
            }
        }
    }

    frames
}

fn skip_extended_header(cursor: &mut Cursor<&[u8]>, version: Version) -> Result<()> {
    // 2.3 counts the bytes after the size field, 2.4 includes it
    let skip = match version {
        Version::V24 => read_synchsafe_u32(cursor)?.saturating_sub(4),
        _ => read_be_u32(cursor)?,
    };
    let target = cursor.position() + skip as u64;
    if target > cursor.get_ref().len() as u64 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "extended header overruns tag").into());
    }
    cursor.set_position(target);
    Ok(())
}

/// Drop the 0x00 inserted after every 0xFF byte
pub fn remove_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = 0u8;
    for &b in data {
        if !(prev == 0xFF && b == 0x00) {
            out.push(b);
        }
        prev = b;
    }
    out
}

impl Id3Frame {
    /// 2.4 format flag: the payload is unsynchronised
    pub const FLAG_UNSYNCHRONISATION: u16 = 0x0002;
    /// 2.4 format flag: a 4-byte synchsafe data length precedes the payload
    pub const FLAG_DATA_LENGTH: u16 = 0x0001;

    /// Read ID3v2 frame from reader
    ///
    /// Returns `None` on padding (an all-zero frame id).
    pub fn read<R: Read>(reader: &mut R, version: Version) -> Result<Option<Self>> {
        Self::read_nested(reader, version, 0)
    }

    pub(crate) fn read_nested<R: Read>(
        reader: &mut R,
        version: Version,
        depth: usize,
    ) -> Result<Option<Self>> {
        Self::read_frame(reader, version, depth, false)
    }

    /// `unsynchronised` carries the 2.4 tag-level flag down to each frame
    fn read_frame<R: Read>(
        reader: &mut R,
        version: Version,
        depth: usize,
        unsynchronised: bool,
    ) -> Result<Option<Self>> {
        let header_size = version.frame_header_size();
        let mut buffer = [0u8; 10];
        let header = &mut buffer[..header_size as usize];
        reader.read_exact(header)?;

        let id = &header[..version.frame_id_len()];
        if id.iter().all(|&b| b == 0) {
            return Ok(None);
        }
        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(Id3Error::InvalidFrameId(String::from_utf8_lossy(id).into_owned()));
        }
        let name = String::from_utf8_lossy(id).into_owned();

        // Frame size parsing depends on version
        let (size, flags) = match version {
            Version::V22 => (u32::from_be_bytes([0, header[3], header[4], header[5]]), 0),
            Version::V23 => (
                u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
                u16::from_be_bytes([header[8], header[9]]),
            ),
            Version::V24 => (
                parse_synchsafe([header[4], header[5], header[6], header[7]]),
                u16::from_be_bytes([header[8], header[9]]),
            ),
        };

        let mut payload = Vec::new();
        reader.by_ref().take(size as u64).read_to_end(&mut payload)?;
        if payload.len() < size as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("frame {} declares {} bytes but only {} remain", name, size, payload.len()),
            )
            .into());
        }

        if version == Version::V24 {
            payload = undo_v24_format_flags(&name, payload, flags, unsynchronised)?;
        }

        let data = FrameData::decode_nested(&name, &payload, version, depth)?;

        Ok(Some(Id3Frame {
            name,
            size,
            flags,
            header_size,
            data,
        }))
    }

    /// Bytes the frame occupies on the wire, header included
    pub fn total_size(&self) -> u64 {
        self.header_size as u64 + self.size as u64
    }
}

/// Strip the data length indicator and reverse unsynchronisation of a 2.4 payload
fn undo_v24_format_flags(name: &str, mut payload: Vec<u8>, flags: u16, unsynchronised: bool) -> Result<Vec<u8>> {
    if flags & Id3Frame::FLAG_DATA_LENGTH != 0 {
        if payload.len() < 4 {
            return Err(Id3Error::MalformedFrame {
                name: name.to_string(),
                reason: "missing data length indicator",
            });
        }
        payload.drain(..4);
    }
    if unsynchronised || flags & Id3Frame::FLAG_UNSYNCHRONISATION != 0 {
        payload = remove_unsynchronisation(&payload);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(major: u8, flags: u8, body: &[u8]) -> Vec<u8> {
        let size = body.len() as u32;
        let mut out = vec![b'I', b'D', b'3', major, 0, flags];
        out.extend_from_slice(&[
            ((size >> 21) & 0x7F) as u8,
            ((size >> 14) & 0x7F) as u8,
            ((size >> 7) & 0x7F) as u8,
            (size & 0x7F) as u8,
        ]);
        out.extend_from_slice(body);
        out
    }

    fn v23_frame(id: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = id.as_bytes().to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn non_id3_stream_has_no_tag() {
        let mut cursor = Cursor::new(b"fLaC\0\0\0\0\0\0\0\0".to_vec());
        assert!(Id3v2Tag::read(&mut cursor).unwrap().is_none());

        let mut short = Cursor::new(b"ID".to_vec());
        assert!(Id3v2Tag::read(&mut short).unwrap().is_none());
    }

    #[test]
    fn rejects_unknown_major_version() {
        let bytes = tag(5, 0, &[0; 10]);
        let err = Id3v2Tag::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Id3Error::UnsupportedVersion(5)));
    }

    #[test]
    fn reads_frames_until_padding() {
        let mut body = v23_frame("TIT2", b"\x03Song");
        body.extend(v23_frame("TPE1", b"\x03Band"));
        body.extend_from_slice(&[0; 32]);

        let tag = Id3v2Tag::read(&mut Cursor::new(tag(3, 0, &body))).unwrap().unwrap();
        assert_eq!(tag.version, Version::V23);
        assert_eq!(tag.frames.len(), 2);
        assert_eq!(tag.frame("TPE1").unwrap().data, FrameData::Text("Band".into()));
        assert_eq!(tag.frames[0].total_size(), 15);
    }

    #[test]
    fn bad_frame_keeps_earlier_frames() {
        let mut body = v23_frame("TIT2", b"\x03Song");
        body.extend_from_slice(b"ti t\0\0\0\x01\0\0x");

        let tag = Id3v2Tag::read(&mut Cursor::new(tag(3, 0, &body))).unwrap().unwrap();
        assert_eq!(tag.frames.len(), 1);
    }

    #[test]
    fn skips_extended_header() {
        let mut body = vec![0, 0, 0, 6, 0, 0, 0, 0, 0, 0];
        body.extend(v23_frame("TIT2", b"\x03Song"));

        let tag = Id3v2Tag::read(&mut Cursor::new(tag(3, 0x40, &body))).unwrap().unwrap();
        assert_eq!(tag.frames.len(), 1);
    }

    #[test]
    fn reverses_unsynchronisation() {
        assert_eq!(remove_unsynchronisation(&[0xFF, 0x00, 0xE0, 0x00]), vec![0xFF, 0xE0, 0x00]);

        let mut body = v23_frame("TIT2", &[0x00, b'a', 0xFF, b'b']);
        // Insert the 0x00 a writer adds after 0xFF
        body.insert(body.len() - 1, 0x00);
        let tag = Id3v2Tag::read(&mut Cursor::new(tag(3, 0x80, &body))).unwrap().unwrap();
        assert_eq!(tag.frames[0].data, FrameData::Text("aÿb".into()));
    }

    fn v24_frame(id: &str, flags: u16, payload: &[u8]) -> Vec<u8> {
        let size = payload.len() as u32;
        let mut out = id.as_bytes().to_vec();
        out.extend_from_slice(&[
            ((size >> 21) & 0x7F) as u8,
            ((size >> 14) & 0x7F) as u8,
            ((size >> 7) & 0x7F) as u8,
            (size & 0x7F) as u8,
        ]);
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn v24_unsynchronisation_keeps_frame_boundaries() {
        // Size 5 counts the stored 0x00 after 0xFF
        let mut body = v24_frame("TIT2", 0, &[0x00, b'a', 0xFF, 0x00, b'b']);
        body.extend(v24_frame("TPE1", 0, b"\x03Band"));

        let tag = Id3v2Tag::read(&mut Cursor::new(tag(4, 0x80, &body))).unwrap().unwrap();
        assert_eq!(tag.frames.len(), 2);
        assert_eq!(tag.frames[0].data, FrameData::Text("aÿb".into()));
        assert_eq!(tag.frames[0].total_size(), 15);
        assert_eq!(tag.frame("TPE1").unwrap().data, FrameData::Text("Band".into()));
    }

    #[test]
    fn v24_frame_unsynchronisation_flag() {
        let bytes = v24_frame("TIT2", 0x0002, &[0x00, b'a', 0xFF, 0x00, b'b']);
        let frame = Id3Frame::read(&mut Cursor::new(bytes), Version::V24).unwrap().unwrap();
        assert_eq!(frame.data, FrameData::Text("aÿb".into()));
        assert_eq!(frame.size, 5);
    }

    #[test]
    fn v24_data_length_indicator_is_stripped() {
        let bytes = v24_frame("TIT2", 0x0001, b"\0\0\0\x06\x03Intro");
        let frame = Id3Frame::read(&mut Cursor::new(bytes), Version::V24).unwrap().unwrap();
        assert_eq!(frame.data, FrameData::Text("Intro".into()));
        assert_eq!(frame.total_size(), 20);

        let bytes = v24_frame("TIT2", 0x0001, b"\0\0");
        let err = Id3Frame::read(&mut Cursor::new(bytes), Version::V24).unwrap_err();
        assert!(matches!(err, Id3Error::MalformedFrame { .. }));
    }

    #[test]
    fn v23_ignores_v24_format_flags() {
        let mut cursor = Cursor::new(b"TIT2\0\0\0\x03\0\x01\x03ab".to_vec());
        let frame = Id3Frame::read(&mut cursor, Version::V23).unwrap().unwrap();
        assert_eq!(frame.data, FrameData::Text("ab".into()));
    }

    #[test]
    fn reads_v22_and_v24_frame_headers() {
        let mut cursor = Cursor::new(b"TT2\0\0\x04\x03abc".to_vec());
        let frame = Id3Frame::read(&mut cursor, Version::V22).unwrap().unwrap();
        assert_eq!(frame.name, "TT2");
        assert_eq!(frame.total_size(), 10);

        // 0x01 0x00 synchsafe is 128
        let mut payload = vec![0x03];
        payload.extend(std::iter::repeat(b'x').take(127));
        let mut bytes = b"TIT2\0\0\x01\x00\0\0".to_vec();
        bytes.extend(&payload);
        let frame = Id3Frame::read(&mut Cursor::new(bytes), Version::V24).unwrap().unwrap();
        assert_eq!(frame.size, 128);
    }

    #[test]
    fn lying_frame_size_is_an_error() {
        let mut cursor = Cursor::new(b"TIT2\x7F\xFF\xFF\xFF\0\0\x03abc".to_vec());
        let err = Id3Frame::read(&mut cursor, Version::V23).unwrap_err();
        assert!(matches!(err, Id3Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }
}
