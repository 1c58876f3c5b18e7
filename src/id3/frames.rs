// ID3 frame definitions and parsers

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::chapters::{self, Chapter, ChapterToc};
use super::v2::Version;
use crate::error::{Id3Error, Result};
use crate::utils::encoding::{decode_text, split_terminated, TextEncoding};

/// Chapter frames nested deeper than this stay undecoded
pub const MAX_EMBED_DEPTH: usize = 4;

/// Common ID3v2 frame identifiers
pub mod frame_ids {
    pub const TITLE: &str = "TIT2"; // Title/songname/content description
    pub const TITLE_V22: &str = "TT2";
    pub const CHAPTER: &str = "CHAP"; // Chapter
    pub const TABLE_OF_CONTENTS: &str = "CTOC"; // Table of contents
}

/// Decoded payload of a frame, by frame kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FrameData {
    Text(String),
    UserText {
        description: String,
        value: String,
    },
    Url(String),
    UserUrl {
        description: String,
        url: String,
    },
    Comment {
        language: String,
        description: String,
        text: String,
    },
    Picture(Picture),
    Chapter(Box<Chapter>),
    ChapterToc(Box<ChapterToc>),
    Binary(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
}

/// Picture types shared by APIC and PIC frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    Other = 0,
    FileIcon = 1,
    OtherFileIcon = 2,
    CoverFront = 3,
    CoverBack = 4,
    LeafletPage = 5,
    Media = 6,
    LeadArtist = 7,
    Artist = 8,
    Conductor = 9,
    Band = 10,
    Composer = 11,
    Lyricist = 12,
    RecordingLocation = 13,
    DuringRecording = 14,
    DuringPerformance = 15,
    VideoScreenCapture = 16,
    BrightColouredFish = 17,
    Illustration = 18,
    BandLogo = 19,
    PublisherLogo = 20,
}

impl PictureType {
    pub fn from_byte(value: u8) -> Self {
        match value {
            1 => PictureType::FileIcon,
            2 => PictureType::OtherFileIcon,
            3 => PictureType::CoverFront,
            4 => PictureType::CoverBack,
            5 => PictureType::LeafletPage,
            6 => PictureType::Media,
            7 => PictureType::LeadArtist,
            8 => PictureType::Artist,
            9 => PictureType::Conductor,
            10 => PictureType::Band,
            11 => PictureType::Composer,
            12 => PictureType::Lyricist,
            13 => PictureType::RecordingLocation,
            14 => PictureType::DuringRecording,
            15 => PictureType::DuringPerformance,
            16 => PictureType::VideoScreenCapture,
            17 => PictureType::BrightColouredFish,
            18 => PictureType::Illustration,
            19 => PictureType::BandLogo,
            20 => PictureType::PublisherLogo,
            _ => PictureType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PictureType::Other => "Other",
            PictureType::FileIcon => "File Icon",
            PictureType::OtherFileIcon => "Other File Icon",
            PictureType::CoverFront => "Cover (front)",
            PictureType::CoverBack => "Cover (back)",
            PictureType::LeafletPage => "Leaflet page",
            PictureType::Media => "Media",
            PictureType::LeadArtist => "Lead artist",
            PictureType::Artist => "Artist",
            PictureType::Conductor => "Conductor",
            PictureType::Band => "Band",
            PictureType::Composer => "Composer",
            PictureType::Lyricist => "Lyricist",
            PictureType::RecordingLocation => "Recording Location",
            PictureType::DuringRecording => "During recording",
            PictureType::DuringPerformance => "During performance",
            PictureType::VideoScreenCapture => "Video screen capture",
            PictureType::BrightColouredFish => "Bright coloured fish",
            PictureType::Illustration => "Illustration",
            PictureType::BandLogo => "Band logo",
            PictureType::PublisherLogo => "Publisher logo",
        }
    }
}

impl Serialize for PictureType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Attached picture (APIC, or PIC in 2.2)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Picture {
    pub mime_type: String,
    pub picture_type: PictureType,
    pub description: String,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

impl FrameData {
    /// Decode a frame payload by frame name
    pub fn decode(name: &str, payload: &[u8], version: Version) -> Result<Self> {
        Self::decode_nested(name, payload, version, 0)
    }

    pub(crate) fn decode_nested(name: &str, payload: &[u8], version: Version, depth: usize) -> Result<Self> {
        match name {
            frame_ids::CHAPTER | frame_ids::TABLE_OF_CONTENTS if depth >= MAX_EMBED_DEPTH => {
                debug!(frame = name, depth, "chapter frame nested too deep, keeping raw payload");
                Ok(FrameData::Binary(payload.to_vec()))
            }
            frame_ids::CHAPTER => Ok(FrameData::Chapter(Box::new(chapters::decode_chap(payload, version, depth)?))),
            frame_ids::TABLE_OF_CONTENTS => Ok(FrameData::ChapterToc(Box::new(chapters::decode_ctoc(
                payload, version, depth,
            )?))),
            "TXXX" | "TXX" => {
                let (description, value) = decode_described(name, payload)?;
                Ok(FrameData::UserText { description, value })
            }
            "WXXX" | "WXX" => {
                let (description, url) = decode_described(name, payload)?;
                Ok(FrameData::UserUrl { description, url })
            }
            "COMM" | "COM" | "USLT" | "ULT" => decode_comment(name, payload),
            "APIC" => decode_picture(name, payload, false),
            "PIC" => decode_picture(name, payload, true),
            _ if name.starts_with('T') => Ok(FrameData::Text(decode_text_frame(payload))),
            _ if name.starts_with('W') => Ok(FrameData::Url(decode_text(payload, TextEncoding::Iso8859_1))),
            _ => Ok(FrameData::Binary(payload.to_vec())),
        }
    }
}

/// Decode text frame data
pub fn decode_text_frame(data: &[u8]) -> String {
    match data.split_first() {
        Some((&encoding, text)) => decode_text(text, TextEncoding::from_byte(encoding)),
        None => String::new(),
    }
}

fn malformed(name: &str, reason: &'static str) -> Id3Error {
    Id3Error::MalformedFrame {
        name: name.to_string(),
        reason,
    }
}

// encoding, terminated description, remainder
fn decode_described(name: &str, payload: &[u8]) -> Result<(String, String)> {
    let (&encoding, rest) = payload
        .split_first()
        .ok_or_else(|| malformed(name, "missing text encoding"))?;
    let encoding = TextEncoding::from_byte(encoding);
    let (description, value) = split_terminated(rest, encoding);

    // WXXX urls are always ISO-8859-1
    let value_encoding = if name.starts_with('W') { TextEncoding::Iso8859_1 } else { encoding };
    Ok((decode_text(description, encoding), decode_text(value, value_encoding)))
}

fn decode_comment(name: &str, payload: &[u8]) -> Result<FrameData> {
    if payload.len() < 4 {
        return Err(malformed(name, "shorter than encoding and language"));
    }
    let encoding = TextEncoding::from_byte(payload[0]);
    let language = String::from_utf8_lossy(&payload[1..4]).into_owned();
    let (description, text) = split_terminated(&payload[4..], encoding);

    Ok(FrameData::Comment {
        language,
        description: decode_text(description, encoding),
        text: decode_text(text, encoding),
    })
}

fn decode_picture(name: &str, payload: &[u8], image_format: bool) -> Result<FrameData> {
    let (&encoding, rest) = payload
        .split_first()
        .ok_or_else(|| malformed(name, "missing text encoding"))?;
    let encoding = TextEncoding::from_byte(encoding);

    let (mime_type, rest) = if image_format {
        if rest.len() < 3 {
            return Err(malformed(name, "missing image format"));
        }
        (mime_from_image_format(&rest[..3]), &rest[3..])
    } else {
        let (mime, rest) = split_terminated(rest, TextEncoding::Iso8859_1);
        (decode_text(mime, TextEncoding::Iso8859_1), rest)
    };

    let (&picture_type, rest) = rest
        .split_first()
        .ok_or_else(|| malformed(name, "missing picture type"))?;
    let (description, data) = split_terminated(rest, encoding);

    Ok(FrameData::Picture(Picture {
        mime_type,
        picture_type: PictureType::from_byte(picture_type),
        description: decode_text(description, encoding),
        data: data.to_vec(),
    }))
}

fn mime_from_image_format(format: &[u8]) -> String {
    match format.to_ascii_uppercase().as_slice() {
        b"JPG" => "image/jpeg".to_string(),
        b"PNG" => "image/png".to_string(),
        b"GIF" => "image/gif".to_string(),
        b"BMP" => "image/bmp".to_string(),
        other => format!("image/{}", String::from_utf8_lossy(other).to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_frames() {
        let data = FrameData::decode("TIT2", b"\x03Intro\0", Version::V24).unwrap();
        assert_eq!(data, FrameData::Text("Intro".into()));
        assert_eq!(FrameData::decode("TIT2", b"", Version::V23).unwrap(), FrameData::Text(String::new()));
    }

    #[test]
    fn user_text_and_urls() {
        let data = FrameData::decode("TXXX", b"\x00key\0value", Version::V23).unwrap();
        assert_eq!(
            data,
            FrameData::UserText {
                description: "key".into(),
                value: "value".into()
            }
        );

        let data = FrameData::decode("WOAR", b"https://example.com", Version::V23).unwrap();
        assert_eq!(data, FrameData::Url("https://example.com".into()));

        // UTF-16 description, Latin-1 url
        let payload = [0x01, 0xFF, 0xFE, b'd', 0, 0, 0, b'h', b't', b't', b'p'];
        let data = FrameData::decode("WXXX", &payload, Version::V23).unwrap();
        assert_eq!(
            data,
            FrameData::UserUrl {
                description: "d".into(),
                url: "http".into()
            }
        );
    }

    #[test]
    fn comment_frame() {
        let data = FrameData::decode("COMM", b"\x03engshort\0Long text", Version::V24).unwrap();
        assert_eq!(
            data,
            FrameData::Comment {
                language: "eng".into(),
                description: "short".into(),
                text: "Long text".into()
            }
        );

        let err = FrameData::decode("COMM", b"\x03en", Version::V24).unwrap_err();
        assert!(matches!(err, Id3Error::MalformedFrame { .. }));
    }

    #[test]
    fn attached_pictures() {
        let payload = b"\x00image/png\0\x03cover\0\x89PNG";
        let data = FrameData::decode("APIC", payload, Version::V23).unwrap();
        assert_eq!(
            data,
            FrameData::Picture(Picture {
                mime_type: "image/png".into(),
                picture_type: PictureType::CoverFront,
                description: "cover".into(),
                data: b"\x89PNG".to_vec(),
            })
        );

        let data = FrameData::decode("PIC", b"\x00JPG\x04\0\xFF\xD8", Version::V22).unwrap();
        match data {
            FrameData::Picture(p) => {
                assert_eq!(p.mime_type, "image/jpeg");
                assert_eq!(p.picture_type, PictureType::CoverBack);
                assert_eq!(p.data, vec![0xFF, 0xD8]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_frames_stay_binary() {
        let data = FrameData::decode("PRIV", b"\x01\x02", Version::V23).unwrap();
        assert_eq!(data, FrameData::Binary(vec![1, 2]));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(FrameData::Text("Intro".into())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "value": "Intro"}));

        let json = serde_json::to_value(FrameData::Binary(vec![1, 2, 3])).unwrap();
        assert_eq!(json["value"], "AQID");
    }
}
