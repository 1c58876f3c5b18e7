// Encoding utilities

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Text encoding types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16BE,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Iso8859_1,
        }
    }

    /// Width of the string terminator in this encoding
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16BE => 2,
            TextEncoding::Iso8859_1 | TextEncoding::Utf8 => 1,
        }
    }
}

/// Decode text with specified encoding, dropping trailing NULs
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    let text = match encoding {
        TextEncoding::Iso8859_1 => WINDOWS_1252.decode(data).0,
        TextEncoding::Utf16 => {
            // Detect BOM
            if data.len() < 2 {
                return String::new();
            }
            if data[0..2] == [0xFF, 0xFE] {
                UTF_16LE.decode_without_bom_handling(&data[2..]).0
            } else if data[0..2] == [0xFE, 0xFF] {
                UTF_16BE.decode_without_bom_handling(&data[2..]).0
            } else {
                UTF_16LE.decode_without_bom_handling(data).0
            }
        }
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0,
        TextEncoding::Utf8 => UTF_8.decode(data).0,
    };
    text.trim_end_matches('\0').to_string()
}

/// Split `data` at the first string terminator for `encoding`.
///
/// Returns the bytes before the terminator and the bytes after it. UTF-16
/// terminators must sit on a code unit boundary. Without a terminator the
/// whole input is the string and the rest is empty.
pub fn split_terminated(data: &[u8], encoding: TextEncoding) -> (&[u8], &[u8]) {
    let width = encoding.terminator_len();
    let end = data
        .chunks(width)
        .position(|unit| unit.len() == width && unit.iter().all(|&b| b == 0))
        .map(|i| i * width);

    match end {
        Some(i) => (&data[..i], &data[i + width..]),
        None => (data, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_latin1_and_utf8() {
        assert_eq!(decode_text(b"Caf\xE9", TextEncoding::Iso8859_1), "Café");
        assert_eq!(decode_text("Café\0".as_bytes(), TextEncoding::Utf8), "Café");
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let le = [0xFF, 0xFE, b'H', 0, b'i', 0];
        let be = [0xFE, 0xFF, 0, b'H', 0, b'i'];
        assert_eq!(decode_text(&le, TextEncoding::Utf16), "Hi");
        assert_eq!(decode_text(&be, TextEncoding::Utf16), "Hi");
        assert_eq!(decode_text(&[0, b'H'], TextEncoding::Utf16BE), "H");
    }

    #[test]
    fn splits_single_byte_strings() {
        let (head, tail) = split_terminated(b"desc\0value", TextEncoding::Utf8);
        assert_eq!(head, b"desc");
        assert_eq!(tail, b"value");
    }

    #[test]
    fn splits_utf16_on_aligned_terminator() {
        // 0x00 0x00 straddling two code units must not split
        let data = [b'A', 0, 0, b'B', 0, 0, b'x'];
        let (head, tail) = split_terminated(&data, TextEncoding::Utf16BE);
        assert_eq!(head, &[b'A', 0, 0, b'B']);
        assert_eq!(tail, b"x");
    }

    #[test]
    fn unterminated_takes_everything() {
        let (head, tail) = split_terminated(b"abc", TextEncoding::Iso8859_1);
        assert_eq!(head, b"abc");
        assert!(tail.is_empty());
    }
}
