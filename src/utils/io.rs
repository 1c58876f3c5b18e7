// Byte-level readers shared by the frame decoders

use std::io::{self, Read};

/// Value the chapter frames use for "unspecified" 32-bit fields
pub const CHAPTER_SENTINEL: u32 = 0xFFFF_FFFF;

/// Read a single byte
pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buffer = [0u8; 1];
    reader.read_exact(&mut buffer)?;
    Ok(buffer[0])
}

/// Read big-endian 32-bit integer
pub fn read_be_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(u32::from_be_bytes(buffer))
}

/// Decode synchsafe 32-bit integer (7 bits per byte)
pub fn parse_synchsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Read synchsafe 32-bit integer
pub fn read_synchsafe_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(parse_synchsafe(buffer))
}

/// Read a 32-bit chapter field, mapping the all-ones sentinel to 0
pub fn read_chapter_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    match read_be_u32(reader)? {
        CHAPTER_SENTINEL => Ok(0),
        n => Ok(n),
    }
}

/// Read a NUL-terminated string.
///
/// The terminator is consumed but not returned. Reaching the end of the
/// stream before a terminator is an `UnexpectedEof` error.
pub fn read_terminated_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut bytes = Vec::new();
    loop {
        match read_u8(reader)? {
            0 => break,
            b => bytes.push(b),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
