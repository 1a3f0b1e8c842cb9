//! The zlib (RFC 1950) and gzip (RFC 1952) containers around a deflate
//! payload.
//!
//! Headers are validated and stripped, trailers are validated against the
//! decoded output. All container metadata (file names, timestamps, OS codes)
//! is discarded once its bytes have been checked.
//!
//! Every parse function works on the undrained input buffer and answers
//! `Ok(None)` while the bytes it needs have not all arrived yet. Nothing is
//! consumed until the whole header or trailer is valid, which is what makes
//! the container layer resumable at arbitrary chunk boundaries.

use core::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::inflater::InflateError;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Compression method id for deflate, the only method either container allows.
pub const METHOD_DEFLATE: u8 = 8;

/// The container the compressed stream is wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// A bare deflate stream, no header and no trailer.
    Raw,
    /// RFC 1950: 2 byte header, Adler-32 trailer.
    Zlib,
    /// RFC 1952: variable header, CRC-32 + length trailer.
    Gzip,
}

impl FromStr for Encoding {
    type Err = InflateError;

    fn from_str(name: &str) -> Result<Encoding, InflateError> {
        match name {
            "raw" | "deflate" => Ok(Encoding::Raw),
            "zlib" => Ok(Encoding::Zlib),
            "gzip" => Ok(Encoding::Gzip),
            other => Err(InflateError::InvalidEncoding {
                got: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum WrapperError {
    #[display(fmt = "Read wrong magic number: {got:#06x}, gzip streams start with 0x1f8b")]
    BadMagicNumber { got: u16 },
    #[display(fmt = "Compression method is {method}, only deflate ({METHOD_DEFLATE}) is defined")]
    UnsupportedMethod { method: u8 },
    #[display(fmt = "CINFO is {cinfo}, window sizes beyond 32KiB are not defined")]
    WindowTooBig { cinfo: u8 },
    #[display(fmt = "CMF/FLG check value failed, {value:#06x} is not divisible by 31")]
    FlagCheckFailed { value: u16 },
    #[display(fmt = "Stream wants a preset dictionary")]
    PresetDictionary,
    #[display(fmt = "Reserved header flags are set: {flags:#04x}")]
    ReservedFlagsSet { flags: u8 },
    #[display(
        fmt = "Header crc16 mismatch, header says {expected:#06x}, computed {computed:#06x}"
    )]
    HeaderChecksumMismatch { expected: u16, computed: u16 },
    #[display(
        fmt = "Trailer checksum mismatch, stream says {expected:#010x}, computed {computed:#010x}"
    )]
    ChecksumMismatch { expected: u32, computed: u32 },
    #[display(
        fmt = "Decoded size mismatch, trailer says {expected} bytes, decoded {computed} bytes"
    )]
    SizeMismatch { expected: u32, computed: u32 },
}

/// Validate the 2 byte zlib header at the start of `input`.
///
/// Returns the number of bytes the header used, or `None` if `input` does
/// not hold the whole header yet.
pub fn parse_zlib_header(input: &[u8]) -> Result<Option<usize>, WrapperError> {
    if input.len() < 2 {
        return Ok(None);
    }
    let cmf = input[0];
    let flg = input[1];

    let method = cmf & 0xF;
    if method != METHOD_DEFLATE {
        return Err(WrapperError::UnsupportedMethod { method });
    }
    let cinfo = cmf >> 4;
    if cinfo > 7 {
        return Err(WrapperError::WindowTooBig { cinfo });
    }

    let check_value = BigEndian::read_u16(&input[0..2]);
    if check_value % 31 != 0 {
        return Err(WrapperError::FlagCheckFailed { value: check_value });
    }
    // FDICT. The dictionary id that would follow is not supported.
    if flg & 0x20 != 0 {
        return Err(WrapperError::PresetDictionary);
    }
    // FLEVEL is a hint about the compressor and irrelevant for decoding.

    Ok(Some(2))
}

/// Validate the 4 byte zlib trailer, the big-endian Adler-32 of the output.
pub fn check_zlib_trailer(input: &[u8], adler32: u32) -> Result<Option<usize>, WrapperError> {
    if input.len() < 4 {
        return Ok(None);
    }
    let expected = BigEndian::read_u32(&input[0..4]);
    if expected != adler32 {
        return Err(WrapperError::ChecksumMismatch {
            expected,
            computed: adler32,
        });
    }
    Ok(Some(4))
}

const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

/// Validate the gzip header at the start of `input` and report how many
/// bytes it spans, or `None` while it is still truncated.
///
/// The optional fields behind the FLG bits are walked in their defined
/// order. Their content is dropped, only the optional header crc16 is
/// actually checked.
pub fn parse_gzip_header(input: &[u8]) -> Result<Option<usize>, WrapperError> {
    if input.len() < 10 {
        return Ok(None);
    }
    if input[0..2] != GZIP_MAGIC {
        return Err(WrapperError::BadMagicNumber {
            got: BigEndian::read_u16(&input[0..2]),
        });
    }
    let method = input[2];
    if method != METHOD_DEFLATE {
        return Err(WrapperError::UnsupportedMethod { method });
    }
    let flags = input[3];
    if flags & 0xE0 != 0 {
        return Err(WrapperError::ReservedFlagsSet { flags });
    }
    // MTIME, XFL and OS carry no information the decoder needs.
    let mut pos = 10;

    if flags & FEXTRA != 0 {
        if input.len() < pos + 2 {
            return Ok(None);
        }
        let xlen = usize::from(LittleEndian::read_u16(&input[pos..pos + 2]));
        pos += 2;
        if input.len() < pos + xlen {
            return Ok(None);
        }
        pos += xlen;
    }

    if flags & FNAME != 0 {
        match input[pos..].iter().position(|byte| *byte == 0) {
            Some(end) => pos += end + 1,
            None => return Ok(None),
        }
    }

    if flags & FCOMMENT != 0 {
        match input[pos..].iter().position(|byte| *byte == 0) {
            Some(end) => pos += end + 1,
            None => return Ok(None),
        }
    }

    if flags & FHCRC != 0 {
        if input.len() < pos + 2 {
            return Ok(None);
        }
        let expected = LittleEndian::read_u16(&input[pos..pos + 2]);
        let computed = (crc32fast::hash(&input[..pos]) & 0xFFFF) as u16;
        if expected != computed {
            return Err(WrapperError::HeaderChecksumMismatch { expected, computed });
        }
        pos += 2;
    }

    Ok(Some(pos))
}

/// Validate the 8 byte gzip trailer: little-endian CRC-32 of the output,
/// then the output length mod 2^32.
pub fn check_gzip_trailer(
    input: &[u8],
    crc32: u32,
    total_output: u64,
) -> Result<Option<usize>, WrapperError> {
    if input.len() < 8 {
        return Ok(None);
    }
    let expected_crc = LittleEndian::read_u32(&input[0..4]);
    if expected_crc != crc32 {
        return Err(WrapperError::ChecksumMismatch {
            expected: expected_crc,
            computed: crc32,
        });
    }
    let expected_size = LittleEndian::read_u32(&input[4..8]);
    let actual_size = total_output as u32;
    if expected_size != actual_size {
        return Err(WrapperError::SizeMismatch {
            expected: expected_size,
            computed: actual_size,
        });
    }
    Ok(Some(8))
}
