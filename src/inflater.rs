use simd_adler32::Adler32;

use crate::checksum::StreamHash;
use crate::decoding::bit_reader::BitReader;
use crate::decoding::block_decoder::{BlockDecoder, BlockDecoderError, BlockProgress};
use crate::decoding::decodebuffer::Decodebuffer;
use crate::decoding::huffman::HuffmanTableError;
use crate::wrapper::{self, Encoding, WrapperError};

/// Everything that can go wrong while decoding a stream.
///
/// All of these are fatal: the inflater remembers the first error and keeps
/// returning it for every later call.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum InflateError {
    #[display(fmt = "Unrecognized encoding name: {got}")]
    InvalidEncoding { got: String },
    #[display(fmt = "Malformed header: {reason}")]
    BadHeader { reason: &'static str },
    #[display(fmt = "Compression method {method} is not deflate")]
    UnsupportedMethod { method: u8 },
    #[display(fmt = "Stream wants a preset dictionary, preset dictionaries are not supported")]
    Unsupported,
    #[display(fmt = "Invalid block type {btype}. Block types are 0 (stored), 1 (fixed) and 2 (dynamic)")]
    InvalidBlockType { btype: u8 },
    #[display(fmt = "Invalid huffman code: {reason}")]
    InvalidHuffman { reason: &'static str },
    #[display(fmt = "Invalid back-reference: {reason}")]
    InvalidDistance { reason: &'static str },
    #[display(
        fmt = "Trailer does not match the decoded output, stream says {expected:#010x}, decoder computed {computed:#010x}"
    )]
    ChecksumMismatch { expected: u32, computed: u32 },
    #[display(fmt = "Input supplied after the stream was fully decoded")]
    StreamClosed,
}

/// Where in the overall stream layout the decoder currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NeedHeader,
    NeedBlocks,
    NeedTrailer,
    Done,
}

/// An incremental inflater for deflate streams, optionally wrapped in the
/// zlib or gzip container.
///
/// Compressed bytes are fed in with [`Inflater::decompress`] in chunks of
/// any size, down to a single byte. Chunk boundaries do not have to line up
/// with anything in the compressed format; whenever the input stops in the
/// middle of a field, a codeword or a block, the decoder parks its position
/// and continues seamlessly with the next chunk. Splitting a stream at any
/// point therefore never changes the decoded output.
///
/// ```
/// use ruflate::{Encoding, Inflater};
///
/// // "hello hello hello hello\n", fixed huffman codes
/// let raw = [
///     0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0xc8, 0x40, 0x27, 0xb9, 0x00,
/// ];
///
/// let mut inflater = Inflater::new(Encoding::Raw);
/// let mut output = Vec::new();
/// for byte in raw.iter() {
///     output.extend(inflater.decompress(&[*byte]).unwrap());
/// }
/// assert_eq!(output, b"hello hello hello hello\n");
/// ```
pub struct Inflater {
    encoding: Encoding,
    phase: Phase,
    /// Input received but not yet consumed past the last safe resumption
    /// point. Grows at the back with each chunk, drained at the front as
    /// bytes are committed.
    pending_in: Vec<u8>,
    /// Bits already consumed from the first byte of `pending_in`.
    bit_cursor: usize,
    block_decoder: BlockDecoder,
    buffer: Decodebuffer,
    failed: Option<InflateError>,
}

impl Inflater {
    pub fn new(encoding: Encoding) -> Inflater {
        let hash = match encoding {
            Encoding::Raw => StreamHash::None,
            Encoding::Zlib => StreamHash::Adler32(Adler32::new()),
            Encoding::Gzip => StreamHash::Crc32(crc32fast::Hasher::new()),
        };
        Inflater {
            encoding,
            phase: Phase::NeedHeader,
            pending_in: Vec::new(),
            bit_cursor: 0,
            block_decoder: BlockDecoder::new(),
            buffer: Decodebuffer::new(hash),
            failed: None,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// True once the final block and, for wrapped streams, the trailer have
    /// been consumed and validated. No further output will be produced.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Bytes of decompressed output produced so far over the whole stream.
    pub fn total_output(&self) -> u64 {
        self.buffer.total_output()
    }

    /// Feed the next chunk of the compressed stream and get back the bytes
    /// that could be decoded with it.
    ///
    /// The returned bytes are only the ones produced by *this* call. An
    /// empty result just means the chunk ended inside some compressed
    /// construct; the consumed bytes are not lost. Feeding the same stream
    /// in different chunkings always yields the same concatenated output.
    ///
    /// Once the stream is complete ([`Inflater::is_finished`]), any further
    /// non-empty input fails with [`InflateError::StreamClosed`].
    pub fn decompress(&mut self, chunk: &[u8]) -> Result<Vec<u8>, InflateError> {
        if let Some(e) = &self.failed {
            return Err(e.clone());
        }
        if self.phase == Phase::Done && chunk.is_empty() {
            return Ok(Vec::new());
        }

        self.pending_in.extend_from_slice(chunk);
        match self.run() {
            Ok(()) => Ok(self.buffer.drain()),
            Err(e) => {
                self.failed = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Drive the phases forward until the input runs dry or the stream ends.
    fn run(&mut self) -> Result<(), InflateError> {
        loop {
            match self.phase {
                Phase::NeedHeader => {
                    let parsed = match self.encoding {
                        Encoding::Raw => Some(0),
                        Encoding::Zlib => wrapper::parse_zlib_header(&self.pending_in)
                            .map_err(map_wrapper_error)?,
                        Encoding::Gzip => wrapper::parse_gzip_header(&self.pending_in)
                            .map_err(map_wrapper_error)?,
                    };
                    match parsed {
                        Some(consumed) => {
                            self.pending_in.drain(..consumed);
                            self.phase = Phase::NeedBlocks;
                        }
                        None => return Ok(()),
                    }
                }

                Phase::NeedBlocks => {
                    let mut br = BitReader::new_at(&self.pending_in, self.bit_cursor);
                    let progress = self
                        .block_decoder
                        .decode(&mut br, &mut self.buffer)
                        .map_err(map_block_error)?;
                    match progress {
                        BlockProgress::NeedMoreInput => {
                            let consumed = br.bits_consumed();
                            self.commit(consumed);
                            return Ok(());
                        }
                        BlockProgress::Finished => {
                            // bits after the final block only pad to the byte boundary
                            br.align_to_byte();
                            let consumed = br.bits_consumed();
                            self.commit(consumed);
                            self.phase = match self.encoding {
                                Encoding::Raw => Phase::Done,
                                Encoding::Zlib | Encoding::Gzip => Phase::NeedTrailer,
                            };
                        }
                    }
                }

                Phase::NeedTrailer => {
                    let checked = match self.encoding {
                        Encoding::Raw => Some(0),
                        Encoding::Zlib => wrapper::check_zlib_trailer(
                            &self.pending_in,
                            self.buffer.hash_value(),
                        )
                        .map_err(map_wrapper_error)?,
                        Encoding::Gzip => wrapper::check_gzip_trailer(
                            &self.pending_in,
                            self.buffer.hash_value(),
                            self.buffer.total_output(),
                        )
                        .map_err(map_wrapper_error)?,
                    };
                    match checked {
                        Some(consumed) => {
                            self.pending_in.drain(..consumed);
                            self.phase = Phase::Done;
                        }
                        None => return Ok(()),
                    }
                }

                Phase::Done => {
                    if !self.pending_in.is_empty() {
                        return Err(InflateError::StreamClosed);
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Release the fully consumed bytes from `pending_in` and remember the
    /// bit position within the byte the next read continues at. Consumption
    /// is strictly monotonic, a committed byte is never looked at again.
    fn commit(&mut self, consumed_bits: usize) {
        let whole_bytes = consumed_bits / 8;
        self.pending_in.drain(..whole_bytes);
        self.bit_cursor = consumed_bits % 8;
    }
}

fn map_wrapper_error(e: WrapperError) -> InflateError {
    match e {
        WrapperError::BadMagicNumber { .. } => InflateError::BadHeader {
            reason: "wrong gzip magic number",
        },
        WrapperError::UnsupportedMethod { method } => InflateError::UnsupportedMethod { method },
        WrapperError::WindowTooBig { .. } => InflateError::BadHeader {
            reason: "CINFO larger than 7",
        },
        WrapperError::FlagCheckFailed { .. } => InflateError::BadHeader {
            reason: "CMF/FLG check value is not divisible by 31",
        },
        WrapperError::PresetDictionary => InflateError::Unsupported,
        WrapperError::ReservedFlagsSet { .. } => InflateError::BadHeader {
            reason: "reserved gzip header flags set",
        },
        WrapperError::HeaderChecksumMismatch { .. } => InflateError::BadHeader {
            reason: "gzip header crc16 mismatch",
        },
        WrapperError::ChecksumMismatch { expected, computed } => {
            InflateError::ChecksumMismatch { expected, computed }
        }
        WrapperError::SizeMismatch { expected, computed } => {
            InflateError::ChecksumMismatch { expected, computed }
        }
    }
}

fn map_block_error(e: BlockDecoderError) -> InflateError {
    match e {
        // running dry is handled by suspension, this only fires on misuse
        BlockDecoderError::GetBits(_) => InflateError::BadHeader {
            reason: "unexpected end of input",
        },
        BlockDecoderError::HuffmanTable(HuffmanTableError::OverSubscribed { .. }) => {
            InflateError::InvalidHuffman {
                reason: "code lengths oversubscribe the code space",
            }
        }
        BlockDecoderError::HuffmanTable(HuffmanTableError::UnderSubscribed { .. }) => {
            InflateError::InvalidHuffman {
                reason: "code lengths leave the code space incomplete",
            }
        }
        BlockDecoderError::CodeNotAssigned => InflateError::InvalidHuffman {
            reason: "bits do not resolve to an assigned codeword",
        },
        BlockDecoderError::RepeatWithoutPrevious => InflateError::InvalidHuffman {
            reason: "repeat code with no previous code length",
        },
        BlockDecoderError::TooManyCodeLengths { .. } => InflateError::InvalidHuffman {
            reason: "code length repeat overruns the announced count",
        },
        BlockDecoderError::InvalidBlockType { btype } => InflateError::InvalidBlockType { btype },
        BlockDecoderError::StoredLengthMismatch { .. } => InflateError::BadHeader {
            reason: "stored block NLEN is not the complement of LEN",
        },
        BlockDecoderError::InvalidLengthCode { .. } => InflateError::InvalidDistance {
            reason: "reserved length code",
        },
        BlockDecoderError::InvalidDistanceCode { .. } => InflateError::InvalidDistance {
            reason: "reserved distance code",
        },
        BlockDecoderError::Decodebuffer(_) => InflateError::InvalidDistance {
            reason: "distance reaches back past the start of the output",
        },
    }
}
