use core::mem;

use crate::decoding::bit_reader::{BitReader, GetBitsError};
use crate::decoding::decodebuffer::{Decodebuffer, DecodebufferError};
use crate::decoding::huffman::{HuffmanDecodeError, HuffmanTable, HuffmanTableError};
use crate::decoding::preamble::DynamicPreamble;

/// Base match lengths for the length codes 257..=285.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
/// Extra bits to add on top of the base length, per length code.
const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
/// Base distances for the distance codes 0..=29.
const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
/// Extra bits to add on top of the base distance, per distance code.
const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// End-of-block marker in the literal/length alphabet.
const END_OF_BLOCK: u16 = 256;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From, derive_more::Error)]
#[non_exhaustive]
pub enum BlockDecoderError {
    #[display(fmt = "{_0}")]
    #[from]
    GetBits(GetBitsError),
    #[display(fmt = "{_0}")]
    #[from]
    HuffmanTable(HuffmanTableError),
    #[display(fmt = "{_0}")]
    #[from]
    Decodebuffer(DecodebufferError),
    #[display(fmt = "The read bits do not resolve to any assigned codeword")]
    CodeNotAssigned,
    #[display(fmt = "Invalid block type {btype}. Block types are 0 (stored), 1 (fixed) and 2 (dynamic)")]
    InvalidBlockType { btype: u8 },
    #[display(fmt = "Stored block length check failed, LEN is {len:#06x} but NLEN is {nlen:#06x}")]
    StoredLengthMismatch { len: u16, nlen: u16 },
    #[display(fmt = "Repeat code 16 occured before any code length was decoded")]
    RepeatWithoutPrevious,
    #[display(fmt = "Code length repeat runs past the announced {expected} code lengths")]
    TooManyCodeLengths { expected: usize },
    #[display(fmt = "Length code {symbol} is reserved and must not occur in a stream")]
    InvalidLengthCode { symbol: u16 },
    #[display(fmt = "Distance code {symbol} is reserved and must not occur in a stream")]
    InvalidDistanceCode { symbol: u16 },
}

impl BlockDecoderError {
    /// True when decoding stopped only because the input ran dry. The driver
    /// turns this into a suspension instead of surfacing an error.
    pub fn ran_out_of_data(&self) -> bool {
        match self {
            BlockDecoderError::GetBits(e) => e.ran_out_of_data(),
            _ => false,
        }
    }
}

/// Which kind of code tables a huffman block body runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The tables fixed by the format, no preamble.
    Fixed,
    /// Tables transmitted in the block preamble.
    Dynamic,
}

/// Decoding position inside the body of a huffman block.
///
/// A back-reference is decoded in up to four reads (length code, length
/// extra bits, distance code, distance extra bits) and the input may run dry
/// between any two of them. Whatever is already resolved is parked in the
/// `pending_*` fields until the rest arrives.
pub struct SequenceState {
    pub kind: TableKind,
    pub literal_table: HuffmanTable,
    pub distance_table: HuffmanTable,
    pub pending_length: Option<u16>,
    pub pending_extra_for_length: Option<u8>,
    pub pending_distance: Option<u16>,
    pub pending_extra_for_distance: Option<u8>,
}

impl SequenceState {
    fn new(kind: TableKind, literal_table: HuffmanTable, distance_table: HuffmanTable) -> Self {
        SequenceState {
            kind,
            literal_table,
            distance_table,
            pending_length: None,
            pending_extra_for_length: None,
            pending_distance: None,
            pending_extra_for_distance: None,
        }
    }

    fn new_fixed() -> Result<Self, HuffmanTableError> {
        let mut literal_lengths = [0u8; 288];
        literal_lengths[0..144].fill(8);
        literal_lengths[144..256].fill(9);
        literal_lengths[256..280].fill(7);
        literal_lengths[280..288].fill(8);
        let distance_lengths = [5u8; 32];

        Ok(SequenceState::new(
            TableKind::Fixed,
            HuffmanTable::from_code_lengths(&literal_lengths)?,
            HuffmanTable::from_code_lengths(&distance_lengths)?,
        ))
    }
}

/// Where block decoding was left off when the previous chunk ran out.
pub enum BlockState {
    /// The next bit is the first bit of a block header.
    AtBlockHeader,
    /// Inside the payload of a stored block.
    InStored { remaining: u32 },
    /// Inside the code length preamble of a dynamic block.
    InDynamicPreamble(DynamicPreamble),
    /// Inside the symbol stream of a fixed or dynamic block.
    InHuffmanBody(SequenceState),
}

pub enum BlockProgress {
    /// The input ran dry. All progress is parked in the block state.
    NeedMoreInput,
    /// The final block has been fully decoded.
    Finished,
}

enum BodyProgress {
    NeedMoreInput,
    EndOfBlock,
}

/// Decodes the sequence of deflate blocks that makes up a stream.
pub struct BlockDecoder {
    state: BlockState,
    last_block: bool,
}

impl BlockDecoder {
    pub fn new() -> BlockDecoder {
        BlockDecoder {
            state: BlockState::AtBlockHeader,
            last_block: false,
        }
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    /// Decode blocks until either the final block is done or the input runs
    /// dry. Decoded bytes go into `buffer`.
    pub fn decode(
        &mut self,
        br: &mut BitReader<'_>,
        buffer: &mut Decodebuffer,
    ) -> Result<BlockProgress, BlockDecoderError> {
        loop {
            match mem::replace(&mut self.state, BlockState::AtBlockHeader) {
                BlockState::AtBlockHeader => {
                    let checkpoint = br.bits_consumed();
                    match self.read_block_header(br) {
                        Ok(state) => self.state = state,
                        Err(e) if e.ran_out_of_data() => {
                            // the header reads are atomic as a group
                            br.return_bits(br.bits_consumed() - checkpoint);
                            return Ok(BlockProgress::NeedMoreInput);
                        }
                        Err(e) => return Err(e),
                    }
                }

                BlockState::InStored { remaining } => {
                    let available = br.remaining_bytes();
                    let copy = usize::min(remaining as usize, available.len());
                    buffer.push(&available[..copy]);
                    br.consume_bytes(copy);

                    let remaining = remaining - copy as u32;
                    if remaining > 0 {
                        self.state = BlockState::InStored { remaining };
                        return Ok(BlockProgress::NeedMoreInput);
                    }
                    if self.last_block {
                        return Ok(BlockProgress::Finished);
                    }
                }

                BlockState::InDynamicPreamble(mut preamble) => match preamble.advance(br)? {
                    Some((literal_table, distance_table)) => {
                        self.state = BlockState::InHuffmanBody(SequenceState::new(
                            TableKind::Dynamic,
                            literal_table,
                            distance_table,
                        ));
                    }
                    None => {
                        self.state = BlockState::InDynamicPreamble(preamble);
                        return Ok(BlockProgress::NeedMoreInput);
                    }
                },

                BlockState::InHuffmanBody(mut sequences) => {
                    match Self::decode_huffman_body(&mut sequences, br, buffer)? {
                        BodyProgress::EndOfBlock => {
                            if self.last_block {
                                return Ok(BlockProgress::Finished);
                            }
                        }
                        BodyProgress::NeedMoreInput => {
                            self.state = BlockState::InHuffmanBody(sequences);
                            return Ok(BlockProgress::NeedMoreInput);
                        }
                    }
                }
            }
        }
    }

    /// Read BFINAL and BTYPE and, for a stored block, the LEN/NLEN pair.
    /// The caller rolls the reader back if any of it is missing, so the
    /// whole header restarts cleanly on the next chunk.
    fn read_block_header(&mut self, br: &mut BitReader<'_>) -> Result<BlockState, BlockDecoderError> {
        let header = br.get_bits(3)?;
        let last_block = header & 1 == 1;

        let state = match header >> 1 {
            0 => {
                // stored blocks restart on a byte boundary
                br.align_to_byte();
                let len = br.get_bits(16)?;
                let nlen = br.get_bits(16)?;
                if nlen != !len {
                    return Err(BlockDecoderError::StoredLengthMismatch { len, nlen });
                }
                BlockState::InStored {
                    remaining: u32::from(len),
                }
            }
            1 => BlockState::InHuffmanBody(SequenceState::new_fixed()?),
            2 => BlockState::InDynamicPreamble(DynamicPreamble::new()),
            _ => return Err(BlockDecoderError::InvalidBlockType { btype: 3 }),
        };

        self.last_block = last_block;
        Ok(state)
    }

    fn decode_huffman_body(
        seq: &mut SequenceState,
        br: &mut BitReader<'_>,
        buffer: &mut Decodebuffer,
    ) -> Result<BodyProgress, BlockDecoderError> {
        loop {
            if seq.pending_length.is_none() {
                let symbol = match seq.literal_table.decode_symbol(br) {
                    Ok(symbol) => symbol,
                    Err(e) if e.ran_out_of_data() => return Ok(BodyProgress::NeedMoreInput),
                    Err(HuffmanDecodeError::CodeNotAssigned) => {
                        return Err(BlockDecoderError::CodeNotAssigned)
                    }
                    Err(HuffmanDecodeError::GetBits(e)) => return Err(e.into()),
                };
                match symbol {
                    0..=255 => {
                        buffer.push_byte(symbol as u8);
                        continue;
                    }
                    END_OF_BLOCK => return Ok(BodyProgress::EndOfBlock),
                    257..=285 => {
                        let code = usize::from(symbol - 257);
                        seq.pending_length = Some(LENGTH_BASE[code]);
                        let extra = LENGTH_EXTRA_BITS[code];
                        if extra > 0 {
                            seq.pending_extra_for_length = Some(extra);
                        }
                    }
                    _ => return Err(BlockDecoderError::InvalidLengthCode { symbol }),
                }
            }

            if let Some(extra_bits) = seq.pending_extra_for_length {
                let extra = match br.get_bits(usize::from(extra_bits)) {
                    Ok(extra) => extra,
                    Err(e) if e.ran_out_of_data() => return Ok(BodyProgress::NeedMoreInput),
                    Err(e) => return Err(e.into()),
                };
                if let Some(length) = seq.pending_length.as_mut() {
                    *length += extra;
                }
                seq.pending_extra_for_length = None;
            }

            if seq.pending_distance.is_none() {
                let symbol = match seq.distance_table.decode_symbol(br) {
                    Ok(symbol) => symbol,
                    Err(e) if e.ran_out_of_data() => return Ok(BodyProgress::NeedMoreInput),
                    Err(HuffmanDecodeError::CodeNotAssigned) => {
                        return Err(BlockDecoderError::CodeNotAssigned)
                    }
                    Err(HuffmanDecodeError::GetBits(e)) => return Err(e.into()),
                };
                if symbol > 29 {
                    return Err(BlockDecoderError::InvalidDistanceCode { symbol });
                }
                let code = usize::from(symbol);
                seq.pending_distance = Some(DISTANCE_BASE[code]);
                let extra = DISTANCE_EXTRA_BITS[code];
                if extra > 0 {
                    seq.pending_extra_for_distance = Some(extra);
                }
            }

            if let Some(extra_bits) = seq.pending_extra_for_distance {
                let extra = match br.get_bits(usize::from(extra_bits)) {
                    Ok(extra) => extra,
                    Err(e) if e.ran_out_of_data() => return Ok(BodyProgress::NeedMoreInput),
                    Err(e) => return Err(e.into()),
                };
                if let Some(distance) = seq.pending_distance.as_mut() {
                    *distance += extra;
                }
                seq.pending_extra_for_distance = None;
            }

            if let (Some(length), Some(distance)) = (seq.pending_length, seq.pending_distance) {
                buffer.repeat(usize::from(distance), usize::from(length))?;
                seq.pending_length = None;
                seq.pending_distance = None;
            }
        }
    }
}

impl Default for BlockDecoder {
    fn default() -> Self {
        BlockDecoder::new()
    }
}
