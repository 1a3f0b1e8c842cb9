use crate::decoding::bit_reader::{BitReader, GetBitsError};

/// Longest codeword deflate can express. Code lengths are transmitted as
/// values 0..=15, so nothing longer can ever be requested.
pub const MAX_CODE_LENGTH: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum HuffmanTableError {
    #[display(
        fmt = "Code lengths oversubscribe the code space, length {length} does not fit anymore"
    )]
    OverSubscribed { length: usize },
    #[display(
        fmt = "Code lengths leave the code space incomplete, {missing} codes of length {max_length} unassigned"
    )]
    UnderSubscribed { missing: u32, max_length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From, derive_more::Error)]
#[non_exhaustive]
pub enum HuffmanDecodeError {
    #[display(fmt = "{_0}")]
    #[from]
    GetBits(GetBitsError),
    #[display(fmt = "The read bits do not resolve to any assigned codeword")]
    CodeNotAssigned,
}

impl HuffmanDecodeError {
    pub fn ran_out_of_data(&self) -> bool {
        match self {
            HuffmanDecodeError::GetBits(e) => e.ran_out_of_data(),
            HuffmanDecodeError::CodeNotAssigned => false,
        }
    }
}

/// A canonical huffman code, stored as the number of codewords per length
/// plus the symbols ordered by (length, symbol). That pair determines the
/// codeword assignment completely, and keeps a codeword distinct from the
/// same bit pattern at another length.
pub struct HuffmanTable {
    counts: [u16; MAX_CODE_LENGTH + 1],
    symbols: Vec<u16>,
}

impl HuffmanTable {
    /// A table with no codewords assigned at all. Decoding from it always
    /// fails. Deflate needs this for distance codes when a block contains
    /// no back-references.
    pub fn empty() -> HuffmanTable {
        HuffmanTable {
            counts: [0; MAX_CODE_LENGTH + 1],
            symbols: Vec::new(),
        }
    }

    /// Build the canonical code described by `lengths`, where `lengths[sym]`
    /// is the codeword length for `sym` and 0 means the symbol does not occur.
    ///
    /// The lengths must fill the code space exactly. Two exceptions are
    /// accepted: no codewords at all, and a single codeword of length 1
    /// (which some encoders emit for a degenerate alphabet).
    pub fn from_code_lengths(lengths: &[u8]) -> Result<HuffmanTable, HuffmanTableError> {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for len in lengths {
            counts[usize::from(*len)] += 1;
        }
        counts[0] = 0;

        // Walk the code space. Each length doubles the space and uses up one
        // slot per codeword of that length.
        let mut open_codes: i32 = 1;
        for len in 1..=MAX_CODE_LENGTH {
            open_codes <<= 1;
            open_codes -= i32::from(counts[len]);
            if open_codes < 0 {
                return Err(HuffmanTableError::OverSubscribed { length: len });
            }
        }

        let assigned: u16 = counts.iter().sum();
        if open_codes > 0 && assigned != 0 && !(assigned == 1 && counts[1] == 1) {
            return Err(HuffmanTableError::UnderSubscribed {
                missing: open_codes as u32,
                max_length: MAX_CODE_LENGTH,
            });
        }

        // Offset of each length's first symbol in the sorted symbol list
        let mut offsets = [0u16; MAX_CODE_LENGTH + 1];
        for len in 1..MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len];
        }

        let mut symbols = vec![0u16; usize::from(assigned)];
        for (symbol, len) in lengths.iter().enumerate() {
            if *len != 0 {
                symbols[usize::from(offsets[usize::from(*len)])] = symbol as u16;
                offsets[usize::from(*len)] += 1;
            }
        }

        Ok(HuffmanTable { counts, symbols })
    }

    /// Decode one symbol from the reader.
    ///
    /// Codewords are read one bit at a time. The bits still come out of the
    /// source in the usual LSB-first order, but each new bit is appended to
    /// the *right* of the codeword accumulated so far, because huffman
    /// codewords are defined MSB-first within their own length.
    ///
    /// If the source runs dry mid-codeword the already read bits are
    /// returned to the reader, so the whole decode is atomic.
    pub fn decode_symbol(&self, br: &mut BitReader<'_>) -> Result<u16, HuffmanDecodeError> {
        let start = br.bits_consumed();
        let mut code: u32 = 0;
        let mut first: u32 = 0;
        let mut index: u32 = 0;

        for len in 1..=MAX_CODE_LENGTH {
            let bit = match br.get_bits(1) {
                Ok(bit) => bit,
                Err(e) => {
                    br.return_bits(br.bits_consumed() - start);
                    return Err(e.into());
                }
            };
            code |= u32::from(bit);

            let count = u32::from(self.counts[len]);
            if code < first + count {
                return Ok(self.symbols[(index + (code - first)) as usize]);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }

        br.return_bits(br.bits_consumed() - start);
        Err(HuffmanDecodeError::CodeNotAssigned)
    }
}
