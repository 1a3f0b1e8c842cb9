use crate::decoding::bit_reader::BitReader;
use crate::decoding::block_decoder::BlockDecoderError;
use crate::decoding::huffman::{HuffmanDecodeError, HuffmanTable};

/// The order in which the code lengths for the code length alphabet are
/// stored in a dynamic block. Symbols likely to be unused come last so the
/// encoder can cut the list short.
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

#[derive(Debug, Clone, Copy)]
struct PreambleHeader {
    num_litlen_codes: u16,
    num_distance_codes: u16,
    num_explicit_lengths: u16,
}

/// Decodes the preamble of a dynamic huffman block: the three count fields,
/// the code length code, and the run-length encoded list of code lengths for
/// the literal/length and distance alphabets.
///
/// Every field read here is a point where the input may run dry, so all
/// progress lives in this struct and [`DynamicPreamble::advance`] picks up
/// exactly where the previous chunk ended.
pub struct DynamicPreamble {
    header: Option<PreambleHeader>,
    code_length_lengths: [u8; 19],
    code_lengths_read: usize,
    code_length_table: HuffmanTable,
    code_length_table_built: bool,
    lengths: Vec<u8>,
    /// A decoded 16/17/18 symbol whose repeat count field has not fully
    /// arrived yet.
    pending_repeat: Option<u16>,
}

impl DynamicPreamble {
    pub fn new() -> DynamicPreamble {
        DynamicPreamble {
            header: None,
            code_length_lengths: [0; 19],
            code_lengths_read: 0,
            code_length_table: HuffmanTable::empty(),
            code_length_table_built: false,
            lengths: Vec::new(),
            pending_repeat: None,
        }
    }

    /// Push the preamble forward as far as the input allows.
    ///
    /// Returns the finished literal/length and distance tables, or `None`
    /// when more input is needed.
    pub fn advance(
        &mut self,
        br: &mut BitReader<'_>,
    ) -> Result<Option<(HuffmanTable, HuffmanTable)>, BlockDecoderError> {
        let header = match self.header {
            Some(header) => header,
            None => {
                // HLIT, HDIST and HCLEN as one read, it fits in 14 bits
                let fields = match br.get_bits(14) {
                    Ok(fields) => fields,
                    Err(e) if e.ran_out_of_data() => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let header = PreambleHeader {
                    num_litlen_codes: (fields & 0x1F) + 257,
                    num_distance_codes: ((fields >> 5) & 0x1F) + 1,
                    num_explicit_lengths: ((fields >> 10) & 0xF) + 4,
                };
                self.header = Some(header);
                header
            }
        };

        while self.code_lengths_read < usize::from(header.num_explicit_lengths) {
            let length = match br.get_bits(3) {
                Ok(length) => length,
                Err(e) if e.ran_out_of_data() => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            self.code_length_lengths[CODE_LENGTH_ORDER[self.code_lengths_read]] = length as u8;
            self.code_lengths_read += 1;
        }

        if !self.code_length_table_built {
            self.code_length_table = HuffmanTable::from_code_lengths(&self.code_length_lengths)?;
            self.code_length_table_built = true;
        }

        let total_lengths =
            usize::from(header.num_litlen_codes) + usize::from(header.num_distance_codes);

        loop {
            if let Some(symbol) = self.pending_repeat {
                let (base, extra_bits) = match symbol {
                    16 => (3u16, 2usize),
                    17 => (3, 3),
                    _ => (11, 7),
                };
                let count = match br.get_bits(extra_bits) {
                    Ok(extra) => usize::from(base + extra),
                    Err(e) if e.ran_out_of_data() => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let fill = if symbol == 16 {
                    match self.lengths.last() {
                        Some(previous) => *previous,
                        None => return Err(BlockDecoderError::RepeatWithoutPrevious),
                    }
                } else {
                    0
                };
                if self.lengths.len() + count > total_lengths {
                    return Err(BlockDecoderError::TooManyCodeLengths {
                        expected: total_lengths,
                    });
                }
                for _ in 0..count {
                    self.lengths.push(fill);
                }
                self.pending_repeat = None;
            } else if self.lengths.len() < total_lengths {
                let symbol = match self.code_length_table.decode_symbol(br) {
                    Ok(symbol) => symbol,
                    Err(e) if e.ran_out_of_data() => return Ok(None),
                    Err(HuffmanDecodeError::CodeNotAssigned) => {
                        return Err(BlockDecoderError::CodeNotAssigned)
                    }
                    Err(HuffmanDecodeError::GetBits(e)) => return Err(e.into()),
                };
                match symbol {
                    0..=15 => self.lengths.push(symbol as u8),
                    16 => {
                        if self.lengths.is_empty() {
                            return Err(BlockDecoderError::RepeatWithoutPrevious);
                        }
                        self.pending_repeat = Some(symbol);
                    }
                    // the code length alphabet has 19 symbols, so this is 17 or 18
                    _ => self.pending_repeat = Some(symbol),
                }
            } else {
                break;
            }
        }

        let split = usize::from(header.num_litlen_codes);
        let literal_table = HuffmanTable::from_code_lengths(&self.lengths[..split])?;
        let distance_table = HuffmanTable::from_code_lengths(&self.lengths[split..])?;
        Ok(Some((literal_table, distance_table)))
    }
}
