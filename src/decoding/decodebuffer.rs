use crate::checksum::StreamHash;

/// Largest lookback distance deflate can encode. Anything older than this
/// can never be referenced again and may be dropped from the buffer.
pub const MAX_BACK_DISTANCE: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum DecodebufferError {
    #[display(
        fmt = "Back-reference reaches {offset} bytes back but the stream only produced {total_output} bytes so far"
    )]
    NotEnoughBytesInBuffer { offset: usize, total_output: u64 },
}

/// Owns the decompressed history.
///
/// Decoded bytes are appended here and double as the sliding window for
/// back-references. The bytes emitted since the last [`Decodebuffer::drain`]
/// are the tail of the buffer; draining hands them to the caller and then
/// compacts the buffer down to the reachable window so memory stays bounded
/// for long streams.
pub struct Decodebuffer {
    buffer: Vec<u8>,
    /// Index into `buffer` where the bytes of the current decompress call start.
    emit_mark: usize,
    total_output: u64,
    hash: StreamHash,
}

impl Decodebuffer {
    pub fn new(hash: StreamHash) -> Decodebuffer {
        Decodebuffer {
            buffer: Vec::new(),
            emit_mark: 0,
            total_output: 0,
            hash,
        }
    }

    /// Bytes produced over the whole lifetime of the stream.
    pub fn total_output(&self) -> u64 {
        self.total_output
    }

    /// Checksum over everything produced so far.
    pub fn hash_value(&self) -> u32 {
        self.hash.value()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.total_output += data.len() as u64;
        self.hash.update(data);
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
        self.total_output += 1;
        self.hash.update(&[byte]);
    }

    /// Copy `match_length` bytes starting `offset` bytes behind the current
    /// end of the output.
    ///
    /// The copy runs front to back one byte at a time, so a match that is
    /// longer than its offset re-reads bytes written by itself. That is the
    /// run encoding deflate relies on, not a corner case.
    pub fn repeat(&mut self, offset: usize, match_length: usize) -> Result<(), DecodebufferError> {
        if offset as u64 > self.total_output {
            return Err(DecodebufferError::NotEnoughBytesInBuffer {
                offset,
                total_output: self.total_output,
            });
        }

        let mut idx = self.buffer.len() - offset;
        self.buffer.reserve(match_length);
        for _ in 0..match_length {
            let byte = self.buffer[idx];
            self.buffer.push(byte);
            idx += 1;
        }

        let copied_from = self.buffer.len() - match_length;
        self.total_output += match_length as u64;
        let (_, appended) = self.buffer.split_at(copied_from);
        self.hash.update(appended);
        Ok(())
    }

    /// Hand out the bytes produced since the previous drain, then shrink the
    /// buffer to the window every legal back-reference can still reach.
    pub fn drain(&mut self) -> Vec<u8> {
        let emitted = self.buffer[self.emit_mark..].to_vec();
        if self.buffer.len() > MAX_BACK_DISTANCE {
            let cut = self.buffer.len() - MAX_BACK_DISTANCE;
            self.buffer.drain(0..cut);
        }
        self.emit_mark = self.buffer.len();
        emitted
    }
}
