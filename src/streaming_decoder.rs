use std::io::{Error, ErrorKind, Read};

use crate::inflater::Inflater;
use crate::wrapper::Encoding;

/// High level decoder that implements [`Read`], so the decompressed stream
/// can be consumed with `read_to_end` / `read_exact` or passed on to another
/// library as a source for the decoded content.
///
/// The lower level [`Inflater`] by comparison gives the caller control over
/// chunking and buffering, but needs its `decompress` method called with
/// compressed bytes repeatedly.
///
/// ## Caveat
/// [`StreamingDecoder`] pulls compressed bytes from the inner reader in
/// blocks, so it may read past the end of the compressed stream. Use
/// [`StreamingDecoder::into_inner`] with care when other data follows the
/// stream.
pub struct StreamingDecoder<R: Read> {
    inflater: Inflater,
    source: R,
    decoded: Vec<u8>,
    decoded_pos: usize,
}

impl<R: Read> StreamingDecoder<R> {
    pub fn new(source: R, encoding: Encoding) -> StreamingDecoder<R> {
        StreamingDecoder {
            inflater: Inflater::new(encoding),
            source,
            decoded: Vec::new(),
            decoded_pos: 0,
        }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Gets a mutable reference to the underlying reader.
    ///
    /// It is inadvisable to directly read from the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Destructures this object into the inner reader.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Destructures this object into both the inner reader and the [`Inflater`].
    pub fn into_parts(self) -> (R, Inflater) {
        (self.source, self.inflater)
    }
}

impl<R: Read> Read for StreamingDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        // refill the decoded buffer until something can be served
        while self.decoded_pos == self.decoded.len() && !self.inflater.is_finished() {
            let mut chunk = [0u8; 4096];
            let read = self.source.read(&mut chunk)?;
            if read == 0 {
                return Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    "compressed stream ended mid-way",
                ));
            }
            self.decoded = self
                .inflater
                .decompress(&chunk[..read])
                .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
            self.decoded_pos = 0;
        }

        let available = self.decoded.len() - self.decoded_pos;
        let serve = usize::min(available, buf.len());
        buf[..serve].copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + serve]);
        self.decoded_pos += serve;
        Ok(serve)
    }
}
