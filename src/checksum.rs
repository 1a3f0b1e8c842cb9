//! Rolling checksums over the decompressed output.
//!
//! The zlib container seals its payload with Adler-32, gzip with CRC-32.
//! Both are fed incrementally as bytes are decoded, so the trailer can be
//! checked the moment it arrives.

use simd_adler32::Adler32;

/// The checksum a container demands over the decoded bytes.
pub enum StreamHash {
    /// Raw deflate has no trailer and hashes nothing.
    None,
    Adler32(Adler32),
    Crc32(crc32fast::Hasher),
}

impl StreamHash {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamHash::None => {}
            StreamHash::Adler32(hash) => hash.write(data),
            StreamHash::Crc32(hash) => hash.update(data),
        }
    }

    /// The digest over everything fed so far. Does not reset the state.
    pub fn value(&self) -> u32 {
        match self {
            StreamHash::None => 0,
            StreamHash::Adler32(hash) => hash.finish(),
            StreamHash::Crc32(hash) => hash.clone().finalize(),
        }
    }
}
