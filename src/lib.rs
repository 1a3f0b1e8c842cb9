#![deny(trivial_casts, trivial_numeric_casts, rust_2018_idioms)]

//! A pure rust streaming decoder for the deflate compressed data format
//! (RFC 1951) and its zlib (RFC 1950) and gzip (RFC 1952) containers.
//!
//! The core type is [`Inflater`], which accepts the compressed stream in
//! chunks of arbitrary size and hands back the decompressed bytes as they
//! become decodable. [`StreamingDecoder`] wraps it into a [`std::io::Read`].

pub mod checksum;
pub mod decoding;
pub mod inflater;
pub mod streaming_decoder;
pub mod wrapper;
#[cfg(test)]
mod tests;

pub use inflater::{InflateError, Inflater};
pub use streaming_decoder::StreamingDecoder;
pub use wrapper::Encoding;
