use super::from_hex;
use crate::inflater::Inflater;
use crate::wrapper::Encoding;

/// Feed the whole stream in one call.
fn inflate_all(encoding: Encoding, compressed: &[u8]) -> Vec<u8> {
    let mut inflater = Inflater::new(encoding);
    let decoded = inflater.decompress(compressed).unwrap();
    assert!(inflater.is_finished());
    decoded
}

/// Feed the stream one byte at a time and concatenate the per-call outputs.
fn inflate_byte_wise(encoding: Encoding, compressed: &[u8]) -> Vec<u8> {
    let mut inflater = Inflater::new(encoding);
    let mut decoded = Vec::new();
    for byte in compressed {
        decoded.extend(inflater.decompress(&[*byte]).unwrap());
    }
    assert!(inflater.is_finished());
    decoded
}

#[test]
fn stored_block() {
    let compressed = from_hex("010f00f0fffffefdfcfbfaf9f8f7f6f5f4f3f2f1");
    let expected = from_hex("fffefdfcfbfaf9f8f7f6f5f4f3f2f1");
    assert_eq!(inflate_all(Encoding::Raw, &compressed), expected);
    assert_eq!(inflate_byte_wise(Encoding::Raw, &compressed), expected);
}

#[test]
fn empty_stored_block() {
    let compressed = from_hex("010000ffff");
    assert_eq!(inflate_all(Encoding::Raw, &compressed), b"");
}

#[test]
fn fixed_huffman_block() {
    let compressed = from_hex("cb48cdc9c957c84027b900");
    let expected = b"hello hello hello hello\n".to_vec();
    assert_eq!(inflate_all(Encoding::Raw, &compressed), expected);
    assert_eq!(inflate_byte_wise(Encoding::Raw, &compressed), expected);
}

#[test]
fn dynamic_huffman_block() {
    let compressed = from_hex("1dc6490100001040c0aca37f883d3c202a979d375e1d0c");
    let expected = b"abaabbbabaababbaababaaaabaaabbbbbaa".to_vec();
    assert_eq!(inflate_all(Encoding::Raw, &compressed), expected);
    assert_eq!(inflate_byte_wise(Encoding::Raw, &compressed), expected);
}

/// Two stored blocks in one stream, the first one not final. Decoded one
/// input byte per call, the per-call outputs must concatenate to the
/// original payload.
#[test]
fn multi_block_stream_byte_wise() {
    let payload = b"ccdcbbccdadcbcdacaadbacccdcbbaba";
    let mut compressed = Vec::new();
    // non-final stored block
    compressed.push(0x00);
    compressed.extend_from_slice(&[0x20, 0x00, 0xDF, 0xFF]);
    compressed.extend_from_slice(payload);
    // final stored block
    compressed.push(0x01);
    compressed.extend_from_slice(&[0x20, 0x00, 0xDF, 0xFF]);
    compressed.extend_from_slice(payload);

    let mut expected = payload.to_vec();
    expected.extend_from_slice(payload);
    assert_eq!(expected.len(), 64);

    assert_eq!(inflate_byte_wise(Encoding::Raw, &compressed), expected);
}

#[test]
fn gzip_wrapped_stream() {
    let deflate = from_hex("cb48cdc9c957c84027b900");
    let payload = b"hello hello hello hello\n";

    let mut compressed = vec![0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];
    compressed.extend_from_slice(&deflate);
    compressed.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    compressed.extend_from_slice(&(payload.len() as u32).to_le_bytes());

    assert_eq!(inflate_all(Encoding::Gzip, &compressed), payload.to_vec());
    assert_eq!(
        inflate_byte_wise(Encoding::Gzip, &compressed),
        payload.to_vec()
    );
}

#[test]
fn gzip_header_with_name_and_crc16() {
    let deflate = from_hex("010100feff41");

    let mut header = vec![0x1f, 0x8b, 0x08, 0x0A, 1, 2, 3, 4, 0x02, 0x03];
    header.extend_from_slice(b"some-file.txt\0");
    let crc16 = (crc32fast::hash(&header) & 0xFFFF) as u16;
    header.extend_from_slice(&crc16.to_le_bytes());

    let mut compressed = header;
    compressed.extend_from_slice(&deflate);
    compressed.extend_from_slice(&crc32fast::hash(b"A").to_le_bytes());
    compressed.extend_from_slice(&1u32.to_le_bytes());

    assert_eq!(inflate_all(Encoding::Gzip, &compressed), b"A".to_vec());
    assert_eq!(inflate_byte_wise(Encoding::Gzip, &compressed), b"A".to_vec());
}

#[test]
fn empty_chunks_are_harmless() {
    let compressed = from_hex("cb48cdc9c957c84027b900");
    let mut inflater = Inflater::new(Encoding::Raw);
    let mut decoded = Vec::new();
    decoded.extend(inflater.decompress(&[]).unwrap());
    for byte in &compressed {
        decoded.extend(inflater.decompress(&[*byte]).unwrap());
        decoded.extend(inflater.decompress(&[]).unwrap());
    }
    assert_eq!(decoded, b"hello hello hello hello\n");
    // empty input after the end stays fine
    assert_eq!(inflater.decompress(&[]).unwrap(), b"");
}

#[test]
fn decompress_reports_progress_per_call() {
    let compressed = from_hex("010f00f0fffffefdfcfbfaf9f8f7f6f5f4f3f2f1");
    let mut inflater = Inflater::new(Encoding::Raw);
    // the stored header alone produces nothing
    assert_eq!(inflater.decompress(&compressed[..5]).unwrap(), b"");
    // the first half of the payload comes out as soon as it is in
    assert_eq!(
        inflater.decompress(&compressed[5..12]).unwrap(),
        from_hex("fffefdfcfbfaf9")
    );
    assert_eq!(
        inflater.decompress(&compressed[12..]).unwrap(),
        from_hex("f8f7f6f5f4f3f2f1")
    );
    assert!(inflater.is_finished());
    assert_eq!(inflater.total_output(), 15);
}
