use std::io::Read as _;
use std::io::Write as _;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::inflater::Inflater;
use crate::streaming_decoder::StreamingDecoder;
use crate::wrapper::Encoding;

fn compress(encoding: Encoding, data: &[u8]) -> Vec<u8> {
    let level = flate2::Compression::default();
    match encoding {
        Encoding::Raw => {
            let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), level);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        Encoding::Zlib => {
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        Encoding::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), level);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }
}

fn inflate_chunked(encoding: Encoding, compressed: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut inflater = Inflater::new(encoding);
    let mut decoded = Vec::new();
    for chunk in compressed.chunks(chunk_size) {
        decoded.extend(inflater.decompress(chunk).unwrap());
    }
    assert!(inflater.is_finished());
    decoded
}

/// Repetitive input with some noise, so the compressor emits a healthy mix
/// of literals, matches and overlapping runs.
fn generate_data(rng: &mut SmallRng) -> Vec<u8> {
    let words: Vec<Vec<u8>> = (0..8)
        .map(|_| {
            (0..rng.gen_range(1..30))
                .map(|_| rng.gen_range(b'a'..=b'f'))
                .collect()
        })
        .collect();

    let mut data = Vec::new();
    for _ in 0..rng.gen_range(0..300) {
        if rng.gen_range(0..10) == 0 {
            data.push(rng.gen());
        } else {
            data.extend_from_slice(&words[rng.gen_range(0..words.len())]);
        }
    }
    data
}

#[test]
fn chunked_output_matches_single_shot() {
    let mut rng = SmallRng::seed_from_u64(0x0ddba11);
    for round in 0..30 {
        let data = generate_data(&mut rng);
        for encoding in [Encoding::Raw, Encoding::Zlib, Encoding::Gzip] {
            let compressed = compress(encoding, &data);

            let whole = inflate_chunked(encoding, &compressed, compressed.len().max(1));
            assert_eq!(whole, data, "round {} encoding {:?}", round, encoding);

            for chunk_size in [1, 2, 3] {
                let chunked = inflate_chunked(encoding, &compressed, chunk_size);
                assert_eq!(chunked, data, "round {} chunk size {}", round, chunk_size);
            }
        }
    }
}

#[test]
fn random_partitions_do_not_change_the_output() {
    let mut rng = SmallRng::seed_from_u64(0xca11ab1e);
    for _ in 0..30 {
        let data = generate_data(&mut rng);
        let compressed = compress(Encoding::Zlib, &data);

        let mut inflater = Inflater::new(Encoding::Zlib);
        let mut decoded = Vec::new();
        let mut pos = 0;
        while pos < compressed.len() {
            let cut = usize::min(pos + rng.gen_range(1..9), compressed.len());
            decoded.extend(inflater.decompress(&compressed[pos..cut]).unwrap());
            pos = cut;
        }
        assert!(inflater.is_finished());
        assert_eq!(decoded, data);
    }
}

#[test]
fn wrappers_agree_with_raw() {
    let data = b"abaabbbabaababbaababaaaabaaabbbbbaa\n".repeat(3);
    let raw = inflate_chunked(Encoding::Raw, &compress(Encoding::Raw, &data), 1);
    let zlib = inflate_chunked(Encoding::Zlib, &compress(Encoding::Zlib, &data), 1);
    let gzip = inflate_chunked(Encoding::Gzip, &compress(Encoding::Gzip, &data), 1);
    assert_eq!(raw, data);
    assert_eq!(zlib, data);
    assert_eq!(gzip, data);
}

#[test]
fn stored_payload_sizes_round_trip() {
    let mut rng = SmallRng::seed_from_u64(0x5104ed);
    for size in [0usize, 1, 255, 65535, 70_000] {
        let data: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        // level 0 emits stored blocks
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::none());
        encoder.write_all(&data).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate_chunked(Encoding::Zlib, &compressed, 997), data);
    }
}

#[test]
fn large_stream_with_long_range_matches() {
    let mut rng = SmallRng::seed_from_u64(0xb1650_0d);
    let mut data: Vec<u8> = (0..40_000).map(|_| rng.gen_range(b'a'..=b'h')).collect();
    // repeat the head far behind itself so matches reach across the window
    let head = data[..20_000].to_vec();
    data.extend_from_slice(&head);

    let compressed = compress(Encoding::Gzip, &data);
    assert_eq!(inflate_chunked(Encoding::Gzip, &compressed, 4096), data);
    assert_eq!(inflate_chunked(Encoding::Gzip, &compressed, 1), data);
}

#[test]
fn truncated_trailer_suspends_instead_of_failing() {
    let data = b"hello hello hello hello\n";
    let compressed = compress(Encoding::Gzip, data);

    let mut inflater = Inflater::new(Encoding::Gzip);
    let mut decoded = Vec::new();
    decoded.extend(
        inflater
            .decompress(&compressed[..compressed.len() - 1])
            .unwrap(),
    );
    assert_eq!(decoded, data.to_vec());
    assert!(!inflater.is_finished());

    decoded.clear();
    decoded.extend(
        inflater
            .decompress(&compressed[compressed.len() - 1..])
            .unwrap(),
    );
    assert_eq!(decoded, b"");
    assert!(inflater.is_finished());
}

#[test]
fn streaming_decoder_reads_the_decoded_stream() {
    let data = b"the streaming decoder serves the decoded bytes through io::Read".repeat(50);
    let compressed = compress(Encoding::Gzip, &data);

    let mut decoder = StreamingDecoder::new(std::io::Cursor::new(compressed), Encoding::Gzip);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn streaming_decoder_reports_truncation() {
    let data = b"cut off mid stream";
    let compressed = compress(Encoding::Zlib, data);
    let cut = &compressed[..compressed.len() - 2];

    let mut decoder = StreamingDecoder::new(std::io::Cursor::new(cut.to_vec()), Encoding::Zlib);
    let mut decoded = Vec::new();
    let err = decoder.read_to_end(&mut decoded).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}
