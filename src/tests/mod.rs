mod decode;
mod streaming;

/// Test vectors are written as hex strings, this turns them back into bytes.
pub fn from_hex(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0);
    (0..hex.len() / 2)
        .map(|idx| u8::from_str_radix(&hex[idx * 2..idx * 2 + 2], 16).unwrap())
        .collect()
}
