// src/formats/header.rs
//
// Bit layout written by the image generators into the alpha channel:
//
//   [15 bytes] "stealth_pnginfo" signature, each byte MSB first
//   [32 bits ] payload length in BITS, big-endian
//   [N bits  ] payload, UTF-8 text

pub const SIGNATURE: &[u8; 15] = b"stealth_pnginfo";
pub const SIGNATURE_BITS: usize = SIGNATURE.len() * 8;
pub const LENGTH_FIELD_BITS: usize = 32;

/// Alpha value assumed for every pixel of an image without an alpha channel.
pub const OPAQUE_ALPHA: u8 = 255;

/// Bits of a byte in transmission order (bit 7 first).
pub fn byte_bits(byte: u8) -> impl Iterator<Item = u8> {
    (0..8).rev().map(move |shift| (byte >> shift) & 1)
}

pub fn signature_bits() -> Vec<u8> {
    SIGNATURE.iter().flat_map(|&b| byte_bits(b)).collect()
}

pub fn matches_signature(bits: &[u8]) -> bool {
    bits.len() == SIGNATURE_BITS && pack_bits(bits) == SIGNATURE
}

/// Reads the big-endian length field. Only the first 32 bits are used.
pub fn read_length(bits: &[u8]) -> u32 {
    bits.iter()
        .take(LENGTH_FIELD_BITS)
        .fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit & 1))
}

/// Groups bits into bytes, MSB first. A trailing partial group is dropped.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1)))
        .collect()
}
