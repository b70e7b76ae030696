use crate::consts::WORD_SIZE;
use byteorder::{BigEndian as BE, ByteOrder};

/// Decode a byte slice into big-endian words; a trailing partial word is dropped.
pub fn be_words(bytes: &[u8]) -> Vec<u32> {
    let n = bytes.len() / WORD_SIZE;
    let mut out = vec![0u32; n];
    BE::read_u32_into(&bytes[..n * WORD_SIZE], &mut out);
    out
}

pub fn words_to_be_bytes(words: &[u32]) -> Vec<u8> {
    let mut out = vec![0u8; words.len() * WORD_SIZE];
    BE::write_u32_into(words, &mut out);
    out
}

pub fn word_at(bytes: &[u8], byte_offset: usize) -> Option<u32> {
    let end = byte_offset.checked_add(WORD_SIZE)?;
    bytes.get(byte_offset..end).map(BE::read_u32)
}

pub fn f32_at(bytes: &[u8], byte_offset: usize) -> Option<f32> {
    let end = byte_offset.checked_add(WORD_SIZE)?;
    bytes.get(byte_offset..end).map(BE::read_f32)
}

pub fn i32_at(bytes: &[u8], byte_offset: usize) -> Option<i32> {
    let end = byte_offset.checked_add(WORD_SIZE)?;
    bytes.get(byte_offset..end).map(BE::read_i32)
}
