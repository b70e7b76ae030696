//! Base-27 name codec.
//!
//! Mnemonic names (`NAME`, `ELBO`, `POS`) are stored as integers: space is
//! digit 0, `A..Z` are digits 1..26, the first character is the least
//! significant digit, and the sum is offset by [`BASE27_OFFSET`]. Six
//! characters fill the valid range exactly, so anything outside
//! `[MIN_HASH, MAX_HASH]` is a sentinel, a count or raw data.

use crate::consts::{BASE27_OFFSET, MAX_HASH, MAX_NAME_LEN, MIN_HASH};
use crate::errors::{AttlibError, Result};

pub type HashValue = u32;

#[inline]
pub fn is_name_hash(word: u32) -> bool {
    (MIN_HASH..=MAX_HASH).contains(&word)
}

#[inline]
fn digit(ch: char) -> Option<u32> {
    match ch {
        ' ' => Some(0),
        'A'..='Z' => Some(ch as u32 - 'A' as u32 + 1),
        'a'..='z' => Some(ch as u32 - 'a' as u32 + 1),
        _ => None,
    }
}

#[inline]
fn letter(d: u32) -> char {
    if d == 0 { ' ' } else { char::from(b'A' + (d as u8 - 1)) }
}

/// Encode a name. Trailing spaces are insignificant; lower case is folded.
pub fn encode(name: &str) -> Result<HashValue> {
    let significant = name.trim_end_matches(' ');
    if significant.is_empty() {
        return Err(AttlibError::InvalidName { name: name.to_string(), reason: "empty" });
    }
    if significant.chars().count() > MAX_NAME_LEN {
        return Err(AttlibError::InvalidName { name: name.to_string(), reason: "longer than 6 characters" });
    }
    let mut acc = 0u64;
    let mut mul = 1u64;
    for ch in significant.chars() {
        let d = digit(ch).ok_or(AttlibError::InvalidName {
            name: name.to_string(),
            reason: "only space and A-Z are encodable",
        })?;
        acc += mul * d as u64;
        mul *= 27;
    }
    let hash = acc + BASE27_OFFSET as u64;
    debug_assert!(hash <= MAX_HASH as u64);
    Ok(hash as HashValue)
}

/// Decode a name hash. Out-of-range values are never names.
pub fn decode(hash: HashValue) -> Option<String> {
    if !is_name_hash(hash) {
        return None;
    }
    let mut k = hash - BASE27_OFFSET;
    let mut out = String::with_capacity(MAX_NAME_LEN);
    while k > 0 {
        out.push(letter(k % 27));
        k /= 27;
    }
    Some(out)
}

/// Decode or fall back to a hex rendering, for log lines and reports.
pub fn display_name(hash: HashValue) -> String {
    decode(hash).unwrap_or_else(|| format!("#{hash:08X}"))
}

/// Decode a raw base-27 word without the name offset (packed text words in
/// text defaults). At most six digits are read; digit 0 is a space. Characters
/// come out most-significant digit first, the reverse of [`decode`].
pub fn decode_packed(word: u32) -> String {
    let mut k = word;
    let mut digits = Vec::with_capacity(MAX_NAME_LEN);
    for _ in 0..MAX_NAME_LEN {
        if k == 0 {
            break;
        }
        digits.push(letter(k % 27));
        k /= 27;
    }
    digits.iter().rev().collect()
}

/// Join packed words into one string, trimmed at both ends.
pub fn decode_packed_text(words: &[u32]) -> String {
    let joined: String = words.iter().map(|w| decode_packed(*w)).collect();
    joined.trim().to_string()
}
