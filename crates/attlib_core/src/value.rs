//! Typed decoding of instance data.
//!
//! | type        | words | decoding                              |
//! |-------------|-------|---------------------------------------|
//! | Logical     | 1     | non-zero is true                      |
//! | Integer     | 1     | i32 BE                                |
//! | Real        | 1     | f32 BE                                |
//! | Reference   | 1     | raw u32                               |
//! | Position    | 3     | x, y, z as f32 BE                     |
//! | Direction   | 3     | x, y, z as f32 BE                     |
//! | Orientation | 9     | 3x3 row-major f32 BE                  |
//! | Text        | 1 + N | length N, then one code point per word |

use crate::consts::{TEXT_PLACEHOLDER, WORD_SIZE};
use crate::definition::DataType;
use crate::errors::{AttlibError, Result};
use crate::page::PageStore;
use crate::utils::{f32_at, i32_at, word_at};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i32),
    Real(f32),
    Ref(u32),
    Position([f32; 3]),
    Direction([f32; 3]),
    Orientation([[f32; 3]; 3]),
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Logical,
            Value::Int(_) => DataType::Integer,
            Value::Real(_) => DataType::Real,
            Value::Ref(_) => DataType::Reference,
            Value::Position(_) => DataType::Position,
            Value::Direction(_) => DataType::Direction,
            Value::Orientation(_) => DataType::Orientation,
            Value::Text(_) => DataType::Text,
        }
    }
}

/// Render text code points; anything outside printable ASCII becomes `?`.
pub fn text_from_codes(codes: impl IntoIterator<Item = u32>) -> String {
    codes
        .into_iter()
        .map(|c| match c {
            32..=126 => char::from(c as u8),
            _ => TEXT_PLACEHOLDER,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDecoder {
    /// Text length words above this are rejected as malformed.
    pub max_text_words: usize,
}

impl Default for ValueDecoder {
    fn default() -> Self { Self { max_text_words: 1024 } }
}

impl ValueDecoder {
    pub fn new(max_text_words: usize) -> Self { Self { max_text_words } }

    pub fn decode(&self, bytes: &[u8], byte_offset: usize, data_type: DataType) -> Result<Value> {
        let words = match data_type.fixed_words() {
            Some(n) => n,
            None if data_type == DataType::Text => return self.decode_text(bytes, byte_offset),
            None => return Err(AttlibError::UnsupportedType(data_type.code())),
        };
        check_range(bytes, byte_offset, words * WORD_SIZE)?;
        let f = |i: usize| f32_at(bytes, byte_offset + i * WORD_SIZE).unwrap_or_default();
        Ok(match data_type {
            DataType::Logical => Value::Bool(word_at(bytes, byte_offset).unwrap_or_default() != 0),
            DataType::Integer => Value::Int(i32_at(bytes, byte_offset).unwrap_or_default()),
            DataType::Real => Value::Real(f(0)),
            DataType::Reference => Value::Ref(word_at(bytes, byte_offset).unwrap_or_default()),
            DataType::Position => Value::Position([f(0), f(1), f(2)]),
            DataType::Direction => Value::Direction([f(0), f(1), f(2)]),
            DataType::Orientation => {
                Value::Orientation([[f(0), f(1), f(2)], [f(3), f(4), f(5)], [f(6), f(7), f(8)]])
            }
            DataType::Text | DataType::Unknown(_) => return Err(AttlibError::UnsupportedType(data_type.code())),
        })
    }

    fn decode_text(&self, bytes: &[u8], byte_offset: usize) -> Result<Value> {
        check_range(bytes, byte_offset, WORD_SIZE)?;
        let n = word_at(bytes, byte_offset).unwrap_or_default() as usize;
        if n > self.max_text_words {
            let width = n.saturating_add(1).saturating_mul(WORD_SIZE);
            return Err(AttlibError::OffsetOutOfRange { offset: byte_offset, width, len: bytes.len() });
        }
        check_range(bytes, byte_offset, (n + 1) * WORD_SIZE)?;
        let codes = (1..=n).map(|i| word_at(bytes, byte_offset + i * WORD_SIZE).unwrap_or_default());
        Ok(Value::Text(text_from_codes(codes)))
    }

    /// Decode from a block held in a paged file.
    pub fn decode_at(&self, store: &PageStore, page: u32, byte_offset: usize, data_type: DataType) -> Result<Value> {
        let block = store.block(page, byte_offset)?;
        self.decode(block, 0, data_type)
    }
}

fn check_range(bytes: &[u8], offset: usize, width: usize) -> Result<()> {
    match offset.checked_add(width) {
        Some(end) if end <= bytes.len() => Ok(()),
        _ => Err(AttlibError::OffsetOutOfRange { offset, width, len: bytes.len() }),
    }
}

pub fn decode_value(bytes: &[u8], byte_offset: usize, data_type: DataType) -> Result<Value> {
    ValueDecoder::default().decode(bytes, byte_offset, data_type)
}

pub fn decode_at(store: &PageStore, page: u32, byte_offset: usize, data_type: DataType) -> Result<Value> {
    ValueDecoder::default().decode_at(store, page, byte_offset, data_type)
}
