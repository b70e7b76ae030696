//! ATGTDF: attribute definitions.
//!
//! Record: `[hash][type][flag]`, then a default when the flag is `2`:
//! one word for scalar types, or a length word plus that many words for text.

use crate::consts::{SegmentKind, DEFAULT_FLAG_PRESENT};
use crate::hash::{decode, decode_packed_text, is_name_hash, HashValue};
use crate::page::PageStore;
use crate::stream::{SegmentScan, SegmentStream};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Logical,
    Real,
    Integer,
    Text,
    Reference,
    Position,
    Direction,
    Orientation,
    Unknown(u32),
}

impl DataType {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => DataType::Logical,
            2 => DataType::Real,
            3 => DataType::Integer,
            4 => DataType::Text,
            5 => DataType::Reference,
            6 => DataType::Position,
            7 => DataType::Direction,
            8 => DataType::Orientation,
            other => DataType::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            DataType::Logical => 1,
            DataType::Real => 2,
            DataType::Integer => 3,
            DataType::Text => 4,
            DataType::Reference => 5,
            DataType::Position => 6,
            DataType::Direction => 7,
            DataType::Orientation => 8,
            DataType::Unknown(c) => c,
        }
    }

    /// Type codes that can follow a hash in a real definition record.
    pub fn is_known_code(code: u32) -> bool {
        (1..=8).contains(&code)
    }

    /// Width in words; `None` for text (length-prefixed) and unknown types.
    pub fn fixed_words(self) -> Option<usize> {
        match self {
            DataType::Logical | DataType::Real | DataType::Integer | DataType::Reference => Some(1),
            DataType::Position | DataType::Direction => Some(3),
            DataType::Orientation => Some(9),
            DataType::Text | DataType::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultFlag {
    None,
    Present,
}

impl DefaultFlag {
    pub fn from_code(code: u32) -> Self {
        if code == DEFAULT_FLAG_PRESENT { DefaultFlag::Present } else { DefaultFlag::None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    None,
    Scalar(u32),
    Text(Vec<u32>),
}

impl DefaultValue {
    /// Text defaults are packed base-27 words.
    pub fn as_text(&self) -> Option<String> {
        match self {
            DefaultValue::Text(words) => Some(decode_packed_text(words)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDefinition {
    pub hash: HashValue,
    pub data_type: DataType,
    pub default_flag: DefaultFlag,
    pub default: DefaultValue,
}

impl AttrDefinition {
    pub fn name(&self) -> Option<String> {
        decode(self.hash)
    }

    pub fn width(&self) -> Option<usize> {
        self.data_type.fixed_words()
    }

    pub fn typed_default(&self) -> Option<Value> {
        match (&self.default, self.data_type) {
            (DefaultValue::Scalar(w), DataType::Logical) => Some(Value::Bool(*w != 0)),
            (DefaultValue::Scalar(w), DataType::Integer) => Some(Value::Int(*w as i32)),
            (DefaultValue::Scalar(w), DataType::Real) => Some(Value::Real(f32::from_bits(*w))),
            (DefaultValue::Scalar(w), DataType::Reference) => Some(Value::Ref(*w)),
            (DefaultValue::Text(_), DataType::Text) => self.default.as_text().map(Value::Text),
            _ => None,
        }
    }
}

/// Read the body of a definition record whose hash has just been consumed.
/// `None` when the stream stops mid-record.
pub(crate) fn read_body(stream: &mut SegmentStream<'_>, hash: HashValue, max_text_words: usize) -> Option<AttrDefinition> {
    let data_type = DataType::from_code(stream.next_word()?);
    let default_flag = DefaultFlag::from_code(stream.next_word()?);
    let default = match (default_flag, data_type) {
        (DefaultFlag::None, _) => DefaultValue::None,
        (DefaultFlag::Present, DataType::Text) => {
            let len = stream.next_word()? as usize;
            if len > max_text_words {
                warn!(attr = hash, len, "text default longer than limit, dropped");
                // skip the payload so its words are not read as records
                for _ in 0..len {
                    if stream.next_word().is_none() {
                        break;
                    }
                }
                DefaultValue::None
            } else {
                let mut words = Vec::with_capacity(len);
                for _ in 0..len {
                    words.push(stream.next_word()?);
                }
                DefaultValue::Text(words)
            }
        }
        (DefaultFlag::Present, _) => DefaultValue::Scalar(stream.next_word()?),
    };
    Some(AttrDefinition { hash, data_type, default_flag, default })
}

pub fn scan(store: &PageStore, start_page: u32, max_text_words: usize) -> SegmentScan<AttrDefinition> {
    let mut stream = SegmentStream::new(store, start_page);
    let mut records = Vec::new();
    while let Some(word) = stream.next_word() {
        if !is_name_hash(word) {
            continue;
        }
        match read_body(&mut stream, word, max_text_words) {
            Some(def) => records.push(def),
            None => break,
        }
    }
    stream.into_scan(start_page, records)
}

#[derive(Debug, Clone, Default)]
pub struct DefinitionSegment {
    start_page: u32,
    records: usize,
    defs: HashMap<HashValue, AttrDefinition>,
}

impl DefinitionSegment {
    pub fn load(store: &PageStore, start_page: u32, max_text_words: usize) -> Self {
        let scan = scan(store, start_page, max_text_words);
        if scan.outcome.is_truncated() {
            warn!(table = SegmentKind::Definition.table_name(), start_page, records = scan.records.len(), "segment truncated");
        }
        let seg = Self::from_scan(scan);
        info!(table = SegmentKind::Definition.table_name(), start_page, records = seg.records, unique = seg.len(), "segment loaded");
        seg
    }

    /// Later records replace earlier ones with the same hash.
    pub fn from_scan(scan: SegmentScan<AttrDefinition>) -> Self {
        let records = scan.records.len();
        let mut defs = HashMap::with_capacity(records);
        for def in scan.records {
            defs.insert(def.hash, def);
        }
        Self { start_page: scan.start_page, records, defs }
    }

    pub fn start_page(&self) -> u32 { self.start_page }
    pub fn len(&self) -> usize { self.defs.len() }
    pub fn is_empty(&self) -> bool { self.defs.is_empty() }

    pub fn get(&self, hash: HashValue) -> Option<&AttrDefinition> {
        self.defs.get(&hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttrDefinition> {
        self.defs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::config::LayoutConfig;
    use crate::consts::{PAGE_SWITCH, SEGMENT_END};
    use crate::hash::encode;

    fn h(name: &str) -> u32 { encode(name).unwrap() }

    fn load(b: &ImageBuilder, max_text: usize) -> DefinitionSegment {
        let s = PageStore::from_bytes(b.to_bytes(), &LayoutConfig::default(), 8).unwrap();
        DefinitionSegment::load(&s, 0, max_text)
    }

    #[test]
    fn type_codes() {
        for code in 1..=8 {
            assert_eq!(DataType::from_code(code).code(), code);
        }
        assert_eq!(DataType::from_code(9), DataType::Unknown(9));
        assert_eq!(DataType::Orientation.fixed_words(), Some(9));
        assert_eq!(DataType::Text.fixed_words(), None);
        assert_eq!(DefaultFlag::from_code(7), DefaultFlag::None);
    }

    #[test]
    fn parses_scalar_text_and_absent_defaults() {
        let mut b = ImageBuilder::new();
        b.page(0, &[
            h("PURP"), 4, 2, 2, 55, 1,        // text default "BA" + "A"
            h("NAME"), 3, 1,                  // no default
            h("TEMP"), 2, 2, 1.5f32.to_bits(), // scalar default
            h("LOCK"), 1, 9,                  // unknown flag, no default
            SEGMENT_END,
        ]);
        let seg = load(&b, 64);
        assert_eq!(seg.len(), 4);

        let purp = seg.get(h("PURP")).unwrap();
        assert_eq!(purp.data_type, DataType::Text);
        assert_eq!(purp.default, DefaultValue::Text(vec![55, 1]));
        assert_eq!(purp.default.as_text().as_deref(), Some("BAA"));
        assert_eq!(purp.name().as_deref(), Some("PURP"));

        let name = seg.get(h("NAME")).unwrap();
        assert_eq!((name.data_type, name.default_flag, &name.default), (DataType::Integer, DefaultFlag::None, &DefaultValue::None));

        assert_eq!(seg.get(h("TEMP")).unwrap().typed_default(), Some(Value::Real(1.5)));
        assert_eq!(seg.get(h("LOCK")).unwrap().default, DefaultValue::None);
    }

    #[test]
    fn last_definition_wins() {
        let mut b = ImageBuilder::new();
        b.page(0, &[h("POS"), 3, 1, h("POS"), 6, 1, SEGMENT_END]);
        let seg = load(&b, 64);
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.get(h("POS")).unwrap().data_type, DataType::Position);
    }

    #[test]
    fn record_continues_across_page_switch() {
        let mut b = ImageBuilder::new();
        b.page(0, &[h("POS"), 6, PAGE_SWITCH]);
        b.page(1, &[1, h("NAME"), 4, 1, SEGMENT_END]);
        let seg = load(&b, 64);
        assert_eq!(seg.get(h("POS")).unwrap().data_type, DataType::Position);
        assert!(seg.get(h("NAME")).is_some());
    }

    #[test]
    fn oversized_text_default_is_dropped() {
        let mut b = ImageBuilder::new();
        b.page(0, &[h("DESC"), 4, 2, 5000, SEGMENT_END]);
        let seg = load(&b, 64);
        assert_eq!(seg.get(h("DESC")).unwrap().default, DefaultValue::None);
    }

    #[test]
    fn oversized_text_payload_is_skipped() {
        let mut b = ImageBuilder::new();
        // payload words look like a record of their own
        b.page(0, &[h("DESC"), 4, 2, 3, h("FAKE"), 3, 1, h("NAME"), 3, 1, SEGMENT_END]);
        let seg = load(&b, 2);
        assert_eq!(seg.len(), 2);
        assert_eq!(seg.get(h("DESC")).unwrap().default, DefaultValue::None);
        assert!(seg.get(h("FAKE")).is_none());
        assert_eq!(seg.get(h("NAME")).unwrap().data_type, DataType::Integer);
    }

    #[test]
    fn truncated_stream_keeps_parsed_records() {
        let mut b = ImageBuilder::new();
        b.page(0, &[h("POS"), 6, 1, h("NAME"), 4]);
        let seg = load(&b, 64);
        assert_eq!(seg.len(), 1);
        assert!(seg.get(h("NAME")).is_none());
    }
}
