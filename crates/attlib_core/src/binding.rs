//! ATNAIN: physical attribute offsets per noun.
//!
//! Page-aligned `[attr][noun][word_offset]` triples. Zero is a legal noun id
//! and a legal offset, so the segment uses fixed-record framing instead of
//! the sentinel word stream.

use crate::consts::SegmentKind;
use crate::hash::{is_name_hash, HashValue};
use crate::noun::NounKey;
use crate::page::PageStore;
use crate::stream::{SegmentScan, SegmentStream};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindingRecord {
    pub attr_hash: HashValue,
    pub noun: NounKey,
    pub word_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub attr_hash: HashValue,
    pub word_offset: u32,
}

pub fn scan(store: &PageStore, start_page: u32) -> SegmentScan<BindingRecord> {
    let mut stream = SegmentStream::new(store, start_page);
    let mut records = Vec::new();
    while let Some([attr, noun, offset]) = stream.next_record::<3>() {
        if !is_name_hash(attr) {
            trace!(attr, noun, offset, "skipping binding with out-of-range attribute");
            continue;
        }
        records.push(BindingRecord { attr_hash: attr, noun: NounKey::classify(noun), word_offset: offset });
    }
    stream.into_scan(start_page, records)
}

#[derive(Debug, Clone, Default)]
pub struct BindingSegment {
    start_page: u32,
    by_noun: HashMap<NounKey, HashMap<HashValue, u32>>,
}

impl BindingSegment {
    pub fn load(store: &PageStore, start_page: u32) -> Self {
        let scan = scan(store, start_page);
        if scan.outcome.is_truncated() {
            warn!(table = SegmentKind::Binding.table_name(), start_page, records = scan.records.len(), "segment truncated");
        }
        let records = scan.records.len();
        let seg = Self::from_scan(scan);
        info!(table = SegmentKind::Binding.table_name(), start_page, records, nouns = seg.by_noun.len(), "segment loaded");
        seg
    }

    pub fn from_scan(scan: SegmentScan<BindingRecord>) -> Self {
        let mut by_noun: HashMap<NounKey, HashMap<HashValue, u32>> = HashMap::new();
        for r in scan.records {
            by_noun.entry(r.noun).or_default().insert(r.attr_hash, r.word_offset);
        }
        Self { start_page: scan.start_page, by_noun }
    }

    pub fn start_page(&self) -> u32 { self.start_page }

    pub fn offset(&self, noun: NounKey, attr: HashValue) -> Option<u32> {
        self.by_noun.get(&noun)?.get(&attr).copied()
    }

    /// Bindings of one noun, ordered by offset.
    pub fn bindings_for(&self, noun: NounKey) -> Vec<Binding> {
        let mut out: Vec<Binding> = self
            .by_noun
            .get(&noun)
            .map(|m| m.iter().map(|(a, o)| Binding { attr_hash: *a, word_offset: *o }).collect())
            .unwrap_or_default();
        out.sort_by_key(|b| (b.word_offset, b.attr_hash));
        out
    }

    pub fn nouns(&self) -> Vec<NounKey> {
        let mut v: Vec<NounKey> = self.by_noun.keys().copied().collect();
        v.sort();
        v
    }

    pub fn contains_noun(&self, noun: NounKey) -> bool {
        self.by_noun.contains_key(&noun)
    }

    /// Distinct (noun, attribute) pairs.
    pub fn len(&self) -> usize {
        self.by_noun.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.by_noun.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::config::LayoutConfig;
    use crate::consts::SEGMENT_END;
    use crate::hash::encode;

    fn h(name: &str) -> u32 { encode(name).unwrap() }

    fn load(b: &ImageBuilder) -> BindingSegment {
        let s = PageStore::from_bytes(b.to_bytes(), &LayoutConfig::default(), 8).unwrap();
        BindingSegment::load(&s, 0)
    }

    #[test]
    fn aggregates_per_noun() {
        let mut b = ImageBuilder::new();
        b.page(0, &[
            h("POS"), 42, 5,
            h("NAME"), 42, 0,
            h("POS"), h("ELBO"), 11,
            7, 42, 9, // attribute not a name hash
            SEGMENT_END,
        ]);
        let seg = load(&b);
        let n42 = NounKey::BySequentialId(42);
        assert_eq!(seg.offset(n42, h("POS")), Some(5));
        assert_eq!(seg.offset(NounKey::ByHash(h("ELBO")), h("POS")), Some(11));
        assert_eq!(seg.offset(n42, 7), None);
        let list = seg.bindings_for(n42);
        assert_eq!(list.iter().map(|b| b.word_offset).collect::<Vec<_>>(), vec![0, 5]);
        assert_eq!(seg.nouns(), vec![n42, NounKey::ByHash(h("ELBO"))]);
        assert_eq!(seg.len(), 3);
    }

    #[test]
    fn zero_noun_and_padding() {
        let mut b = ImageBuilder::new();
        b.page(0, &[h("POS"), 0, 3, 0, 0, 0, h("NAME"), 1, 1]);
        b.page(1, &[h("NAME"), 0, 8, SEGMENT_END]);
        let seg = load(&b);
        let n0 = NounKey::BySequentialId(0);
        assert_eq!(seg.offset(n0, h("POS")), Some(3));
        // the record after the padding triple on page 0 is not read
        assert!(!seg.contains_noun(NounKey::BySequentialId(1)));
        assert_eq!(seg.offset(n0, h("NAME")), Some(8));
    }
}
