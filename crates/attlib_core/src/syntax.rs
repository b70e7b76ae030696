//! ATGTSX: which attributes a noun category accepts.
//!
//! Schema-level only. A pair listed here need not have a physical offset in
//! ATNAIN, and ATNAIN may bind pairs never listed here.

use crate::consts::SegmentKind;
use crate::hash::{is_name_hash, HashValue};
use crate::noun::NounKey;
use crate::page::PageStore;
use crate::stream::{SegmentScan, SegmentStream};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyntaxEntry {
    /// Attribute hash or pack code.
    pub attr_hash: HashValue,
    pub noun: NounKey,
    pub extra: u32,
}

pub fn scan(store: &PageStore, start_page: u32) -> SegmentScan<SyntaxEntry> {
    let mut stream = SegmentStream::new(store, start_page);
    let mut records = Vec::new();
    while let Some(word) = stream.next_word() {
        if !is_name_hash(word) {
            continue;
        }
        let (Some(noun), Some(extra)) = (stream.next_word(), stream.next_word()) else { break };
        records.push(SyntaxEntry { attr_hash: word, noun: NounKey::classify(noun), extra });
    }
    stream.into_scan(start_page, records)
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTable {
    start_page: u32,
    entries: Vec<SyntaxEntry>,
    by_noun: HashMap<NounKey, Vec<HashValue>>,
}

impl SyntaxTable {
    pub fn load(store: &PageStore, start_page: u32) -> Self {
        let scan = scan(store, start_page);
        if scan.outcome.is_truncated() {
            warn!(table = SegmentKind::Syntax.table_name(), start_page, records = scan.records.len(), "segment truncated");
        }
        let t = Self::from_scan(scan);
        info!(table = SegmentKind::Syntax.table_name(), start_page, records = t.entries.len(), nouns = t.by_noun.len(), "segment loaded");
        t
    }

    pub fn from_scan(scan: SegmentScan<SyntaxEntry>) -> Self {
        let mut by_noun: HashMap<NounKey, Vec<HashValue>> = HashMap::new();
        for e in &scan.records {
            let attrs = by_noun.entry(e.noun).or_default();
            if !attrs.contains(&e.attr_hash) {
                attrs.push(e.attr_hash);
            }
        }
        Self { start_page: scan.start_page, entries: scan.records, by_noun }
    }

    pub fn start_page(&self) -> u32 { self.start_page }
    pub fn entries(&self) -> &[SyntaxEntry] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Attributes in segment order.
    pub fn attributes_for(&self, noun: NounKey) -> &[HashValue] {
        self.by_noun.get(&noun).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_applicable(&self, noun: NounKey, attr: HashValue) -> bool {
        self.attributes_for(noun).contains(&attr)
    }
}
