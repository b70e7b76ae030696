//! ATGTIX: attribute hash -> (page, slot) of its definition record.

use crate::config::IndexLocation;
use crate::consts::SegmentKind;
use crate::errors::{AttlibError, Result};
use crate::hash::{display_name, is_name_hash, HashValue};
use crate::page::PageStore;
use crate::pointers::SegmentPointerTable;
use crate::stream::{SegmentScan, SegmentStream};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub hash: HashValue,
    pub page: u32,
    pub offset: u32,
    pub combined: u32,
}

impl IndexEntry {
    pub fn new(hash: HashValue, combined: u32, words_per_page: u32) -> Self {
        Self { hash, page: combined / words_per_page, offset: combined % words_per_page, combined }
    }
}

/// Parse `[hash][combined]` pairs until the stream stops. Out-of-range words
/// where a hash is expected are skipped.
pub fn scan(store: &PageStore, start_page: u32) -> SegmentScan<IndexEntry> {
    let wpp = store.words_per_page() as u32;
    let mut stream = SegmentStream::new(store, start_page);
    let mut records = Vec::new();
    while let Some(word) = stream.next_word() {
        if !is_name_hash(word) {
            continue;
        }
        let Some(combined) = stream.next_word() else { break };
        records.push(IndexEntry::new(word, combined, wpp));
    }
    stream.into_scan(start_page, records)
}

#[derive(Debug, Clone)]
pub struct IndexSegment {
    start_page: u32,
    entries: Vec<IndexEntry>,
    by_hash: HashMap<HashValue, usize>,
}

impl IndexSegment {
    pub fn from_scan(scan: SegmentScan<IndexEntry>) -> Self {
        let mut by_hash = HashMap::with_capacity(scan.records.len());
        for (i, e) in scan.records.iter().enumerate() {
            by_hash.insert(e.hash, i);
        }
        Self { start_page: scan.start_page, entries: scan.records, by_hash }
    }

    pub fn start_page(&self) -> u32 { self.start_page }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn lookup(&self, hash: HashValue) -> Option<&IndexEntry> {
        self.by_hash.get(&hash).map(|i| &self.entries[*i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    /// Anchor-based discovery over every page.
    ///
    /// A start page is accepted when its parse ends on `SEGMENT_END` and
    /// contains an anchor. The accepted page with the most records wins;
    /// ties go to the lower page.
    pub fn discover(store: &PageStore, anchors: &[HashValue]) -> Result<Self> {
        let mut best: Option<SegmentScan<IndexEntry>> = None;
        let mut candidates = 0u32;
        for page in 0..store.page_count() {
            let has_hash = match store.read_page(page) {
                Ok(p) => p.words().iter().any(|w| is_name_hash(*w)),
                Err(_) => false,
            };
            if !has_hash {
                continue;
            }
            candidates += 1;
            let scan = scan(store, page);
            if !accepts(&scan, anchors) {
                continue;
            }
            debug!(page, records = scan.records.len(), "index candidate accepted");
            if best.as_ref().map_or(true, |b| scan.records.len() > b.records.len()) {
                best = Some(scan);
            }
        }
        match best {
            Some(scan) => {
                info!(start_page = scan.start_page, records = scan.records.len(), candidates, "ATGTIX discovered");
                Ok(Self::from_scan(scan))
            }
            None => {
                warn!(candidates, "ATGTIX discovery found no accepting page");
                Err(AttlibError::SegmentNotFound(SegmentKind::Index.table_name()))
            }
        }
    }

    /// Resolve per the configured location. A pointer slot whose parse is not
    /// accepted falls back to discovery.
    pub fn locate(
        store: &PageStore,
        pointers: &SegmentPointerTable,
        location: IndexLocation,
        anchors: &[HashValue],
    ) -> Result<Self> {
        if let IndexLocation::Pointer(slot) = location {
            if let Some(start) = pointers.start(slot).filter(|_| pointers.is_valid(slot)) {
                let scan = scan(store, start);
                if accepts(&scan, anchors) {
                    info!(start_page = start, records = scan.records.len(), "ATGTIX loaded");
                    return Ok(Self::from_scan(scan));
                }
                warn!(slot, start_page = start, "ATGTIX pointer not accepted, discovering");
            }
        }
        Self::discover(store, anchors)
    }
}

fn accepts(scan: &SegmentScan<IndexEntry>, anchors: &[HashValue]) -> bool {
    scan.outcome.is_ended() && scan.records.iter().any(|e| anchors.contains(&e.hash))
}

impl<'a> IntoIterator for &'a IndexSegment {
    type Item = &'a IndexEntry;
    type IntoIter = std::slice::Iter<'a, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> page {} slot {}", display_name(self.hash), self.page, self.offset)
    }
}
