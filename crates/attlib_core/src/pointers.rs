//! The 8-entry segment pointer table at 0x0800.
//!
//! Entries are start pages. The next entry (or EOF) bounds a segment when
//! scanning exhaustively, but record parsing itself ends on SEGMENT_END; the
//! bound is only a hint.

use crate::config::PointerUnit;
use crate::consts::SEGMENT_POINTER_COUNT;
use crate::errors::Result;
use crate::page::PageStore;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPointerTable {
    raw: [u32; SEGMENT_POINTER_COUNT],
    pages: [u32; SEGMENT_POINTER_COUNT],
    page_count: u32,
}

impl SegmentPointerTable {
    pub fn read(store: &PageStore) -> Result<Self> {
        let layout = store.layout();
        let words = store.read_words_at(layout.pointer_table_offset, SEGMENT_POINTER_COUNT)?;
        let mut raw = [0u32; SEGMENT_POINTER_COUNT];
        raw.copy_from_slice(&words);
        let table = Self::normalize(raw, layout.pointer_unit, layout.data_region_start, layout.page_size, store.page_count());
        debug!(raw = ?table.raw, pages = ?table.pages, "segment pointer table");
        Ok(table)
    }

    /// Convert raw entries to page numbers.
    pub fn normalize(
        raw: [u32; SEGMENT_POINTER_COUNT],
        unit: PointerUnit,
        data_region_start: u64,
        page_size: usize,
        page_count: u32,
    ) -> Self {
        let as_bytes = match unit {
            PointerUnit::Pages => false,
            PointerUnit::Bytes => true,
            PointerUnit::Auto => raw.iter().any(|p| *p > page_count),
        };
        let pages = raw.map(|p| {
            if as_bytes {
                ((p as u64).saturating_sub(data_region_start) / page_size as u64) as u32
            } else {
                p
            }
        });
        Self { raw, pages, page_count }
    }

    pub fn raw(&self) -> &[u32; SEGMENT_POINTER_COUNT] { &self.raw }
    pub fn pages(&self) -> &[u32; SEGMENT_POINTER_COUNT] { &self.pages }

    pub fn start(&self, slot: usize) -> Option<u32> {
        self.pages.get(slot).copied()
    }

    pub fn is_valid(&self, slot: usize) -> bool {
        self.start(slot).is_some_and(|p| p < self.page_count)
    }

    /// `start..end`, where `end` is the next greater entry or the page count.
    pub fn segment_range(&self, slot: usize) -> Option<Range<u32>> {
        let start = self.start(slot)?;
        let end = self.pages[slot + 1..]
            .iter()
            .copied()
            .find(|p| *p > start)
            .unwrap_or(self.page_count)
            .min(self.page_count);
        Some(start..end.max(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::config::LayoutConfig;

    #[test]
    fn reads_table_and_ranges() {
        let mut b = ImageBuilder::new();
        b.pointers([3, 4, 5, 6, 6, 6, 6, 6]).ensure_pages(8);
        let store = PageStore::from_bytes(b.to_bytes(), &LayoutConfig::default(), 4).unwrap();
        let t = SegmentPointerTable::read(&store).unwrap();
        assert_eq!(t.pages(), &[3, 4, 5, 6, 6, 6, 6, 6]);
        assert_eq!(t.segment_range(0), Some(3..4));
        assert_eq!(t.segment_range(3), Some(6..8));
        assert_eq!(t.segment_range(7), Some(6..8));
        assert_eq!(t.segment_range(8), None);
        assert!(t.is_valid(0));
    }

    #[test]
    fn normalizes_byte_pointers() {
        let raw = [0x1000 + 3 * 2048, 0x1000 + 4 * 2048, 0, 0, 0, 0, 0, 0];
        let t = SegmentPointerTable::normalize(raw, PointerUnit::Auto, 0x1000, 2048, 10);
        assert_eq!(&t.pages()[..2], &[3, 4]);
        let t = SegmentPointerTable::normalize([3, 4, 0, 0, 0, 0, 0, 0], PointerUnit::Auto, 0x1000, 2048, 10);
        assert_eq!(&t.pages()[..2], &[3, 4]);
        assert_eq!(t.raw()[0], 3);
    }

    #[test]
    fn pointer_past_eof_is_invalid() {
        let t = SegmentPointerTable::normalize([3, 40, 0, 0, 0, 0, 0, 0], PointerUnit::Pages, 0x1000, 2048, 10);
        assert!(!t.is_valid(1));
        assert_eq!(t.segment_range(1), Some(40..40));
    }
}
