//! Sentinel-aware word cursor shared by the segment parsers.
//!
//! A stream walks words from a start page: `PAGE_SWITCH` moves to word 0 of
//! the next page, `SEGMENT_END` ends the stream, running past the last page
//! truncates it. Truncation is an outcome, not an error return, so parsers
//! keep whatever they accumulated.

use crate::consts::{PAGE_SWITCH, SEGMENT_END};
use crate::errors::AttlibError;
use crate::page::{Page, PageStore};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
pub enum StreamOutcome {
    /// Still yielding.
    Open,
    /// Stopped at `SEGMENT_END`.
    Ended,
    /// Ran off the file or hit a short page.
    Truncated(AttlibError),
}

impl StreamOutcome {
    pub fn is_ended(&self) -> bool { matches!(self, StreamOutcome::Ended) }
    pub fn is_truncated(&self) -> bool { matches!(self, StreamOutcome::Truncated(_)) }
}

/// Records parsed from one segment plus how the stream stopped.
#[derive(Debug)]
pub struct SegmentScan<T> {
    pub start_page: u32,
    pub records: Vec<T>,
    pub outcome: StreamOutcome,
    pub pages_visited: u32,
}

pub struct SegmentStream<'a> {
    store: &'a PageStore,
    page: u32,
    word: usize,
    current: Option<Arc<Page>>,
    outcome: StreamOutcome,
    pages_visited: u32,
}

impl<'a> SegmentStream<'a> {
    pub fn new(store: &'a PageStore, start_page: u32) -> Self {
        Self::at(store, start_page, 0)
    }

    /// Start mid-page.
    pub fn at(store: &'a PageStore, page: u32, word_index: usize) -> Self {
        Self { store, page, word: word_index, current: None, outcome: StreamOutcome::Open, pages_visited: 0 }
    }

    pub fn position(&self) -> (u32, usize) { (self.page, self.word) }
    pub fn outcome(&self) -> &StreamOutcome { &self.outcome }
    pub fn pages_visited(&self) -> u32 { self.pages_visited }

    pub fn into_scan<T>(self, start_page: u32, records: Vec<T>) -> SegmentScan<T> {
        SegmentScan { start_page, records, outcome: self.outcome, pages_visited: self.pages_visited }
    }

    fn advance(&mut self) {
        self.page = self.page.saturating_add(1);
        self.word = 0;
    }

    fn load(&mut self) -> Option<Arc<Page>> {
        if let Some(p) = &self.current {
            if p.number() == self.page {
                return Some(Arc::clone(p));
            }
        }
        let page_count = self.store.page_count();
        let loaded = if self.page >= page_count {
            Err(AttlibError::PageOutOfBounds { page: self.page, page_count })
        } else {
            self.store.read_page(self.page)
        };
        match loaded {
            Ok(p) => {
                self.pages_visited += 1;
                self.current = Some(Arc::clone(&p));
                Some(p)
            }
            Err(e) => {
                trace!(page = self.page, error = %e, "stream truncated");
                self.current = None;
                self.outcome = StreamOutcome::Truncated(e);
                None
            }
        }
    }

    /// Next data word; sentinels are consumed.
    pub fn next_word(&mut self) -> Option<u32> {
        let wpp = self.store.words_per_page();
        loop {
            if !matches!(self.outcome, StreamOutcome::Open) {
                return None;
            }
            if self.word >= wpp {
                self.advance();
                continue;
            }
            let page = self.load()?;
            let word = page.word(self.word)?;
            self.word += 1;
            match word {
                PAGE_SWITCH => self.advance(),
                SEGMENT_END => {
                    self.outcome = StreamOutcome::Ended;
                    return None;
                }
                w => return Some(w),
            }
        }
    }

    /// Next page-aligned record of `N` words.
    ///
    /// A record never straddles pages: when fewer than `N` words remain the
    /// rest of the page is skipped. An all-zero record pads out the page.
    pub fn next_record<const N: usize>(&mut self) -> Option<[u32; N]> {
        debug_assert!(N > 0);
        let wpp = self.store.words_per_page();
        loop {
            if !matches!(self.outcome, StreamOutcome::Open) {
                return None;
            }
            if self.word + N > wpp {
                self.advance();
                continue;
            }
            let page = self.load()?;
            let mut rec = [0u32; N];
            rec.copy_from_slice(page.words().get(self.word..self.word + N)?);
            if rec[0] == SEGMENT_END {
                self.outcome = StreamOutcome::Ended;
                return None;
            }
            if rec.iter().all(|w| *w == 0) {
                self.advance();
                continue;
            }
            self.word += N;
            return Some(rec);
        }
    }
}

impl Iterator for SegmentStream<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.next_word()
    }
}
