//! Page access.
//!
//! Layout (BE):
//!   [0x0000] header text
//!   [0x0800] 8 x u32 segment pointers
//!   [0x1000] page 0, then pages of `page_size` bytes (512 words by default)
//!
//! Pages are immutable once read. Decoded pages are kept in a bounded LRU so
//! repeated stream passes over the same segment do not re-decode; the bytes
//! themselves stay in the OS page cache behind the mapping.

use crate::config::LayoutConfig;
use crate::consts::WORD_SIZE;
use crate::errors::{AttlibError, Result};
use crate::utils::be_words;
use lru::LruCache;
use memmap2::Mmap;
use parking_lot::Mutex;
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One page of big-endian words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    number: u32,
    words: Box<[u32]>,
}

impl Page {
    pub fn number(&self) -> u32 { self.number }
    pub fn words(&self) -> &[u32] { &self.words }
    pub fn len(&self) -> usize { self.words.len() }
    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    #[inline]
    pub fn word(&self, idx: usize) -> Option<u32> {
        self.words.get(idx).copied()
    }
}

enum Backing {
    Mapped { _f: File, mmap: Mmap },
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped { mmap, .. } => &mmap[..],
            Backing::Owned(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub resident: usize,
}

/// Read-only random access to the pages of one file.
pub struct PageStore {
    backing: Backing,
    layout: LayoutConfig,
    cache: Mutex<LruCache<u32, Arc<Page>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageStore {
    pub fn open(path: impl AsRef<Path>, layout: &LayoutConfig, cache_pages: usize) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        // SAFETY: the file is opened read-only and treated as immutable for the
        // lifetime of the session.
        let mmap = unsafe { Mmap::map(&f)? };
        debug!(path = %path.as_ref().display(), bytes = mmap.len(), "mapped page file");
        Self::with_backing(Backing::Mapped { _f: f, mmap }, layout, cache_pages)
    }

    pub fn from_bytes(bytes: Vec<u8>, layout: &LayoutConfig, cache_pages: usize) -> Result<Self> {
        Self::with_backing(Backing::Owned(bytes), layout, cache_pages)
    }

    fn with_backing(backing: Backing, layout: &LayoutConfig, cache_pages: usize) -> Result<Self> {
        layout.validate()?;
        let cap = NonZeroUsize::new(cache_pages)
            .ok_or_else(|| AttlibError::InvalidConfig("page cache capacity must be non-zero".into()))?;
        Ok(Self {
            backing,
            layout: layout.clone(),
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn layout(&self) -> &LayoutConfig { &self.layout }
    pub fn words_per_page(&self) -> usize { self.layout.words_per_page() }
    pub fn page_size(&self) -> usize { self.layout.page_size }

    /// Whole file, header included.
    pub fn raw(&self) -> &[u8] { self.backing.bytes() }

    /// Complete pages in the data region.
    pub fn page_count(&self) -> u32 {
        let len = self.raw().len() as u64;
        let data = len.saturating_sub(self.layout.data_region_start);
        (data / self.layout.page_size as u64).min(u32::MAX as u64) as u32
    }

    fn page_offset(&self, page: u32) -> u64 {
        self.layout.data_region_start + page as u64 * self.layout.page_size as u64
    }

    /// Raw bytes of one page.
    pub fn page_bytes(&self, page: u32) -> Result<&[u8]> {
        let offset = self.page_offset(page);
        let needed = self.layout.page_size;
        let raw = self.raw();
        let end = offset.checked_add(needed as u64).filter(|e| *e <= raw.len() as u64);
        match end {
            Some(end) => Ok(&raw[offset as usize..end as usize]),
            None => Err(AttlibError::TruncatedPage { page, offset, needed, available: raw.len() as u64 }),
        }
    }

    /// Decoded page, served from the cache when resident.
    pub fn read_page(&self, page: u32) -> Result<Arc<Page>> {
        if let Some(p) = self.cache.lock().get(&page) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(p));
        }
        let bytes = self.page_bytes(page)?;
        let decoded = Arc::new(Page { number: page, words: be_words(bytes).into_boxed_slice() });
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.cache.lock().put(page, Arc::clone(&decoded));
        Ok(decoded)
    }

    /// `n` words at an absolute byte offset (header area included).
    pub fn read_words_at(&self, byte_offset: u64, n: usize) -> Result<Vec<u32>> {
        let needed = n * WORD_SIZE;
        let raw = self.raw();
        let end = byte_offset.checked_add(needed as u64).filter(|e| *e <= raw.len() as u64);
        match end {
            Some(end) => Ok(be_words(&raw[byte_offset as usize..end as usize])),
            None => Err(AttlibError::TruncatedPage {
                page: u32::MAX,
                offset: byte_offset,
                needed,
                available: raw.len() as u64,
            }),
        }
    }

    /// Bytes from a position inside `page` to the end of the data region.
    /// Instance blocks may run across page boundaries, so the slice is not
    /// cut at the page end.
    pub fn block(&self, page: u32, byte_offset: usize) -> Result<&[u8]> {
        let first = self.page_bytes(page)?;
        if byte_offset >= first.len() {
            return Err(AttlibError::OffsetOutOfRange { offset: byte_offset, width: 0, len: first.len() });
        }
        let start = (self.page_offset(page) as usize) + byte_offset;
        let data_end = self.page_offset(self.page_count()) as usize;
        Ok(&self.raw()[start..data_end])
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            resident: self.cache.lock().len(),
        }
    }
}
