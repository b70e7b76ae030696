//! In-memory image assembly for fixtures and benches.
//!
//! Produces byte images in the on-disk layout (header text, pointer table,
//! word pages). Nothing in the decoder writes through this; it exists so tests
//! and tools can describe a file as "these words on these pages".

use crate::config::LayoutConfig;
use crate::consts::SEGMENT_POINTER_COUNT;
use crate::errors::Result;
use crate::utils::words_to_be_bytes;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct ImageBuilder {
    layout: LayoutConfig,
    header: Vec<u8>,
    pointers: [u32; SEGMENT_POINTER_COUNT],
    // flat data region, page-major
    words: Vec<u32>,
}

impl Default for ImageBuilder {
    fn default() -> Self { Self::new() }
}

impl ImageBuilder {
    pub fn new() -> Self { Self::from_layout(LayoutConfig::default()) }

    /// Builder for a non-default layout; the layout must place the pointer
    /// table before the data region.
    pub fn with_layout(layout: LayoutConfig) -> Result<Self> {
        layout.validate()?;
        Ok(Self::from_layout(layout))
    }

    fn from_layout(layout: LayoutConfig) -> Self {
        Self {
            layout,
            header: b"ATTLIB synthetic image".to_vec(),
            pointers: [0; SEGMENT_POINTER_COUNT],
            words: Vec::new(),
        }
    }

    pub fn header(&mut self, text: &[u8]) -> &mut Self {
        self.header = text.to_vec();
        self
    }

    pub fn pointers(&mut self, ptrs: [u32; SEGMENT_POINTER_COUNT]) -> &mut Self {
        self.pointers = ptrs;
        self
    }

    /// Place `words` at the start of `page`; the page is zero-padded, and a
    /// longer slice runs on into the following pages.
    pub fn page(&mut self, page: u32, words: &[u32]) -> &mut Self {
        self.words_at(page, 0, words);
        self.ensure_pages(page + 1);
        self
    }

    /// Place `words` at an arbitrary word position.
    pub fn words_at(&mut self, page: u32, word_index: usize, words: &[u32]) -> &mut Self {
        let start = page as usize * self.layout.words_per_page() + word_index;
        let end = start + words.len();
        if self.words.len() < end {
            self.words.resize(end, 0);
        }
        self.words[start..end].copy_from_slice(words);
        self
    }

    /// Make sure at least `n` whole pages exist.
    pub fn ensure_pages(&mut self, n: u32) -> &mut Self {
        let want = n as usize * self.layout.words_per_page();
        if self.words.len() < want {
            self.words.resize(want, 0);
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let wpp = self.layout.words_per_page();
        let pages = self.words.len().div_ceil(wpp);
        let start = self.layout.data_region_start as usize;
        let mut out = vec![0u8; start];
        let n = self.header.len().min(self.layout.pointer_table_offset as usize);
        out[..n].copy_from_slice(&self.header[..n]);

        let table = words_to_be_bytes(&self.pointers);
        let at = self.layout.pointer_table_offset as usize;
        out[at..at + table.len()].copy_from_slice(&table);

        let mut data = self.words.clone();
        data.resize(pages * wpp, 0);
        out.extend_from_slice(&words_to_be_bytes(&data));
        out
    }

    /// Write the image next to `path` and rename it into place.
    pub fn write_atomic(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path_final = path.as_ref().to_path_buf();
        let dir = path_final.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::Builder::new().prefix("attlib_img_").tempfile_in(dir)?;
        tmp.as_file_mut().write_all(&self.to_bytes())?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&path_final)?;
        Ok(path_final)
    }
}
