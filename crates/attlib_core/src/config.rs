//! Session configuration.
//!
//! Everything here has a default matching the files seen in the field; a JSON
//! file may override any subset of fields.

use crate::consts::{DATA_REGION_START, PAGE_SIZE, SEGMENT_POINTERS_OFFSET, SEGMENT_POINTER_COUNT, WORD_SIZE};
use crate::errors::{AttlibError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How raw segment-pointer entries map to page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerUnit {
    Pages,
    Bytes,
    /// Bytes if any entry exceeds the page count, pages otherwise.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub data_region_start: u64,
    pub page_size: usize,
    pub pointer_table_offset: u64,
    pub pointer_unit: PointerUnit,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            data_region_start: DATA_REGION_START,
            page_size: PAGE_SIZE,
            pointer_table_offset: SEGMENT_POINTERS_OFFSET,
            pointer_unit: PointerUnit::Pages,
        }
    }
}

impl LayoutConfig {
    pub fn words_per_page(&self) -> usize {
        self.page_size / WORD_SIZE
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size % WORD_SIZE != 0 {
            return Err(AttlibError::InvalidConfig(format!(
                "page_size {} is not a positive multiple of {WORD_SIZE}",
                self.page_size
            )));
        }
        let table_end = self.pointer_table_offset.saturating_add((SEGMENT_POINTER_COUNT * WORD_SIZE) as u64);
        if table_end > self.data_region_start {
            return Err(AttlibError::InvalidConfig(format!(
                "pointer table ends at byte {table_end}, past data region start {}",
                self.data_region_start
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexLocation {
    /// Anchor-based scan over every page.
    Discover,
    /// Start at this pointer-table slot; discovery if it fails acceptance.
    Pointer(usize),
}

/// Pointer-table slot feeding each segment parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentSlots {
    pub definition: usize,
    pub binding: usize,
    pub syntax: usize,
    pub index: IndexLocation,
}

impl Default for SegmentSlots {
    fn default() -> Self {
        Self { definition: 0, binding: 1, syntax: 2, index: IndexLocation::Discover }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    pub segments: SegmentSlots,
    pub page_cache_pages: usize,
    pub metadata_cache_entries: usize,
    pub anchor_names: Vec<String>,
    pub fallback_pages: Vec<u32>,
    pub max_text_words: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            segments: SegmentSlots::default(),
            page_cache_pages: 256,
            metadata_cache_entries: 64,
            anchor_names: vec!["ELBO".to_string(), "SITE".to_string()],
            fallback_pages: Vec::new(),
            max_text_words: 1024,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: SessionConfig = serde_json::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if self.page_cache_pages == 0 || self.metadata_cache_entries == 0 {
            return Err(AttlibError::InvalidConfig("cache capacities must be non-zero".into()));
        }
        let slots = [self.segments.definition, self.segments.binding, self.segments.syntax];
        if let Some(bad) = slots.iter().find(|s| **s >= SEGMENT_POINTER_COUNT) {
            return Err(AttlibError::InvalidConfig(format!("segment slot {bad} out of range")));
        }
        if let IndexLocation::Pointer(slot) = self.segments.index {
            if slot >= SEGMENT_POINTER_COUNT {
                return Err(AttlibError::InvalidConfig(format!("index slot {slot} out of range")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SessionConfig = serde_json::from_str(
            r#"{ "metadata_cache_entries": 8, "segments": { "index": { "pointer": 3 } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.metadata_cache_entries, 8);
        assert_eq!(cfg.segments.index, IndexLocation::Pointer(3));
        assert_eq!(cfg.segments.binding, 1);
        assert_eq!(cfg.layout.page_size, PAGE_SIZE);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_bad_layout() {
        let mut cfg = SessionConfig::default();
        cfg.layout.page_size = 2050;
        assert!(matches!(cfg.validate(), Err(AttlibError::InvalidConfig(_))));
        let mut cfg = SessionConfig::default();
        cfg.metadata_cache_entries = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pointer_table_must_precede_data_region() {
        let mut layout = LayoutConfig::default();
        layout.pointer_table_offset = layout.data_region_start - 32;
        layout.validate().unwrap();
        layout.pointer_table_offset += 4;
        assert!(matches!(layout.validate(), Err(AttlibError::InvalidConfig(_))));
    }
}
