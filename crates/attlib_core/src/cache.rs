//! Bounded attribute metadata cache.
//!
//! Entries are derived from the definition segment and can always be rebuilt
//! from it, so eviction only costs a lookup.

use crate::definition::{AttrDefinition, DataType};
use crate::errors::{AttlibError, Result};
use crate::hash::HashValue;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedAttr {
    pub definition: AttrDefinition,
    /// Fixed width in words; `None` for text.
    pub width: Option<usize>,
    /// Byte offset of the most recent resolved read.
    pub last_offset: Option<usize>,
}

impl CachedAttr {
    pub fn data_type(&self) -> DataType {
        self.definition.data_type
    }
}

pub struct MetadataCache {
    inner: Mutex<LruCache<HashValue, CachedAttr>>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity)
            .ok_or_else(|| AttlibError::InvalidConfig("metadata cache capacity must be non-zero".into()))?;
        Ok(Self { inner: Mutex::new(LruCache::new(cap)) })
    }

    /// Lookup and mark as recently used.
    pub fn get(&self, hash: HashValue) -> Option<CachedAttr> {
        self.inner.lock().get(&hash).cloned()
    }

    /// Lookup without touching recency.
    pub fn peek(&self, hash: HashValue) -> Option<CachedAttr> {
        self.inner.lock().peek(&hash).cloned()
    }

    pub fn contains(&self, hash: HashValue) -> bool {
        self.inner.lock().contains(&hash)
    }

    /// Insert or refresh; returns the hash evicted to make room, if any.
    pub fn insert(&self, definition: AttrDefinition) -> Option<HashValue> {
        let hash = definition.hash;
        let mut g = self.inner.lock();
        if let Some(e) = g.get_mut(&hash) {
            e.width = definition.width();
            e.definition = definition;
            return None;
        }
        let entry = CachedAttr { width: definition.width(), definition, last_offset: None };
        g.push(hash, entry).map(|(evicted, _)| evicted)
    }

    pub fn record_offset(&self, hash: HashValue, byte_offset: usize) {
        if let Some(e) = self.inner.lock().get_mut(&hash) {
            e.last_offset = Some(byte_offset);
        }
    }

    pub fn len(&self) -> usize { self.inner.lock().len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn capacity(&self) -> usize { self.inner.lock().cap().get() }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DefaultFlag, DefaultValue};

    fn def(hash: u32, dt: DataType) -> AttrDefinition {
        AttrDefinition { hash, data_type: dt, default_flag: DefaultFlag::None, default: DefaultValue::None }
    }

    #[test]
    fn evicts_least_recently_used() {
        let c = MetadataCache::new(2).unwrap();
        assert_eq!(c.insert(def(1, DataType::Integer)), None);
        assert_eq!(c.insert(def(2, DataType::Position)), None);
        // touch 1 so 2 becomes the eviction candidate
        assert!(c.get(1).is_some());
        assert_eq!(c.insert(def(3, DataType::Text)), Some(2));
        assert!(c.contains(1) && c.contains(3) && !c.contains(2));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn keeps_width_and_offset() {
        let c = MetadataCache::new(4).unwrap();
        c.insert(def(9, DataType::Orientation));
        c.record_offset(9, 20);
        let e = c.peek(9).unwrap();
        assert_eq!((e.width, e.last_offset), (Some(9), Some(20)));
        // refreshing the definition keeps the recorded offset
        c.insert(def(9, DataType::Orientation));
        assert_eq!(c.peek(9).unwrap().last_offset, Some(20));
        assert_eq!(c.peek(9).unwrap().data_type(), DataType::Orientation);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(MetadataCache::new(0), Err(AttlibError::InvalidConfig(_))));
    }
}
