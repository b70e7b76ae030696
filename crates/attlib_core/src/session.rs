//! One opened attlib file and the lookups built on it.
//!
//! The pointer table is read at open; segment maps are parsed on first use
//! and kept for the session. Definitions pass through a bounded
//! [`MetadataCache`].

use crate::binding::{Binding, BindingSegment};
use crate::cache::{CachedAttr, MetadataCache};
use crate::config::SessionConfig;
use crate::consts::{SegmentKind, WORD_SIZE};
use crate::definition::{read_body, AttrDefinition, DataType, DefinitionSegment};
use crate::errors::{AttlibError, Result};
use crate::hash::{display_name, encode, HashValue};
use crate::index::IndexSegment;
use crate::noun::{NounIdentityMap, NounKey};
use crate::page::PageStore;
use crate::pointers::SegmentPointerTable;
use crate::stream::SegmentStream;
use crate::syntax::SyntaxTable;
use crate::value::{Value, ValueDecoder};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Words either side of an index slot checked by the fallback search.
const SLOT_RADIUS: usize = 5;

/// Attribute given by name or by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrKey {
    Name(String),
    Hash(HashValue),
}

impl From<&str> for AttrKey {
    fn from(s: &str) -> Self { AttrKey::Name(s.to_string()) }
}

impl From<String> for AttrKey {
    fn from(s: String) -> Self { AttrKey::Name(s) }
}

impl From<HashValue> for AttrKey {
    fn from(h: HashValue) -> Self { AttrKey::Hash(h) }
}

impl AttrKey {
    pub fn hash(&self) -> Result<HashValue> {
        match self {
            AttrKey::Name(n) => encode(n),
            AttrKey::Hash(h) => Ok(*h),
        }
    }
}

pub struct Attlib {
    store: PageStore,
    config: SessionConfig,
    pointers: SegmentPointerTable,
    anchors: Vec<HashValue>,
    index: OnceLock<Option<IndexSegment>>,
    definitions: OnceLock<DefinitionSegment>,
    bindings: OnceLock<BindingSegment>,
    syntax: OnceLock<SyntaxTable>,
    cache: MetadataCache,
    nouns: NounIdentityMap,
    decoder: ValueDecoder,
}

impl Attlib {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SessionConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let store = PageStore::open(path, &config.layout, config.page_cache_pages)?;
        Self::from_store(store, config)
    }

    pub fn from_store(store: PageStore, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let pointers = SegmentPointerTable::read(&store)?;
        let anchors = config.anchor_names.iter().map(|n| encode(n)).collect::<Result<Vec<_>>>()?;
        let cache = MetadataCache::new(config.metadata_cache_entries)?;
        debug!(pages = store.page_count(), pointers = ?pointers.pages(), "attlib session opened");
        Ok(Self {
            decoder: ValueDecoder::new(config.max_text_words),
            store,
            config,
            pointers,
            anchors,
            index: OnceLock::new(),
            definitions: OnceLock::new(),
            bindings: OnceLock::new(),
            syntax: OnceLock::new(),
            cache,
            nouns: NounIdentityMap::new(),
        })
    }

    pub fn store(&self) -> &PageStore { &self.store }
    pub fn config(&self) -> &SessionConfig { &self.config }
    pub fn pointers(&self) -> &SegmentPointerTable { &self.pointers }
    pub fn anchors(&self) -> &[HashValue] { &self.anchors }

    fn start_of(&self, slot: usize) -> u32 {
        self.pointers.start(slot).unwrap_or(u32::MAX)
    }

    /// ATGTIX, located once per session.
    pub fn index(&self) -> Result<&IndexSegment> {
        self.index
            .get_or_init(|| {
                IndexSegment::locate(&self.store, &self.pointers, self.config.segments.index, &self.anchors).ok()
            })
            .as_ref()
            .ok_or(AttlibError::SegmentNotFound(SegmentKind::Index.table_name()))
    }

    pub fn definitions(&self) -> &DefinitionSegment {
        self.definitions.get_or_init(|| {
            DefinitionSegment::load(&self.store, self.start_of(self.config.segments.definition), self.config.max_text_words)
        })
    }

    pub fn bindings(&self) -> &BindingSegment {
        self.bindings
            .get_or_init(|| BindingSegment::load(&self.store, self.start_of(self.config.segments.binding)))
    }

    pub fn syntax(&self) -> &SyntaxTable {
        self.syntax
            .get_or_init(|| SyntaxTable::load(&self.store, self.start_of(self.config.segments.syntax)))
    }

    /// Cache, then ATGTDF, then the fallback page search.
    pub fn get_definition(&self, hash: HashValue) -> Option<AttrDefinition> {
        if let Some(hit) = self.cache.get(hash) {
            return Some(hit.definition);
        }
        let def = match self.definitions().get(hash) {
            Some(d) => d.clone(),
            None => self.fallback_definition(hash)?,
        };
        if let Some(evicted) = self.cache.insert(def.clone()) {
            debug!(attr = %display_name(evicted), "metadata cache eviction");
        }
        Some(def)
    }

    pub fn definition_of(&self, key: impl Into<AttrKey>) -> Result<Option<AttrDefinition>> {
        let hash = key.into().hash()?;
        Ok(self.get_definition(hash))
    }

    /// Cached view of an attribute, without touching recency.
    pub fn attribute_metadata(&self, hash: HashValue) -> Option<CachedAttr> {
        self.cache.peek(hash)
    }

    pub fn cache_len(&self) -> usize { self.cache.len() }

    // Last resort for definitions missing from ATGTDF: search around the index
    // slot on the absolute page and on the ATGTDF-relative page, then scan the
    // allow-listed pages for `[hash][type code]`.
    fn fallback_definition(&self, hash: HashValue) -> Option<AttrDefinition> {
        warn!(attr = %display_name(hash), "definition not in ATGTDF, searching fallback pages");
        if let Some(entry) = self.index().ok().and_then(|ix| ix.lookup(hash).copied()) {
            let slot = entry.offset as usize;
            let window = slot.saturating_sub(SLOT_RADIUS)..=slot + SLOT_RADIUS;
            if let Some(def) = self.search_page(hash, entry.page, window.clone()) {
                return Some(def);
            }
            // same slot, page counted from the start of ATGTDF
            let relative = self.start_of(self.config.segments.definition).saturating_add(entry.page);
            if relative != entry.page {
                if let Some(def) = self.search_page(hash, relative, window) {
                    return Some(def);
                }
            }
        }
        for page in self.fallback_pages() {
            if let Some(def) = self.search_page(hash, page, 0..=usize::MAX) {
                return Some(def);
            }
        }
        debug!(attr = %display_name(hash), "fallback found nothing");
        None
    }

    fn fallback_pages(&self) -> Vec<u32> {
        let page_count = self.store.page_count();
        let mut pages: Vec<u32> = self
            .pointers
            .pages()
            .iter()
            .chain(self.config.fallback_pages.iter())
            .copied()
            .filter(|p| *p < page_count)
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    fn search_page(&self, hash: HashValue, page: u32, range: std::ops::RangeInclusive<usize>) -> Option<AttrDefinition> {
        let words = self.store.read_page(page).ok()?;
        let last = words.len().checked_sub(2)?;
        let (lo, hi) = (*range.start(), (*range.end()).min(last));
        for idx in lo..=hi {
            if words.word(idx) != Some(hash) {
                continue;
            }
            if !words.word(idx + 1).is_some_and(DataType::is_known_code) {
                continue;
            }
            let mut stream = SegmentStream::at(&self.store, page, idx + 1);
            if let Some(def) = read_body(&mut stream, hash, self.config.max_text_words) {
                debug!(attr = %display_name(hash), page, slot = idx, "definition recovered by fallback");
                return Some(def);
            }
        }
        None
    }

    pub fn register_noun(&self, id: u32, hash: HashValue) {
        self.nouns.register(id, hash);
    }

    pub fn nouns(&self) -> Vec<NounKey> {
        self.bindings().nouns()
    }

    fn binding_offset(&self, noun: NounKey, attr: HashValue) -> Option<u32> {
        let b = self.bindings();
        b.offset(noun, attr)
            .or_else(|| self.nouns.counterpart(noun).and_then(|other| b.offset(other, attr)))
    }

    pub fn bindings_for(&self, noun: impl Into<NounKey>) -> Vec<Binding> {
        let noun = noun.into();
        let b = self.bindings();
        if b.contains_noun(noun) {
            return b.bindings_for(noun);
        }
        self.nouns.counterpart(noun).map(|other| b.bindings_for(other)).unwrap_or_default()
    }

    /// Syntactic applicability, through the noun identity map when needed.
    pub fn is_applicable(&self, noun: impl Into<NounKey>, attr: HashValue) -> bool {
        let noun = noun.into();
        let t = self.syntax();
        t.is_applicable(noun, attr) || self.nouns.counterpart(noun).is_some_and(|other| t.is_applicable(other, attr))
    }

    /// Decode `attr` of `noun` from that noun's instance block.
    pub fn resolve_value(&self, noun: impl Into<NounKey>, attr: HashValue, instance: &[u8]) -> Result<Value> {
        let noun = noun.into();
        let word_offset = self
            .binding_offset(noun, attr)
            .ok_or_else(|| AttlibError::MissingBinding { noun: noun.to_string(), attr })?;
        let def = self.get_definition(attr).ok_or(AttlibError::MissingDefinition(attr))?;
        let byte_offset = word_offset as usize * WORD_SIZE;
        let value = self.decoder.decode(instance, byte_offset, def.data_type)?;
        self.cache.record_offset(attr, byte_offset);
        Ok(value)
    }

    /// Like [`Attlib::resolve_value`], with lookup misses as `None`.
    pub fn value_of(&self, noun: impl Into<NounKey>, attr: impl Into<AttrKey>, instance: &[u8]) -> Result<Option<Value>> {
        let attr = attr.into().hash()?;
        match self.resolve_value(noun, attr, instance) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_absent() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve against an instance block stored in another paged file.
    pub fn value_in_store(
        &self,
        noun: impl Into<NounKey>,
        attr: HashValue,
        data: &PageStore,
        page: u32,
        byte_offset: usize,
    ) -> Result<Value> {
        let block = data.block(page, byte_offset)?;
        self.resolve_value(noun, attr, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::consts::SEGMENT_END;
    use crate::utils::words_to_be_bytes;

    fn h(name: &str) -> u32 { encode(name).unwrap() }

    fn session(b: &ImageBuilder, config: SessionConfig) -> Attlib {
        let store = PageStore::from_bytes(b.to_bytes(), &config.layout, 16).unwrap();
        Attlib::from_store(store, config).unwrap()
    }

    fn fixture() -> ImageBuilder {
        let mut b = ImageBuilder::new();
        b.pointers([3, 4, 5, 6, 6, 6, 6, 6]);
        b.page(3, &[h("POS"), 6, 1, h("NAME"), 4, 1, h("BORE"), 2, 2, 25.0f32.to_bits(), SEGMENT_END]);
        b.page(4, &[h("POS"), 42, 1, h("NAME"), 42, 4, h("BORE"), h("ELBO"), 2, SEGMENT_END]);
        b.page(5, &[h("POS"), h("ELBO"), 1, SEGMENT_END]);
        b.page(6, &[SEGMENT_END]);
        b
    }

    #[test]
    fn is_send_and_sync() {
        fn check<T: Send + Sync>() {}
        check::<Attlib>();
    }

    #[test]
    fn resolves_values_through_bindings() {
        let s = session(&fixture(), SessionConfig::default());
        let mut words = vec![0u32; 8];
        words[1..4].copy_from_slice(&[1.0f32.to_bits(), 2.0f32.to_bits(), 3.0f32.to_bits()]);
        words[4..8].copy_from_slice(&[3, 'A' as u32, 'B' as u32, 1]);
        let buf = words_to_be_bytes(&words);
        assert_eq!(s.resolve_value(42u32, h("POS"), &buf).unwrap(), Value::Position([1.0, 2.0, 3.0]));
        assert_eq!(s.value_of(42u32, "NAME", &buf).unwrap(), Some(Value::Text("AB?".into())));
        assert_eq!(s.attribute_metadata(h("POS")).unwrap().last_offset, Some(4));
    }

    #[test]
    fn lookup_misses_are_absent() {
        let s = session(&fixture(), SessionConfig::default());
        let buf = [0u8; 64];
        assert!(matches!(s.resolve_value(7u32, h("POS"), &buf), Err(AttlibError::MissingBinding { .. })));
        assert_eq!(s.value_of(7u32, "POS", &buf).unwrap(), None);
        // ELBO binds BORE, but buffer is too short for the offset
        assert!(matches!(
            s.resolve_value(h("ELBO"), h("BORE"), &buf[..8]),
            Err(AttlibError::OffsetOutOfRange { offset: 8, width: 4, len: 8 })
        ));
    }

    #[test]
    fn definitions_by_name_and_hash() {
        let s = session(&fixture(), SessionConfig::default());
        let bore = s.definition_of("BORE").unwrap().unwrap();
        assert_eq!(bore.typed_default(), Some(Value::Real(25.0)));
        assert_eq!(s.definition_of(h("POS")).unwrap().unwrap().data_type, DataType::Position);
        assert_eq!(s.definition_of("XXXX").unwrap(), None);
        assert!(s.definition_of("TOOLONGNAME").is_err());
    }

    #[test]
    fn noun_identity_links_segments() {
        let s = session(&fixture(), SessionConfig::default());
        let elbo = NounKey::ByHash(h("ELBO"));
        assert_eq!(s.bindings_for(42u32).len(), 2);
        assert!(s.is_applicable(elbo, h("POS")));
        assert!(!s.is_applicable(42u32, h("POS")));
        s.register_noun(42, h("ELBO"));
        assert!(s.is_applicable(42u32, h("POS")));
        assert_eq!(s.bindings_for(elbo).len(), 1);
        let buf = words_to_be_bytes(&[0, 0, 7, 0]);
        // 42 has no BORE binding of its own; the registered ELBO pairing supplies it
        assert_eq!(s.resolve_value(42u32, h("BORE"), &buf).unwrap(), Value::Real(f32::from_bits(7)));
        assert_eq!(s.nouns(), vec![NounKey::BySequentialId(42), elbo]);
    }

    #[test]
    fn fallback_scans_allow_listed_pages() {
        let mut b = fixture();
        // a definition outside ATGTDF, preceded by noise
        b.page(8, &[5, h("ANGL"), 99, h("ANGL"), 2, 1, SEGMENT_END]);
        let mut cfg = SessionConfig::default();
        let s = session(&b, cfg.clone());
        assert!(s.get_definition(h("ANGL")).is_none());

        cfg.fallback_pages = vec![8];
        let s = session(&b, cfg);
        let def = s.get_definition(h("ANGL")).unwrap();
        assert_eq!(def.data_type, DataType::Real);
        assert_eq!(s.cache_len(), 1);
    }

    #[test]
    fn index_page_relative_to_definition_segment() {
        let mut b = ImageBuilder::new();
        b.pointers([3, 4, 5, 6, 6, 6, 6, 6]);
        b.page(3, &[SEGMENT_END]);
        b.page(4, &[SEGMENT_END]);
        b.page(5, &[SEGMENT_END]);
        // ANGL indexed at page 6 slot 100; the record sits at page 3 + 6
        b.page(6, &[h("ELBO"), 1, h("ANGL"), 6 * 512 + 100, SEGMENT_END]);
        b.words_at(9, 100, &[h("ANGL"), 2, 1]);
        let s = session(&b, SessionConfig::default());

        assert_eq!(s.index().unwrap().lookup(h("ANGL")).unwrap().page, 6);
        let def = s.get_definition(h("ANGL")).unwrap();
        assert_eq!(def.data_type, DataType::Real);
    }
}
