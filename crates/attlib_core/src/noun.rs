//! Noun identifiers.
//!
//! ATNAIN and ATGTSX both key records by a noun word, but the word is a
//! small sequential id in some files and a name hash in others. The two are
//! kept apart as [`NounKey`] variants and only linked through pairs a caller
//! registers in [`NounIdentityMap`].

use crate::hash::{display_name, is_name_hash, HashValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NounKey {
    BySequentialId(u32),
    ByHash(HashValue),
}

impl NounKey {
    pub fn classify(word: u32) -> Self {
        if is_name_hash(word) { NounKey::ByHash(word) } else { NounKey::BySequentialId(word) }
    }

    pub fn raw(self) -> u32 {
        match self {
            NounKey::BySequentialId(v) | NounKey::ByHash(v) => v,
        }
    }
}

impl From<u32> for NounKey {
    fn from(word: u32) -> Self {
        NounKey::classify(word)
    }
}

impl fmt::Display for NounKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NounKey::BySequentialId(id) => write!(f, "id {id}"),
            NounKey::ByHash(h) => f.write_str(&display_name(*h)),
        }
    }
}

#[derive(Default)]
struct Pairs {
    by_id: HashMap<u32, HashValue>,
    by_hash: HashMap<HashValue, u32>,
}

/// Caller-registered `(sequential id, noun hash)` pairs.
#[derive(Default)]
pub struct NounIdentityMap {
    inner: RwLock<Pairs>,
}

impl NounIdentityMap {
    pub fn new() -> Self { Self::default() }

    /// Link an id to a hash, replacing any earlier pairing of either side.
    pub fn register(&self, id: u32, hash: HashValue) {
        let mut g = self.inner.write();
        if let Some(old_hash) = g.by_id.insert(id, hash) {
            g.by_hash.remove(&old_hash);
        }
        if let Some(old_id) = g.by_hash.insert(hash, id) {
            if old_id != id {
                g.by_id.remove(&old_id);
            }
        }
    }

    /// The other form of `key`, if registered.
    pub fn counterpart(&self, key: NounKey) -> Option<NounKey> {
        let g = self.inner.read();
        match key {
            NounKey::BySequentialId(id) => g.by_id.get(&id).map(|h| NounKey::ByHash(*h)),
            NounKey::ByHash(h) => g.by_hash.get(&h).map(|id| NounKey::BySequentialId(*id)),
        }
    }

    pub fn len(&self) -> usize { self.inner.read().by_id.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::encode;

    #[test]
    fn classifies_by_range() {
        let elbo = encode("ELBO").unwrap();
        assert_eq!(NounKey::from(42), NounKey::BySequentialId(42));
        assert_eq!(NounKey::from(elbo), NounKey::ByHash(elbo));
        assert_eq!(NounKey::ByHash(elbo).to_string(), "ELBO");
        assert_eq!(NounKey::BySequentialId(7).to_string(), "id 7");
    }

    #[test]
    fn counterparts_follow_registration() {
        let m = NounIdentityMap::new();
        let pipe = encode("PIPE").unwrap();
        let elbo = encode("ELBO").unwrap();
        assert_eq!(m.counterpart(NounKey::BySequentialId(3)), None);
        m.register(3, pipe);
        assert_eq!(m.counterpart(NounKey::BySequentialId(3)), Some(NounKey::ByHash(pipe)));
        assert_eq!(m.counterpart(NounKey::ByHash(pipe)), Some(NounKey::BySequentialId(3)));
        m.register(3, elbo);
        assert_eq!(m.counterpart(NounKey::ByHash(pipe)), None);
        assert_eq!(m.len(), 1);
        m.register(4, elbo);
        assert_eq!(m.counterpart(NounKey::BySequentialId(3)), None);
        assert_eq!(m.counterpart(NounKey::ByHash(elbo)), Some(NounKey::BySequentialId(4)));
    }
}
