//! The sorted key/value sequence both codecs operate on.

/// One key/value pair. The key is a character code or CID, the value a
/// glyph id or an advance width in font design units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: u32,
    pub value: u32,
}

/// A deduplicated sequence of entries, ascending by key.
///
/// Immutable once built; encoders borrow it for the duration of a single
/// encode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedMapping {
    entries: Vec<Entry>,
}

impl SortedMapping {
    /// Build a mapping from key/value pairs in any order.
    ///
    /// Pairs are sorted by key. When a key occurs more than once the last
    /// pair wins, matching map insertion semantics.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> SortedMapping {
        let mut entries: Vec<Entry> = pairs
            .into_iter()
            .map(|(key, value)| Entry { key, value })
            .collect();
        entries.sort_by_key(|entry| entry.key);
        entries.dedup_by(|curr, prev| {
            if curr.key == prev.key {
                prev.value = curr.value;
                true
            } else {
                false
            }
        });
        SortedMapping { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the value for `key`.
    pub fn get(&self, key: u32) -> Option<u32> {
        self.entries
            .binary_search_by_key(&key, |entry| entry.key)
            .ok()
            .map(|index| self.entries[index].value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.entries.iter().map(|entry| (entry.key, entry.value))
    }
}

impl FromIterator<(u32, u32)> for SortedMapping {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> SortedMapping {
        SortedMapping::from_pairs(iter)
    }
}
