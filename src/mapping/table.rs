use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::region::{Blank, MergeFrom, Region, RegionValue};

/// A named translation table: source key to per-region value.
///
/// Keys iterate in sorted order, which is also the published order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "K: Serialize, V: Serialize",
        deserialize = "K: Deserialize<'de> + Ord, V: Deserialize<'de>"
    )
)]
pub struct MappingTable<K, V = String> {
    entries: BTreeMap<K, RegionValue<V>>,
}

impl<K, V> Default for MappingTable<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> MappingTable<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&RegionValue<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut RegionValue<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get_mut(key)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Returns the record for `key`, inserting an empty one first if needed.
    pub fn entry_mut(&mut self, key: K) -> &mut RegionValue<V> {
        self.entries.entry(key).or_default()
    }

    pub fn insert(&mut self, key: K, value: RegionValue<V>) -> Option<RegionValue<V>> {
        self.entries.insert(key, value)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<RegionValue<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> btree_map::Keys<'_, K, RegionValue<V>> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, RegionValue<V>> {
        self.entries.iter()
    }

    /// Number of entries holding a value for `region`.
    #[must_use]
    pub fn filled(&self, region: Region) -> usize {
        self.entries
            .values()
            .filter(|v| v.get(region).is_some())
            .count()
    }
}

impl<K: Ord, V: Blank + PartialEq> MappingTable<K, V> {
    pub fn update(&mut self, key: K, region: Region, value: V, skip_exists: bool) -> bool {
        self.entry_mut(key).update(region, value, skip_exists)
    }
}

impl<K: Ord + Clone, V: MergeFrom + Clone> MappingTable<K, V> {
    /// Merges every record of `other` into this table, adding missing keys.
    pub fn merge_table(&mut self, other: &Self, prefer_self: bool) {
        for (key, theirs) in &other.entries {
            match self.entries.get_mut(key) {
                Some(mine) => mine.merge_from(theirs, prefer_self),
                None => {
                    self.entries.insert(key.clone(), theirs.clone());
                }
            }
        }
    }
}

impl MappingTable<String, String> {
    /// Registers a key without asserting any translation.
    pub fn register(&mut self, key: &str) {
        if key.is_empty() || self.entries.contains_key(key) {
            return;
        }
        self.entries.insert(key.to_string(), RegionValue::new());
    }

    /// Text update keyed by the Japanese source. A JP value equal to the key is
    /// implied by the key itself and is not stored.
    pub fn update_text(&mut self, key: &str, region: Region, value: &str, skip_exists: bool) -> bool {
        if key.is_empty() {
            return false;
        }
        let entry = self.entries.entry(key.to_string()).or_default();
        if region == Region::JP && value == key {
            return false;
        }
        entry.update(region, value.to_string(), skip_exists)
    }

    /// Translation of `key` for `region`. For JP the key is its own value
    /// unless an explicit JP value was stored.
    #[must_use]
    pub fn resolve<'a>(&'a self, key: &'a str, region: Region) -> Option<&'a str> {
        let stored = self
            .entries
            .get(key)
            .and_then(|v| v.get(region))
            .map(String::as_str);
        match (stored, region) {
            (Some(v), _) => Some(v),
            (None, Region::JP) => Some(key),
            (None, _) => None,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a MappingTable<K, V> {
    type Item = (&'a K, &'a RegionValue<V>);
    type IntoIter = btree_map::Iter<'a, K, RegionValue<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jp_value_equal_to_key_is_elided() {
        let mut table: MappingTable<String> = MappingTable::new();
        assert!(!table.update_text("アルトリア", Region::JP, "アルトリア", false));
        let entry = table.get("アルトリア").expect("key registered");
        assert!(entry.get(Region::JP).is_none());
        assert_eq!(table.resolve("アルトリア", Region::JP), Some("アルトリア"));
    }

    #[test]
    fn non_jp_value_equal_to_key_is_kept_by_the_table() {
        let mut table: MappingTable<String> = MappingTable::new();
        assert!(table.update_text("EX", Region::NA, "EX", true));
        assert_eq!(table.resolve("EX", Region::NA), Some("EX"));
    }

    #[test]
    fn merge_table_adds_missing_keys() {
        let mut a: MappingTable<String> = MappingTable::new();
        a.update_text("剣", Region::NA, "Saber", true);
        let mut b: MappingTable<String> = MappingTable::new();
        b.update_text("剣", Region::NA, "Sword", true);
        b.update_text("弓", Region::NA, "Archer", true);

        a.merge_table(&b, true);
        assert_eq!(a.resolve("剣", Region::NA), Some("Saber"));
        assert_eq!(a.resolve("弓", Region::NA), Some("Archer"));
    }

    #[test]
    fn id_keyed_tables_round_trip_through_json() {
        let mut table: MappingTable<i32> = MappingTable::new();
        table.update(301, Region::NA, "Dragon".to_string(), true);
        table.update(2, Region::CN, "女性".to_string(), true);
        let json = serde_json::to_string(&table).expect("serialize");
        assert_eq!(json, r#"{"2":{"CN":"女性"},"301":{"NA":"Dragon"}}"#);
        let back: MappingTable<i32> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, table);
    }
}
