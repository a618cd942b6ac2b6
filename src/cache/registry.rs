//! Bidirectional tag index.
//!
//! Tracks which cache keys provide which tags so a write's invalidated tags
//! resolve to the exact set of cached reads to mark stale.

use std::collections::{HashMap, HashSet};

use super::keys::{CacheKey, Tag};

/// Tracks tag → cache_keys and cache_key → tags mappings.
///
/// Derived state: always reconstructable from the live cache entries. It has
/// no lock of its own; the owning store guards it together with the entries.
#[derive(Debug, Default)]
pub struct TagIndex {
    /// Maps tags to all cache keys that currently provide them
    tag_to_keys: HashMap<Tag, HashSet<CacheKey>>,
    /// Maps cache keys to all tags they provide
    key_to_tags: HashMap<CacheKey, HashSet<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tags a cache key provides.
    ///
    /// Replaces whatever the key provided before, so a refetched list that
    /// lost an item stops answering for that item's tag.
    pub fn register(&mut self, cache_key: CacheKey, tags: HashSet<Tag>) {
        self.unregister(&cache_key);
        if tags.is_empty() {
            return;
        }

        for tag in &tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(cache_key.clone());
        }
        self.key_to_tags.insert(cache_key, tags);
    }

    /// Union of the keys providing any of `tags`.
    pub fn keys_for<'a, I>(&self, tags: I) -> HashSet<CacheKey>
    where
        I: IntoIterator<Item = &'a Tag>,
    {
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(providers) = self.tag_to_keys.get(tag) {
                keys.extend(providers.iter().cloned());
            }
        }
        keys
    }

    /// Keys providing at least one tag accepted by `predicate`.
    pub fn keys_matching(&self, predicate: impl Fn(&Tag) -> bool) -> HashSet<CacheKey> {
        self.tag_to_keys
            .iter()
            .filter(|(tag, _)| predicate(tag))
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Get all tags that a cache key provides.
    pub fn tags_for(&self, cache_key: &CacheKey) -> HashSet<Tag> {
        self.key_to_tags.get(cache_key).cloned().unwrap_or_default()
    }

    /// Remove a cache key and clean up tag mappings.
    ///
    /// Called when a cache entry is evicted or reset.
    pub fn unregister(&mut self, cache_key: &CacheKey) {
        if let Some(tags) = self.key_to_tags.remove(cache_key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(cache_key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }

    /// Number of distinct tags with at least one provider.
    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    /// Number of keys providing at least one tag.
    pub fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{ResourceKind, TagType};

    fn product_key(id: &str) -> CacheKey {
        CacheKey::new(ResourceKind::Product, "detail", [id])
    }

    fn list_key(keyword: &str, page: &str) -> CacheKey {
        CacheKey::new(ResourceKind::Product, "list", [keyword, page])
    }

    fn tags(items: &[Tag]) -> HashSet<Tag> {
        items.iter().cloned().collect()
    }

    #[test]
    fn register_and_lookup() {
        let mut index = TagIndex::new();
        let tag = Tag::id(TagType::Product, "42");
        let key = product_key("42");

        index.register(key.clone(), tags(&[tag.clone()]));

        assert!(index.keys_for([&tag]).contains(&key));
        assert!(index.tags_for(&key).contains(&tag));
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let mut index = TagIndex::new();
        let key = product_key("42");
        index.register(key.clone(), tags(&[Tag::id(TagType::Product, "42")]));
        assert_eq!(index.key_count(), 1);
        assert_eq!(index.tag_count(), 1);

        index.unregister(&key);
        assert_eq!(index.key_count(), 0);
        assert_eq!(index.tag_count(), 0);
    }

    #[test]
    fn list_tag_groups_every_list_view() {
        let mut index = TagIndex::new();
        let list = Tag::list(TagType::Product);
        let first = list_key("", "1");
        let second = list_key("phone", "2");

        index.register(first.clone(), tags(&[list.clone(), Tag::id(TagType::Product, "a")]));
        index.register(second.clone(), tags(&[list.clone(), Tag::id(TagType::Product, "b")]));

        let keys = index.keys_for([&list]);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&first));
        assert!(keys.contains(&second));
    }

    #[test]
    fn concrete_tags_scope_lookups() {
        let mut index = TagIndex::new();
        index.register(product_key("7"), tags(&[Tag::id(TagType::Product, "7")]));

        let keys = index.keys_for([&Tag::id(TagType::Product, "42")]);
        assert!(keys.is_empty());
    }

    #[test]
    fn re_register_replaces_previous_tags() {
        let mut index = TagIndex::new();
        let key = list_key("", "1");
        index.register(
            key.clone(),
            tags(&[Tag::list(TagType::Product), Tag::id(TagType::Product, "gone")]),
        );
        index.register(key.clone(), tags(&[Tag::list(TagType::Product)]));

        assert!(index.keys_for([&Tag::id(TagType::Product, "gone")]).is_empty());
        assert!(index.keys_for([&Tag::list(TagType::Product)]).contains(&key));
    }

    #[test]
    fn keys_matching_filters_by_tag_type() {
        let mut index = TagIndex::new();
        let order_key = CacheKey::new(ResourceKind::Order, "detail", ["o1"]);
        index.register(order_key.clone(), tags(&[Tag::id(TagType::Order, "o1")]));
        index.register(product_key("p1"), tags(&[Tag::id(TagType::Product, "p1")]));

        let keys = index.keys_matching(|tag| tag.kind == TagType::Order);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&order_key));
    }

    #[test]
    fn clear_removes_all_mappings() {
        let mut index = TagIndex::new();
        index.register(product_key("1"), tags(&[Tag::id(TagType::Product, "1")]));
        assert!(index.key_count() > 0);

        index.clear();
        assert_eq!(index.key_count(), 0);
        assert_eq!(index.tag_count(), 0);
    }
}
