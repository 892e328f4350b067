#[cfg(test)]
mod tests {
    use depot_core::{
        CacheInvalidator, CacheKey, CachedValue, DepotCache, EntityDef, FieldDef,
        InMemoryCacheAdapter, Key, KeySet, MultiKey, TraverseWithFilter, Value,
    };
    use std::sync::{Arc, Mutex};

    static NOTE_FIELDS: [FieldDef; 3] = [
        FieldDef::new("owner", Value::Int32(None)).primary_key(),
        FieldDef::new("slot", Value::Int8(None)).primary_key(),
        FieldDef::new("text", Value::Varchar(None)),
    ];
    static NOTE: EntityDef = EntityDef::new("Note", &NOTE_FIELDS);

    fn cache() -> DepotCache {
        DepotCache::new(Some(Arc::new(InMemoryCacheAdapter::new())))
    }

    fn note(owner: i32, slot: i8) -> Key {
        Key::new(
            &NOTE,
            [("owner", Value::from(owner)), ("slot", Value::from(slot))],
        )
        .expect("Could not build the key")
    }

    fn text(value: &CachedValue) -> Option<&str> {
        value.downcast_ref::<String>().map(String::as_str)
    }

    #[test]
    fn store_lookup_invalidate() {
        let cache = cache();
        let key = note(1, 1).cache_key();
        assert!(cache.lookup(&key).is_none());
        cache.store(key.clone(), CachedValue::new(String::from("hello")));
        assert_eq!(cache.lookup(&key).as_ref().and_then(text), Some("hello"));

        cache.store(key.clone(), CachedValue::Null);
        let hit = cache.lookup(&key).expect("Null entries are hits");
        assert!(hit.is_null());

        cache.invalidate(&key);
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn namespaces_are_separate() {
        let cache = cache();
        let values = [Value::Int32(Some(1))];
        cache.store(CacheKey::new("A", values.clone()), CachedValue::new(1_i32));
        assert!(cache.lookup(&CacheKey::new("B", values.clone())).is_none());
        assert_eq!(
            cache
                .lookup(&CacheKey::new("A", values))
                .and_then(|v| v.downcast_ref::<i32>().copied()),
            Some(1)
        );
    }

    #[test]
    fn disabled_cache() {
        let cache = DepotCache::new(None);
        assert!(!cache.is_enabled());
        let key = CacheKey::simple("Anything");
        cache.store(key.clone(), CachedValue::new(3_u8));
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn listeners_hear_evictions() {
        let cache = cache();
        let heard = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = heard.clone();
        cache.add_listener(
            "Note",
            Arc::new(move |key: &CacheKey, previous: &CachedValue| {
                let text = previous.downcast_ref::<String>().cloned().unwrap_or_default();
                sink.lock().unwrap().push(format!("{} {}", key, text));
            }),
        );
        let key = note(1, 2).cache_key();
        cache.store(key.clone(), CachedValue::new(String::from("first")));
        assert!(heard.lock().unwrap().is_empty());

        cache.store(key.clone(), CachedValue::new(String::from("second")));
        cache.invalidate(&key);
        cache.invalidate(&key);
        assert_eq!(
            *heard.lock().unwrap(),
            [
                "[cacheId=Note, key=(1, 2)] first",
                "[cacheId=Note, key=(1, 2)] second",
            ]
        );
    }

    #[test]
    fn invalidators() {
        let cache = cache();
        for owner in 1..=3 {
            for slot in 1..=2 {
                cache.store(note(owner, slot).cache_key(), CachedValue::new(String::new()));
            }
        }
        note(1, 1).invalidate(&cache);
        assert!(cache.lookup(&note(1, 1).cache_key()).is_none());
        assert!(cache.lookup(&note(1, 2).cache_key()).is_some());

        KeySet::new(&NOTE, [note(2, 1), note(2, 2)])
            .expect("Key set")
            .invalidate(&cache);
        assert!(cache.lookup(&note(2, 1).cache_key()).is_none());
        assert!(cache.lookup(&note(2, 2).cache_key()).is_none());

        // Not covering the key, nothing is evicted
        MultiKey::new(&NOTE, Vec::<(&str, Value)>::new(), "slot", [1, 2])
            .expect("Multi key")
            .invalidate(&cache);
        assert!(cache.lookup(&note(3, 1).cache_key()).is_some());

        MultiKey::new(&NOTE, [("owner", 3)], "slot", [1])
            .expect("Multi key")
            .invalidate(&cache);
        assert!(cache.lookup(&note(3, 1).cache_key()).is_none());
        assert!(cache.lookup(&note(3, 2).cache_key()).is_some());
    }

    #[test]
    fn traverse_with_filter() {
        let cache = cache();
        for owner in 1..=4 {
            cache.store(
                note(owner, 1).cache_key(),
                CachedValue::new(format!("note {}", owner)),
            );
        }
        let even = TraverseWithFilter::new("Note", |key: &CacheKey, _: &CachedValue| {
            matches!(key.key.first(), Some(Value::Int32(Some(v))) if v % 2 == 0)
        });
        even.invalidate(&cache);
        let mut left = Vec::new();
        cache.traverse("Note", |_, value| {
            left.push(text(value).unwrap_or_default().to_owned())
        });
        left.sort();
        assert_eq!(left, ["note 1", "note 3"]);
    }
}
