use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// A named, bounded LRU map. Values are cloned out, so large values should be
/// stored behind an `Arc`.
pub struct RecencyCache<K: Hash + Eq, V: Clone> {
    name: &'static str,
    cache: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> RecencyCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        debug!("{} cache capacity: {} entries", name, capacity);

        Self {
            name,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: K, value: V) {
        self.cache.lock().unwrap().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock().unwrap();
        if !cache.is_empty() {
            debug!("Clearing {} cache, current count: {}", self.name, cache.len());
        }
        cache.clear();
    }
}
