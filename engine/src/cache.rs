//! FILENAME: engine/src/cache.rs
//! PURPOSE: Bounded cache of compiled fields keyed by expression text.
//! CONTEXT: Every operation names its field by the raw expression string.
//! Compiling is far more expensive than a lookup, so compiled fields are
//! kept in insertion order and the oldest entry is dropped once the cache
//! is full. Hits do not refresh an entry's position (FIFO, not LRU).
//!
//! Keys are normalized expressions (outer whitespace and one matching pair
//! of enclosing parentheses removed), so "(x, y, z)" and "x, y, z" share an
//! entry. Inner spacing is significant: "x,y,z" is a different key.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::field::CompiledField;
use crate::limits::DEFAULT_CACHE_CAPACITY;
use field_parser::{normalize, GrammarError};

#[derive(Debug)]
pub struct FieldCache {
    capacity: usize,
    entries: Mutex<IndexMap<String, Arc<CompiledField>>>,
}

impl Default for FieldCache {
    fn default() -> Self {
        FieldCache::new()
    }
}

impl FieldCache {
    pub fn new() -> Self {
        FieldCache::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// A cache holding at most `capacity` fields (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        FieldCache {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<CompiledField>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the compiled field for `expression`, compiling and inserting
    /// it on a miss. Failed compilations are not cached.
    pub fn get_or_compile(&self, expression: &str) -> Result<Arc<CompiledField>, GrammarError> {
        let key = normalize(expression);
        if let Some(field) = self.lock().get(&key) {
            log::trace!("[CACHE] hit '{}'", key);
            return Ok(Arc::clone(field));
        }

        // Compile without holding the lock; a concurrent caller may win the race
        let compiled = Arc::new(CompiledField::compile(&key)?);

        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                log::debug!("[CACHE] evicted '{}'", evicted);
            }
        }
        log::debug!(
            "[CACHE] compiled '{}' ({}/{})",
            key,
            entries.len() + 1,
            self.capacity
        );
        entries.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.lock().contains_key(&normalize(expression))
    }

    /// Cached (normalized) expressions, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn field(i: usize) -> String {
        format!("(x + {}, y, z)", i)
    }

    #[test]
    fn test_repeat_lookups_share_one_compilation() {
        let cache = FieldCache::new();
        let first = cache.get_or_compile("(-y, x, 0)").unwrap();
        let second = cache.get_or_compile("(-y, x, 0)").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_normalized() {
        let cache = FieldCache::new();
        let a = cache.get_or_compile("(x, y, z)").unwrap();
        let b = cache.get_or_compile("  x, y, z ").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.keys(), vec!["x, y, z".to_string()]);

        let c = cache.get_or_compile("x,y,z").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cached_field_keeps_normalized_text() {
        let cache = FieldCache::new();
        let field = cache.get_or_compile("  (-y, x, 0) ").unwrap();
        assert_eq!(field.expression(), "-y, x, 0");
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_cached() {
        let cache = FieldCache::new();
        let deep = format!("({}x{}, y, z)", "(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(
            cache.get_or_compile(&deep),
            Err(GrammarError::UnsupportedConstruct { .. })
        ));

        let signs = format!("({}x, y, z)", "-".repeat(20_000));
        assert!(matches!(
            cache.get_or_compile(&signs),
            Err(GrammarError::UnsupportedConstruct { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fifo_eviction_ignores_hits() {
        let cache = FieldCache::new();
        for i in 1..=32 {
            cache.get_or_compile(&field(i)).unwrap();
        }
        assert_eq!(cache.len(), 32);

        // A hit on the oldest entry does not move it to the back
        cache.get_or_compile(&field(1)).unwrap();
        cache.get_or_compile(&field(33)).unwrap();

        assert_eq!(cache.len(), 32);
        assert!(!cache.contains(&field(1)));
        assert!(cache.contains(&field(2)));
        assert!(cache.contains(&field(33)));
        assert_eq!(cache.keys().first(), Some(&normalize(&field(2))));
    }

    #[test]
    fn test_failed_compilation_is_not_cached() {
        let cache = FieldCache::with_capacity(2);
        assert!(cache.get_or_compile("(x, y)").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_small_capacity() {
        let cache = FieldCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache.get_or_compile(&field(1)).unwrap();
        cache.get_or_compile(&field(2)).unwrap();
        assert_eq!(cache.keys(), vec![normalize(&field(2))]);
    }

    #[test]
    fn test_concurrent_callers_share_entry() {
        let cache = Arc::new(FieldCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_compile("(x*y, z, 1)").unwrap())
            })
            .collect();
        let fields: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.len(), 1);
        let cached = cache.get_or_compile("(x*y, z, 1)").unwrap();
        assert!(fields.iter().all(|f| f.evaluate(&[2.0, 3.0, 4.0]) == [6.0, 4.0, 1.0]));
        assert!(Arc::ptr_eq(&cached, &cache.get_or_compile("(x*y, z, 1)").unwrap()));
    }
}
