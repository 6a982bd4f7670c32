//! Memoizing wrapper for any [`Embedder`].
//!
//! Two independent LRU maps: one keyed by a single text, one keyed by the
//! exact ordered list of texts in a batch. A batch that shares all but one
//! text with a cached batch is a miss. Errors are passed through and never
//! stored.

use super::{Embedder, check_batch, check_vector};
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Hit/miss counters across both maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct LruMap<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> LruMap<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key)?.clone();
        self.touch(key);
        Some(value)
    }

    fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// An [`Embedder`] that remembers recent results of the one it wraps.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    single: Mutex<LruMap<String, Vec<f32>>>,
    batch: Mutex<LruMap<Vec<String>, Vec<Vec<f32>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    /// Wrap `inner` with `capacity` entries per map; 0 disables caching.
    #[must_use]
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            single: Mutex::new(LruMap::new(capacity)),
            batch: Mutex::new(LruMap::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Entries currently held as `(single, batch)`.
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (lock(&self.single).len(), lock(&self.batch).len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == (0, 0)
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Embedder for CachedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = text.to_owned();
        if let Some(hit) = lock(&self.single).get(&key) {
            self.record(true);
            trace!("embedding cache hit");
            return Ok(hit);
        }
        self.record(false);

        // The lock is not held across inference; two threads missing on the
        // same text both compute it and the second insert wins.
        let vector = self.inner.embed(text)?;
        check_vector(self.inner.dimension(), &vector)?;
        lock(&self.single).insert(key, vector.clone());
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let key: Vec<String> = texts.iter().map(|t| (*t).to_owned()).collect();
        if let Some(hit) = lock(&self.batch).get(&key) {
            self.record(true);
            trace!(texts = texts.len(), "embedding batch cache hit");
            return Ok(hit);
        }
        self.record(false);

        let vectors = self.inner.embed_batch(texts)?;
        check_batch(texts.len(), self.inner.dimension(), &vectors)?;
        lock(&self.batch).insert(key, vectors.clone());
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

// A panic while holding the lock leaves the map structurally valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
