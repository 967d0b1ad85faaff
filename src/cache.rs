//! Content-addressed memoization of analytics results.
//!
//! Entries are keyed by the SHA-256 fingerprint of the record set, the
//! fingerprint of the grade scale, and the operation name with its
//! parameters. Two structurally identical uploads share entries no matter
//! which session produced them, and a cached value can never be served for
//! different inputs.
//!
//! The cache is `Send + Sync`: wrap it in an `Arc` to share it between
//! sessions. Reads take a shared lock; only misses take the write lock.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// SHA-256 digest identifying a value by content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Incremental hasher with an unambiguous encoding: strings are length
/// prefixed and floats hash by bit pattern.
pub struct FingerprintBuilder(Sha256);

impl FingerprintBuilder {
    /// `domain` separates fingerprints of different kinds of value.
    pub fn new(domain: &str) -> Self {
        let mut builder = Self(Sha256::new());
        builder.str(domain);
        builder
    }

    pub fn str(&mut self, value: &str) -> &mut Self {
        self.u64(value.len() as u64);
        self.0.update(value.as_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.0.update(value.to_le_bytes());
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        // -0.0 and 0.0 compare equal, so hash them equally.
        let value = if value == 0.0 { 0.0 } else { value };
        self.u64(value.to_bits())
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.0.finalize().into())
    }
}

/// Identifies one cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub records: Fingerprint,
    pub scale: Fingerprint,
    /// Operation name plus a fingerprint of its parameters.
    pub operation: String,
    pub params: Fingerprint,
}

impl CacheKey {
    pub fn new(records: Fingerprint, scale: Fingerprint, operation: &str) -> Self {
        Self::with_params(records, scale, operation, |_| {})
    }

    /// Builds a key whose parameters are fed through `params`.
    pub fn with_params(
        records: Fingerprint,
        scale: Fingerprint,
        operation: &str,
        params: impl FnOnce(&mut FingerprintBuilder),
    ) -> Self {
        let mut hasher = FingerprintBuilder::new(operation);
        params(&mut hasher);
        Self {
            records,
            scale,
            operation: operation.to_string(),
            params: hasher.finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct AnalyticsCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalyticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached value for `key`, computing and storing it
    /// on a miss.
    ///
    /// `compute` runs without holding any lock. If two callers miss on the
    /// same key at once both compute, and the first insert wins; the results
    /// are identical because the key is content-derived.
    pub fn get_or_compute<T, F>(&self, key: CacheKey, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.lookup::<T>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(operation = %key.operation, records = ?key.records, "Cache hit");
            return value;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(operation = %key.operation, records = ?key.records, "Cache miss, computing");
        let value = compute();

        let mut entries = self.entries.write();
        let stored = entries
            .entry(key)
            .or_insert_with(|| Arc::new(value.clone()) as Entry);
        stored.downcast_ref::<T>().cloned().unwrap_or(value)
    }

    fn lookup<T: Clone + 'static>(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read();
        entries.get(key)?.downcast_ref::<T>().cloned()
    }

    /// Drops every entry.
    pub fn invalidate(&self) {
        let mut entries = self.entries.write();
        debug!(dropped = entries.len(), "Cache invalidated");
        entries.clear();
    }

    /// Drops every entry computed from this record set and scale pair.
    /// Returns how many were removed.
    pub fn invalidate_inputs(&self, records: Fingerprint, scale: Fingerprint) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !(key.records == records && key.scale == scale));
        let dropped = before - entries.len();
        debug!(dropped, records = ?records, scale = ?scale, "Cache entries invalidated");
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for AnalyticsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fp(tag: &str) -> Fingerprint {
        FingerprintBuilder::new(tag).finish()
    }

    #[test]
    fn test_builder_is_deterministic() {
        let mut a = FingerprintBuilder::new("t");
        a.str("abc").f64(1.5);
        let mut b = FingerprintBuilder::new("t");
        b.str("abc").f64(1.5);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn test_length_prefix_separates_fields() {
        let mut a = FingerprintBuilder::new("t");
        a.str("ab").str("c");
        let mut b = FingerprintBuilder::new("t");
        b.str("a").str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        let mut a = FingerprintBuilder::new("t");
        a.f64(0.0);
        let mut b = FingerprintBuilder::new("t");
        b.f64(-0.0);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn test_hit_skips_recompute() {
        let cache = AnalyticsCache::new();
        let calls = Cell::new(0);
        let key = CacheKey::new(fp("r"), fp("s"), "cohort");

        let first: u32 = cache.get_or_compute(key.clone(), || {
            calls.set(calls.get() + 1);
            42
        });
        let second: u32 = cache.get_or_compute(key, || {
            calls.set(calls.get() + 1);
            7
        });

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_params_distinguish_keys() {
        let a = CacheKey::with_params(fp("r"), fp("s"), "top", |h| {
            h.u64(5);
        });
        let b = CacheKey::with_params(fp("r"), fp("s"), "top", |h| {
            h.u64(10);
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalidate_inputs_only_drops_matching_pair() {
        let cache = AnalyticsCache::new();
        let _: u8 = cache.get_or_compute(CacheKey::new(fp("r1"), fp("s"), "a"), || 1);
        let _: u8 = cache.get_or_compute(CacheKey::new(fp("r1"), fp("s"), "b"), || 2);
        let _: u8 = cache.get_or_compute(CacheKey::new(fp("r2"), fp("s"), "a"), || 3);

        assert_eq!(cache.invalidate_inputs(fp("r1"), fp("s")), 2);
        assert_eq!(cache.len(), 1);

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_readers_share_entries() {
        let cache = Arc::new(AnalyticsCache::new());
        let key = CacheKey::new(fp("r"), fp("s"), "gpa");
        let _: String = cache.get_or_compute(key.clone(), || "value".to_string());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || {
                    cache.get_or_compute::<String, _>(key, || "recomputed".to_string())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "value");
        }
        assert_eq!(cache.stats().misses, 1);
    }
}
