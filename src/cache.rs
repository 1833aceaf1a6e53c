use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lru::LruCache;
use roaring::RoaringBitmap;
use tracing::trace;

use crate::config::EngineConfig;
use crate::container::AttributeContainer;
use crate::engine::AttributeMatcher;
use crate::error::MatchError;
use crate::metrics::metrics_recorder;
use crate::schema::{AttributesSchema, SchemaFingerprint};
use crate::types::HasAttributes;

/// Structural identity of one match request: the five inputs that determine
/// the answer. Candidate containers are snapshotted at construction time, so
/// a live container mutated later cannot silently invalidate a cached entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    consumer_schema: SchemaFingerprint,
    producer_schema: SchemaFingerprint,
    candidates: Vec<AttributeContainer>,
    consumer_attributes: AttributeContainer,
    filter: Option<AttributeContainer>,
}

impl CacheKey {
    fn new<T: HasAttributes>(
        consumer_schema: &AttributesSchema,
        producer_schema: &AttributesSchema,
        candidates: &[T],
        consumer_attributes: &AttributeContainer,
        filter: Option<&AttributeContainer>,
    ) -> Self {
        Self {
            consumer_schema: consumer_schema.fingerprint(),
            producer_schema: producer_schema.fingerprint(),
            candidates: candidates
                .iter()
                .map(|candidate| candidate.attributes().clone())
                .collect(),
            consumer_attributes: consumer_attributes.clone(),
            filter: filter.cloned(),
        }
    }
}

/// Hit/miss counters, populated when
/// [`EngineConfig::record_stats`](crate::EngineConfig) is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Bounded, thread-safe memoization of match results.
///
/// Entries are bitmaps over candidate positions in the request's input order;
/// a hit reconstructs the filtered candidate list by index. Exceeding
/// capacity evicts the least-recently-used entry, never blocks or fails.
#[derive(Debug)]
pub struct MatchCache {
    entries: Mutex<LruCache<CacheKey, RoaringBitmap>>,
    hits: AtomicU64,
    misses: AtomicU64,
    record_stats: bool,
}

impl MatchCache {
    pub fn new(capacity: usize) -> Result<Self, MatchError> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            MatchError::InvalidConfig("cache_capacity must be greater than zero".into())
        })?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            record_stats: false,
        })
    }

    pub fn with_config(config: &EngineConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let mut cache = Self::new(config.cache_capacity)?;
        cache.record_stats = config.record_stats;
        Ok(cache)
    }

    fn lookup(&self, key: &CacheKey) -> Option<RoaringBitmap> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let hit = entries.get(key).cloned();
        if self.record_stats {
            match hit {
                Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
                None => self.misses.fetch_add(1, Ordering::Relaxed),
            };
        }
        hit
    }

    fn insert(&self, key: CacheKey, bits: RoaringBitmap) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Concurrent misses for the same key may race here; last writer wins,
        // and both writers computed the same answer.
        entries.put(key, bits);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// [`AttributeMatcher`] with a [`MatchCache`] in front.
///
/// Externally identical to the uncached matcher: `cached.matches(x)` always
/// equals `AttributeMatcher::matches(x)`. Callers must pass candidates in a
/// stable order for a given logical request, since entries are positional.
pub struct CachedMatcher {
    matcher: AttributeMatcher,
    cache: MatchCache,
}

impl CachedMatcher {
    pub fn new(config: EngineConfig) -> Result<Self, MatchError> {
        Ok(Self {
            matcher: AttributeMatcher::new(),
            cache: MatchCache::with_config(&config)?,
        })
    }

    /// Memoized form of [`AttributeMatcher::matches`].
    pub fn matches<'a, T: HasAttributes>(
        &self,
        consumer_schema: &AttributesSchema,
        producer_schema: &AttributesSchema,
        candidates: &'a [T],
        consumer_attributes: &AttributeContainer,
        filter: Option<&AttributeContainer>,
    ) -> Result<Vec<&'a T>, MatchError> {
        let start = Instant::now();
        let key = CacheKey::new(
            consumer_schema,
            producer_schema,
            candidates,
            consumer_attributes,
            filter,
        );

        if let Some(bits) = self.cache.lookup(&key) {
            trace!(candidates = candidates.len(), "match_cache_hit");
            let result: Vec<&T> = candidates
                .iter()
                .enumerate()
                .filter(|(index, _)| bits.contains(*index as u32))
                .map(|(_, candidate)| candidate)
                .collect();
            if let Some(recorder) = metrics_recorder() {
                recorder.record_match(start.elapsed(), candidates.len(), result.len(), true);
            }
            return Ok(result);
        }

        let indices = self.matcher.match_indices(
            consumer_schema,
            producer_schema,
            candidates,
            consumer_attributes,
            filter,
        )?;
        let bits: RoaringBitmap = indices.iter().map(|index| *index as u32).collect();
        self.cache.insert(key, bits);
        Ok(indices.into_iter().map(|index| &candidates[index]).collect())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
