//! Query resolution: concurrent position fetches, set algebra, and the
//! single-slot result cache.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::source::RangeSource;

use super::index::{PositionSet, TagIndex, fetch_positions};
use super::{ProgressFn, Query, SearchError};

/// Remembers the candidate offsets of the most recently resolved query.
///
/// Holds exactly one entry, replaced wholesale whenever a different query
/// resolves. Only fully combined results are stored.
#[derive(Debug, Default)]
pub struct QueryCache {
    slot: Mutex<Option<CachedQuery>>,
}

#[derive(Debug)]
struct CachedQuery {
    key: String,
    offsets: Arc<[u32]>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached offsets for `key`, if it is the query in the slot.
    pub fn get(&self, key: &str) -> Option<Arc<[u32]>> {
        self.lock()
            .as_ref()
            .filter(|cached| cached.key == key)
            .map(|cached| Arc::clone(&cached.offsets))
    }

    /// Replace the slot with a new result.
    pub fn store(&self, key: String, offsets: Arc<[u32]>) {
        *self.lock() = Some(CachedQuery { key, offsets });
    }

    /// Key of the query currently held, if any.
    pub fn cached_key(&self) -> Option<String> {
        self.lock().as_ref().map(|cached| cached.key.clone())
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Lock the slot, emptying it if a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, Option<CachedQuery>> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            warn!("Query cache lock poisoned, clearing cached result");
            self.slot.clear_poison();
            let mut slot = poisoned.into_inner();
            *slot = None;
            slot
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Include,
    Exclude,
}

/// Resolves include/exclude queries into candidate corpus offsets.
pub struct QueryResolver {
    index: Arc<TagIndex>,
    positions: Arc<dyn RangeSource>,
    cache: QueryCache,
    timeout: Duration,
}

impl QueryResolver {
    /// Create a resolver reading position sets from `positions`; every read
    /// is bounded by `timeout`.
    pub fn new(index: Arc<TagIndex>, positions: Arc<dyn RangeSource>, timeout: Duration) -> Self {
        Self {
            index,
            positions,
            cache: QueryCache::new(),
            timeout,
        }
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Resolve `query` into candidate offsets, sorted ascending.
    ///
    /// An empty query yields no candidates. Excluding without including is
    /// rejected, as is any tag missing from the index. Position sets are
    /// fetched concurrently; the first failed fetch aborts the others and
    /// leaves the cache untouched. `progress` receives one status line per
    /// completed fetch and one after the sets are combined.
    ///
    /// Dropping the returned future cancels every in-flight fetch.
    pub async fn resolve(
        &self,
        query: &Query,
        progress: Option<&ProgressFn>,
    ) -> Result<Arc<[u32]>, SearchError> {
        if query.is_empty() {
            return Ok(Arc::from(Vec::new()));
        }
        if query.include().is_empty() {
            return Err(SearchError::InvalidQuery(
                "cannot exclude without at least one include tag".to_string(),
            ));
        }

        let mut jobs = Vec::with_capacity(query.include().len() + query.exclude().len());
        for tag in query.include() {
            jobs.push((Role::Include, self.index.lookup(tag)?.clone()));
        }
        for tag in query.exclude() {
            jobs.push((Role::Exclude, self.index.lookup(tag)?.clone()));
        }

        let key = query.cache_key();
        if let Some(offsets) = self.cache.get(&key) {
            debug!(query = %key, candidates = offsets.len(), "Query cache hit");
            return non_empty(offsets);
        }

        let started = Instant::now();
        let total = jobs.len();
        let mut tasks = JoinSet::new();
        for (role, entry) in jobs {
            let source = Arc::clone(&self.positions);
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = fetch_positions(source.as_ref(), &entry, timeout).await;
                (role, result)
            });
        }

        let mut includes = Vec::with_capacity(query.include().len());
        let mut excluded = PositionSet::new();
        let mut processed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let (role, result) = joined?;
            let positions = result?;
            match role {
                Role::Include => includes.push(positions),
                Role::Exclude => excluded |= positions,
            }

            processed += 1;
            report(
                progress,
                &format!("Searching prompts... ({}%)", processed * 100 / total),
            );
        }

        let offsets: Arc<[u32]> = combine(includes, &excluded).iter().collect::<Vec<_>>().into();
        report(
            progress,
            &format!("Search complete: {} matching prompts", offsets.len()),
        );
        info!(
            query = %key,
            candidates = offsets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolved search query"
        );

        self.cache.store(key, Arc::clone(&offsets));
        non_empty(offsets)
    }
}

/// Intersect every include set, then subtract the excluded offsets.
fn combine(mut includes: Vec<PositionSet>, excluded: &PositionSet) -> PositionSet {
    // Smallest set first keeps the running intersection small.
    includes.sort_by_key(|set| set.len());
    let mut sets = includes.into_iter();
    let Some(mut result) = sets.next() else {
        return PositionSet::new();
    };
    for set in sets {
        result &= set;
    }
    result -= excluded;
    result
}

fn non_empty(offsets: Arc<[u32]>) -> Result<Arc<[u32]>, SearchError> {
    if offsets.is_empty() {
        Err(SearchError::NoMatches)
    } else {
        Ok(offsets)
    }
}

fn report(progress: Option<&ProgressFn>, status: &str) {
    if let Some(progress) = progress {
        progress(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[u32]) -> PositionSet {
        values.iter().copied().collect()
    }

    #[test]
    fn test_combine_and_not() {
        let result = combine(vec![set(&[1, 2, 3, 4]), set(&[2, 3, 4, 9])], &set(&[3]));
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_combine_disjoint() {
        let result = combine(vec![set(&[1]), set(&[2])], &PositionSet::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_cache_single_slot() {
        let cache = QueryCache::new();
        assert!(cache.get("a|").is_none());

        cache.store("a|".to_string(), Arc::from(vec![1, 2]));
        assert_eq!(cache.get("a|").unwrap().as_ref(), &[1, 2]);

        cache.store("b|".to_string(), Arc::from(vec![3]));
        assert!(cache.get("a|").is_none());
        assert_eq!(cache.cached_key().as_deref(), Some("b|"));

        cache.clear();
        assert!(cache.cached_key().is_none());
    }

    #[test]
    fn test_cache_recovers_from_poisoned_lock() {
        let cache = QueryCache::new();
        cache.store("a|".to_string(), Arc::from(vec![1]));

        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = cache.slot.lock().unwrap();
                panic!("poison the slot");
            });
            assert!(poisoner.join().is_err());
        });
        assert!(cache.slot.is_poisoned());

        assert!(cache.get("a|").is_none());
        assert!(!cache.slot.is_poisoned());

        cache.store("b|".to_string(), Arc::from(vec![2]));
        assert_eq!(cache.get("b|").unwrap().as_ref(), &[2]);
    }
}
