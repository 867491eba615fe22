//! Reusable instance pool keyed by category
//!
//! The pool owns every instance it ever created. Callers hold a `PoolId`
//! between `acquire` and `release`; an instance is only reachable through
//! `get`/`get_mut` while it is checked out, so nothing can write to an
//! instance that went back to the pool.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::PoolEntry;
use crate::error::{MergeError, MergeResult};

/// Stable handle to a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// Types that can live in an `ObjectPool`
pub trait Poolable {
    /// Build a new, inactive instance
    fn instantiate(id: PoolId, category: &str) -> Self;
    /// Reset to initial state when handed out
    fn on_acquire(&mut self);
    /// Deactivate and detach when handed back
    fn on_release(&mut self);
}

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances created, including the initial batches
    pub instantiated: usize,
    /// On-demand growths after the initial batches
    pub growth_events: usize,
    /// Instances currently checked out
    pub in_use: usize,
}

#[derive(Debug)]
struct Entry<T> {
    item: T,
    category: usize,
    in_use: bool,
}

#[derive(Debug)]
struct Category {
    name: String,
    batch: usize,
    free: VecDeque<PoolId>,
}

/// Category-keyed pool of reusable instances
#[derive(Debug)]
pub struct ObjectPool<T> {
    entries: Vec<Entry<T>>,
    categories: Vec<Category>,
    by_name: HashMap<String, usize>,
    stats: PoolStats,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool and instantiate the initial batch of every category
    pub fn new(templates: &[PoolEntry]) -> MergeResult<Self> {
        log::info!("Pool initializing ({} categories)", templates.len());
        let mut pool = Self {
            entries: Vec::new(),
            categories: Vec::with_capacity(templates.len()),
            by_name: HashMap::new(),
            stats: PoolStats::default(),
        };

        for template in templates {
            if pool.by_name.contains_key(&template.category) {
                log::warn!("Pool category {:?} registered twice, ignoring", template.category);
                continue;
            }
            let index = pool.categories.len();
            pool.categories.push(Category {
                name: template.category.clone(),
                batch: template.pooling_count,
                free: VecDeque::with_capacity(template.pooling_count),
            });
            pool.by_name.insert(template.category.clone(), index);
            pool.instantiate_batch(index)?;
        }

        Ok(pool)
    }

    /// Hand out an inactive instance, growing the category when it is empty
    pub fn acquire(&mut self, category: &str) -> MergeResult<PoolId> {
        self.acquire_mut(category).map(|(id, _)| id)
    }

    /// `acquire`, also borrowing the freshly reset instance
    pub fn acquire_mut(&mut self, category: &str) -> MergeResult<(PoolId, &mut T)> {
        let index = *self
            .by_name
            .get(category)
            .ok_or_else(|| MergeError::UnknownCategory(category.to_string()))?;

        if self.categories[index].free.is_empty() {
            self.instantiate_batch(index)?;
            self.stats.growth_events += 1;
            log::info!(
                "Pool {:?} grew by {} (total {})",
                category,
                self.categories[index].batch,
                self.stats.instantiated
            );
        }

        let id = self.categories[index].free.pop_front().ok_or_else(|| {
            MergeError::PoolExhausted {
                category: category.to_string(),
                reason: "free queue empty after growth".into(),
            }
        })?;

        let entry = &mut self.entries[id.0 as usize];
        entry.in_use = true;
        entry.item.on_acquire();
        self.stats.in_use += 1;
        log::debug!("Acquired {:?} from pool {:?}", id, category);
        Ok((id, &mut entry.item))
    }

    /// Return an instance to its category's free queue.
    ///
    /// Returns `false` (and changes nothing) if the instance is not
    /// checked out.
    pub fn release(&mut self, id: PoolId) -> bool {
        let Some(entry) = self.entries.get_mut(id.0 as usize) else {
            log::warn!("Release of unknown pool id {:?}", id);
            return false;
        };
        if !entry.in_use {
            log::warn!("Double release of {:?} ignored", id);
            return false;
        }
        entry.in_use = false;
        entry.item.on_release();
        self.categories[entry.category].free.push_back(id);
        self.stats.in_use -= 1;
        true
    }

    /// Checked-out instance, if `id` is currently in use
    pub fn get(&self, id: PoolId) -> Option<&T> {
        self.entries
            .get(id.0 as usize)
            .filter(|e| e.in_use)
            .map(|e| &e.item)
    }

    /// Mutable checked-out instance, if `id` is currently in use
    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut T> {
        self.entries
            .get_mut(id.0 as usize)
            .filter(|e| e.in_use)
            .map(|e| &mut e.item)
    }

    pub fn is_in_use(&self, id: PoolId) -> bool {
        self.get(id).is_some()
    }

    /// Inactive instances waiting in a category
    pub fn free_count(&self, category: &str) -> usize {
        self.by_name
            .get(category)
            .map(|&i| self.categories[i].free.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn instantiate_batch(&mut self, index: usize) -> MergeResult<()> {
        let category = &mut self.categories[index];
        let count = category.batch;
        if count == 0 {
            return Err(MergeError::PoolExhausted {
                category: category.name.clone(),
                reason: "pooling_count is zero".into(),
            });
        }
        if self.entries.len() + count > u32::MAX as usize {
            return Err(MergeError::PoolExhausted {
                category: category.name.clone(),
                reason: "id space exhausted".into(),
            });
        }
        self.entries
            .try_reserve(count)
            .and_then(|_| category.free.try_reserve(count))
            .map_err(|e| MergeError::PoolExhausted {
                category: category.name.clone(),
                reason: e.to_string(),
            })?;

        for _ in 0..count {
            let id = PoolId(self.entries.len() as u32);
            self.entries.push(Entry {
                item: T::instantiate(id, &category.name),
                category: index,
                in_use: false,
            });
            category.free.push_back(id);
        }
        self.stats.instantiated += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Token {
        id: PoolId,
        active: bool,
        resets: u32,
    }

    impl Poolable for Token {
        fn instantiate(id: PoolId, _category: &str) -> Self {
            Self {
                id,
                active: false,
                resets: 0,
            }
        }

        fn on_acquire(&mut self) {
            self.active = true;
            self.resets += 1;
        }

        fn on_release(&mut self) {
            self.active = false;
        }
    }

    fn pool(batch: usize) -> ObjectPool<Token> {
        ObjectPool::new(&[PoolEntry::new("Token", batch)]).unwrap()
    }

    #[test]
    fn test_initial_batch_is_not_growth() {
        let pool = pool(3);
        assert_eq!(pool.free_count("Token"), 3);
        assert_eq!(pool.stats().instantiated, 3);
        assert_eq!(pool.stats().growth_events, 0);
    }

    #[test]
    fn test_acquire_grows_by_batch() {
        let mut pool = pool(2);
        let ids: Vec<_> = (0..3).map(|_| pool.acquire("Token").unwrap()).collect();
        assert_eq!(pool.stats().growth_events, 1);
        assert_eq!(pool.stats().instantiated, 4);
        assert_eq!(pool.free_count("Token"), 1);
        // All distinct
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert!(ids.iter().all(|&id| pool.get(id).unwrap().active));
    }

    #[test]
    fn test_release_recycles_instance() {
        let mut pool = pool(1);
        let id = pool.acquire("Token").unwrap();
        assert!(pool.release(id));
        assert!(pool.get(id).is_none());
        let again = pool.acquire("Token").unwrap();
        assert_eq!(again, id);
        assert_eq!(pool.get(again).unwrap().resets, 2);
        assert_eq!(pool.stats().growth_events, 0);
    }

    #[test]
    fn test_double_release_ignored() {
        let mut pool = pool(2);
        let id = pool.acquire("Token").unwrap();
        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert_eq!(pool.free_count("Token"), 2);
        assert_eq!(pool.stats().in_use, 0);
    }

    #[test]
    fn test_unknown_category() {
        let mut pool = pool(1);
        assert!(matches!(
            pool.acquire("Nope"),
            Err(MergeError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_zero_batch_is_fatal() {
        let result = ObjectPool::<Token>::new(&[PoolEntry::new("Token", 0)]);
        let Err(MergeError::PoolExhausted { category, reason }) = result else {
            panic!("zero batch must fail to grow");
        };
        assert_eq!(category, "Token");
        assert!(reason.contains("zero"));
    }

    #[test]
    fn test_get_mut_only_while_checked_out() {
        let mut pool = pool(1);
        let id = pool.acquire("Token").unwrap();
        assert_eq!(pool.get_mut(id).unwrap().id, id);
        pool.release(id);
        assert!(pool.get_mut(id).is_none());
    }
}
