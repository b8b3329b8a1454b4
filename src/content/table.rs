use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::content::core::AssetCore;

/// One cached asset: the strongly owned core plus a non-owning view of the
/// handle currently handed out for it. The `Weak` is what lets client code
/// drop handles freely without leaking the device resource.
pub(crate) struct AssetEntry<C, H> {
    pub core: Arc<C>,
    pub handle: Weak<H>,
}

/// Key-to-entry table for one asset kind. Callers lock the surrounding
/// `Mutex`; the table itself is plain data.
pub(crate) struct AssetTable<C, H> {
    entries: HashMap<String, AssetEntry<C, H>>,
}

impl<C, H> Default for AssetTable<C, H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<C: AssetCore, H> AssetTable<C, H> {
    /// Deduplicating lookup. `make_core` runs at most once per live key;
    /// `make_handle` runs once per abandonment-and-re-request cycle and wraps
    /// the same core each time.
    pub fn get_or_create<F, G>(&mut self, key: &str, make_core: F, make_handle: G) -> Arc<H>
    where
        F: FnOnce() -> C,
        G: FnOnce(Arc<C>) -> H,
    {
        if let Some(entry) = self.entries.get_mut(key) {
            if let Some(handle) = entry.handle.upgrade() {
                return handle;
            }
            // The previous handle was dropped; hand out a fresh one over the
            // surviving core and re-point the weak at it.
            let handle = Arc::new(make_handle(entry.core.clone()));
            entry.handle = Arc::downgrade(&handle);
            return handle;
        }

        let core = Arc::new(make_core());
        let handle = Arc::new(make_handle(core.clone()));
        self.entries.insert(
            key.to_owned(),
            AssetEntry {
                core,
                handle: Arc::downgrade(&handle),
            },
        );
        handle
    }

    /// Free allocated cores, at most `limit` of them. With `check_deletable`
    /// only cores past their idle timeout are touched; without it everything
    /// allocated is freed. Returns the number of cores freed.
    pub fn free_cores(&self, check_deletable: bool, limit: usize) -> usize {
        let mut count = 0;
        for entry in self.entries.values() {
            if entry.core.is_allocated() && (!check_deletable || entry.core.can_be_deleted()) {
                entry.core.free();
                count += 1;
                if count == limit {
                    break;
                }
            }
        }
        count
    }

    /// Drop entries nobody references and nothing is allocated for. Entries
    /// with a live handle or an allocated core stay; freeing cores is the
    /// cleanup pass's job, not the sweeper's.
    pub fn sweep_dead(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.handle.strong_count() > 0 || entry.core.is_allocated());
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Type-erased view of one kind's table, locking included, for the cleanup,
/// sweep and teardown passes that walk all kinds uniformly.
pub(crate) trait SweepTable: Send + Sync {
    fn free_cores(&self, check_deletable: bool, limit: usize) -> usize;
    fn sweep_dead(&self) -> usize;
    fn entry_count(&self) -> usize;
    fn clear(&self);
}

impl<C: AssetCore, H: Send + Sync> SweepTable for Mutex<AssetTable<C, H>> {
    fn free_cores(&self, check_deletable: bool, limit: usize) -> usize {
        self.lock().unwrap().free_cores(check_deletable, limit)
    }

    fn sweep_dead(&self) -> usize {
        self.lock().unwrap().sweep_dead()
    }

    fn entry_count(&self) -> usize {
        self.lock().unwrap().len()
    }

    fn clear(&self) {
        self.lock().unwrap().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockCore {
        allocated: AtomicBool,
        deletable: AtomicBool,
        frees: AtomicUsize,
    }

    impl MockCore {
        fn allocated(deletable: bool) -> Self {
            Self {
                allocated: AtomicBool::new(true),
                deletable: AtomicBool::new(deletable),
                frees: AtomicUsize::new(0),
            }
        }

        fn unallocated() -> Self {
            Self {
                allocated: AtomicBool::new(false),
                deletable: AtomicBool::new(false),
                frees: AtomicUsize::new(0),
            }
        }
    }

    impl AssetCore for MockCore {
        fn is_allocated(&self) -> bool {
            self.allocated.load(Ordering::Relaxed)
        }

        fn allocation_size(&self) -> usize {
            if self.is_allocated() {
                1024
            } else {
                0
            }
        }

        fn can_be_deleted(&self) -> bool {
            self.is_allocated() && self.deletable.load(Ordering::Relaxed)
        }

        fn free(&self) {
            self.allocated.store(false, Ordering::Relaxed);
            self.frees.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct MockHandle {
        core: Arc<MockCore>,
    }

    fn table() -> AssetTable<MockCore, MockHandle> {
        AssetTable::default()
    }

    fn entry(
        table: &mut AssetTable<MockCore, MockHandle>,
        key: &str,
        core: MockCore,
    ) -> Arc<MockHandle> {
        table.get_or_create(key, || core, |core| MockHandle { core })
    }

    #[test]
    fn second_lookup_returns_the_same_handle() {
        let mut table = table();
        let h1 = entry(&mut table, "a", MockCore::unallocated());
        let h2 = table.get_or_create(
            "a",
            || panic!("core factory must not run again for a live key"),
            |_| panic!("handle factory must not run while the handle is live"),
        );
        assert!(Arc::ptr_eq(&h1, &h2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn dropped_handle_is_replaced_over_the_same_core() {
        let mut table = table();
        let h1 = entry(&mut table, "a", MockCore::unallocated());
        let core1 = h1.core.clone();
        drop(h1);

        let h2 = table.get_or_create(
            "a",
            || panic!("core factory must not run again while the entry lives"),
            |core| MockHandle { core },
        );
        assert!(Arc::ptr_eq(&core1, &h2.core));

        // And the weak now tracks the replacement handle.
        let h3 = table.get_or_create(
            "a",
            || panic!("core factory must not run"),
            |_| panic!("handle factory must not run"),
        );
        assert!(Arc::ptr_eq(&h2, &h3));
    }

    #[test]
    fn free_cores_respects_the_deallocation_limit() {
        let mut table = table();
        let handles: Vec<_> = (0..6)
            .map(|i| entry(&mut table, &format!("k{i}"), MockCore::allocated(true)))
            .collect();

        let freed = table.free_cores(true, 4);
        assert_eq!(freed, 4);

        let still_allocated = handles
            .iter()
            .filter(|h| h.core.is_allocated())
            .count();
        assert_eq!(still_allocated, 2);
    }

    #[test]
    fn checked_free_skips_cores_still_in_use() {
        let mut table = table();
        let fresh = entry(&mut table, "fresh", MockCore::allocated(false));
        let idle = entry(&mut table, "idle", MockCore::allocated(true));

        let freed = table.free_cores(true, usize::MAX);
        assert_eq!(freed, 1);
        assert!(fresh.core.is_allocated());
        assert!(!idle.core.is_allocated());
    }

    #[test]
    fn unchecked_free_frees_everything_allocated() {
        let mut table = table();
        let h1 = entry(&mut table, "a", MockCore::allocated(false));
        let h2 = entry(&mut table, "b", MockCore::allocated(true));

        let freed = table.free_cores(false, usize::MAX);
        assert_eq!(freed, 2);
        assert!(!h1.core.is_allocated());
        assert!(!h2.core.is_allocated());
        // Unallocated cores were not freed twice.
        assert_eq!(table.free_cores(false, usize::MAX), 0);
    }

    #[test]
    fn sweep_keeps_entries_with_live_handles() {
        let mut table = table();
        let _held = entry(&mut table, "held", MockCore::unallocated());
        assert_eq!(table.sweep_dead(), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_keeps_allocated_cores_without_handles() {
        let mut table = table();
        let h = entry(&mut table, "warm", MockCore::allocated(true));
        drop(h);
        assert_eq!(table.sweep_dead(), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_removes_dead_unallocated_entries() {
        let mut table = table();
        let h1 = entry(&mut table, "dead", MockCore::unallocated());
        let _h2 = entry(&mut table, "held", MockCore::unallocated());
        drop(h1);

        assert_eq!(table.sweep_dead(), 1);
        assert_eq!(table.len(), 1);
    }
}
