//! Object pool
//!
//! Arena of homogeneous objects addressed by index handles. Each live slot is
//! either on the free list or on the active list, never both. The active list
//! keeps acquisition order so iteration stays deterministic.

use serde::Serialize;

/// Objects that can be recycled by a [`Pool`]
pub trait Poolable: Default {
    /// Return the object to a pristine state before it goes back on the free list
    fn reset(&mut self);
}

/// Index handle into a [`Pool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(u32);

impl PoolHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Object trimmed away, index can be recycled
    Vacant,
    Free,
    Active,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    state: SlotState,
}

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub max_active: usize,
    pub total_requests: u64,
    pub free: usize,
    pub active: usize,
}

impl PoolStats {
    /// Percentage of requests served from the free list
    pub fn efficiency(&self) -> f32 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.reused as f32 / self.total_requests as f32 * 100.0
        }
    }

    pub fn pool_size(&self) -> usize {
        self.free + self.active
    }
}

/// Reusable-object allocator
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    vacant: Vec<u32>,
    active: Vec<PoolHandle>,
    created: u64,
    reused: u64,
    max_active: usize,
    total_requests: u64,
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Poolable> Pool<T> {
    /// Create a pool with `initial` pre-warmed objects
    pub fn new(initial: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(initial),
            free: Vec::with_capacity(initial),
            vacant: Vec::new(),
            active: Vec::new(),
            created: 0,
            reused: 0,
            max_active: 0,
            total_requests: 0,
        };
        pool.prewarm(initial);
        pool
    }

    fn prewarm(&mut self, count: usize) {
        for _ in 0..count {
            let index = self.alloc_slot();
            self.slots[index as usize].state = SlotState::Free;
            self.free.push(index);
        }
    }

    /// Construct a new object in a vacant slot (or a new one)
    fn alloc_slot(&mut self) -> u32 {
        self.created += 1;
        match self.vacant.pop() {
            Some(index) => {
                self.slots[index as usize].value = Some(T::default());
                index
            }
            None => {
                self.slots.push(Slot {
                    value: Some(T::default()),
                    state: SlotState::Vacant,
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    /// Take an object, reusing a released one when possible
    pub fn acquire(&mut self) -> PoolHandle {
        self.total_requests += 1;
        let index = match self.free.pop() {
            Some(index) => {
                self.reused += 1;
                index
            }
            None => self.alloc_slot(),
        };
        self.slots[index as usize].state = SlotState::Active;
        let handle = PoolHandle(index);
        self.active.push(handle);
        self.max_active = self.max_active.max(self.active.len());
        handle
    }

    /// Return an object. Handles that are not currently active are ignored.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if slot.state != SlotState::Active {
            return false;
        }
        if let Some(value) = slot.value.as_mut() {
            value.reset();
        }
        slot.state = SlotState::Free;
        self.free.push(handle.0);
        if let Some(pos) = self.active.iter().position(|h| *h == handle) {
            self.active.remove(pos);
        }
        true
    }

    /// Release every handle in `handles`
    pub fn release_all(&mut self, handles: impl IntoIterator<Item = PoolHandle>) {
        for handle in handles {
            self.release(handle);
        }
    }

    /// Release every active object for which `keep` returns false
    pub fn retain_active(&mut self, mut keep: impl FnMut(&mut T) -> bool) {
        let mut released = Vec::new();
        for &handle in &self.active {
            if let Some(value) = self.slots[handle.index()].value.as_mut() {
                if !keep(value) {
                    released.push(handle);
                }
            }
        }
        self.release_all(released);
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.state == SlotState::Active)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.state == SlotState::Active)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|slot| slot.state == SlotState::Active)
    }

    /// Active handles in acquisition order
    pub fn handles(&self) -> &[PoolHandle] {
        &self.active
    }

    /// Active objects in acquisition order
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.active.iter().filter_map(|&handle| {
            self.slots[handle.index()]
                .value
                .as_ref()
                .map(|value| (handle, value))
        })
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Resize the free list toward `ceil(max_active * 1.2)`
    pub fn optimize(&mut self) {
        let target = (self.max_active as f32 * 1.2).ceil() as usize;
        let total = self.free.len() + self.active.len();

        if total > target * 2 {
            let excess = (total - target).min(self.free.len());
            for _ in 0..excess {
                if let Some(index) = self.free.pop() {
                    let slot = &mut self.slots[index as usize];
                    slot.value = None;
                    slot.state = SlotState::Vacant;
                    self.vacant.push(index);
                }
            }
            log::debug!("Pool trimmed {} free objects (target {})", excess, target);
        } else if (self.free.len() as f32) < target as f32 * 0.3 {
            let count = (target as f32 * 0.5).ceil() as usize;
            self.prewarm(count);
            log::debug!("Pool pre-warmed {} objects (target {})", count, target);
        }
    }

    /// Drop every object and zero the counters
    pub fn clear(&mut self) {
        *self = Self::new(0);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            reused: self.reused,
            max_active: self.max_active,
            total_requests: self.total_requests,
            free: self.free.len(),
            active: self.active.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Dummy {
        value: u32,
        resets: u32,
    }

    impl Poolable for Dummy {
        fn reset(&mut self) {
            self.value = 0;
            self.resets += 1;
        }
    }

    #[test]
    fn test_prewarm_counts_as_created() {
        let pool: Pool<Dummy> = Pool::new(5);
        let stats = pool.stats();
        assert_eq!(stats.created, 5);
        assert_eq!(stats.free, 5);
        assert_eq!(stats.active, 0);
    }

    #[test]
    fn test_acquire_reuses_released() {
        let mut pool: Pool<Dummy> = Pool::new(0);
        let a = pool.acquire();
        pool.get_mut(a).unwrap().value = 7;
        assert!(pool.release(a));

        let b = pool.acquire();
        assert_eq!(a, b);
        let obj = pool.get(b).unwrap();
        assert_eq!(obj.value, 0, "reset must run before reuse");
        assert_eq!(obj.resets, 1);

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.efficiency(), 50.0);
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool: Pool<Dummy> = Pool::new(1);
        let a = pool.acquire();
        assert!(pool.release(a));
        assert!(!pool.release(a));
        assert_eq!(pool.free_len(), 1);
        assert!(!pool.release(PoolHandle(99)));
    }

    #[test]
    fn test_retain_active_keeps_order() {
        let mut pool: Pool<Dummy> = Pool::new(0);
        let handles: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        for (i, &h) in handles.iter().enumerate() {
            pool.get_mut(h).unwrap().value = i as u32;
        }
        pool.retain_active(|d| d.value % 2 == 0);
        let left: Vec<u32> = pool.iter().map(|(_, d)| d.value).collect();
        assert_eq!(left, vec![0, 2]);
        assert_eq!(pool.free_len(), 2);
    }

    #[test]
    fn test_optimize_trims_excess() {
        let mut pool: Pool<Dummy> = Pool::new(50);
        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        // max_active = 2 -> target 3, total 50 > 6
        pool.optimize();
        assert_eq!(pool.free_len(), 3);

        // Trimmed slots are recycled
        let handles: Vec<_> = (0..10).map(|_| pool.acquire()).collect();
        assert_eq!(pool.active_len(), 10);
        assert!(handles.iter().all(|h| h.index() < 50));
    }

    #[test]
    fn test_optimize_prewarms_shortfall() {
        let mut pool: Pool<Dummy> = Pool::new(0);
        let handles: Vec<_> = (0..10).map(|_| pool.acquire()).collect();
        assert_eq!(pool.free_len(), 0);
        pool.optimize();
        // target 12 -> pre-warm 6
        assert_eq!(pool.free_len(), 6);
        pool.release_all(handles);
        assert_eq!(pool.active_len(), 0);
    }

    /// A fresh allocation grows the free list by one once released
    #[test]
    fn test_fresh_allocation_grows_free_list() {
        let mut pool: Pool<Dummy> = Pool::new(0);
        let h = pool.acquire();
        assert_eq!(pool.free_len(), 0);
        pool.release(h);
        assert_eq!(pool.free_len(), 1);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut pool: Pool<Dummy> = Pool::new(3);
        pool.acquire();
        pool.clear();
        assert_eq!(pool.stats(), PoolStats::default());
    }

    proptest! {
        #[test]
        fn prop_acquire_release_restores_free_len(initial in 0usize..16, held in 0usize..16) {
            let mut pool: Pool<Dummy> = Pool::new(initial);
            let _held: Vec<_> = (0..held).map(|_| pool.acquire()).collect();
            // Only a recycled object round-trips back to the same free length
            prop_assume!(pool.free_len() > 0);
            let before = pool.free_len();
            let h = pool.acquire();
            pool.release(h);
            prop_assert_eq!(pool.free_len(), before);
        }

        #[test]
        fn prop_never_free_and_active(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut pool: Pool<Dummy> = Pool::new(2);
            let mut held = Vec::new();
            for acquire in ops {
                if acquire || held.is_empty() {
                    let h = pool.acquire();
                    prop_assert!(!held.contains(&h), "acquire returned an active object");
                    held.push(h);
                } else {
                    let h = held.remove(0);
                    pool.release(h);
                }
                for h in pool.handles() {
                    prop_assert!(!pool.free.contains(&(h.index() as u32)));
                }
                prop_assert_eq!(pool.active_len(), held.len());
            }
        }
    }
}
