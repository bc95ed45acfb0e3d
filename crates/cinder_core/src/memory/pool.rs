//! # Slot Pool
//!
//! Fixed-capacity generational pool for objects that are frequently created
//! and retired.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Handle to an object in a [`SlotPool`].
///
/// The handle stays valid until the object is freed. After that, lookups with
/// it return `None` even when the slot has been reused.
pub struct PoolHandle<T> {
    /// Index into the pool.
    index: u32,
    /// Generation of the slot when the handle was issued.
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolHandle<T> {
    const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, _marker: PhantomData }
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolHandle<T> {}

impl<T> PartialEq for PoolHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for PoolHandle<T> {}

impl<T> Hash for PoolHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolHandle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// A generational pool with a fixed number of slots.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is owned by a single manager on the
/// simulation thread.
///
/// # Example
///
/// ```rust
/// use cinder_core::SlotPool;
///
/// let mut pool: SlotPool<u32> = SlotPool::new(16);
/// let handle = pool.allocate(7).unwrap();
/// assert_eq!(pool.get(handle), Some(&7));
///
/// pool.free(handle);
/// assert!(pool.get(handle).is_none());
/// ```
pub struct SlotPool<T> {
    /// The storage array.
    slots: Box<[Slot<T>]>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of allocated objects.
    allocated_count: usize,
}

impl<T> SlotPool<T> {
    /// Creates a new pool with the specified capacity.
    ///
    /// All slots are allocated upfront.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit in a `u32`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        let capacity_u32 = u32::try_from(capacity).expect("pool capacity exceeds u32");

        let slots: Vec<Slot<T>> = (0..capacity)
            .map(|_| Slot { value: None, generation: 0 })
            .collect();

        // Reverse order so the lowest index is handed out first
        let free_list: Vec<u32> = (0..capacity_u32).rev().collect();

        Self {
            slots: slots.into_boxed_slice(),
            free_list,
            allocated_count: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live objects.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Stores `value` in a free slot.
    ///
    /// Returns `None` if the pool is full.
    pub fn allocate(&mut self, value: T) -> Option<PoolHandle<T>> {
        let index = self.free_list.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.allocated_count += 1;
        Some(PoolHandle::new(index, slot.generation))
    }

    /// Releases the object behind `handle`.
    ///
    /// Returns the object, or `None` if the handle was stale.
    pub fn free(&mut self, handle: PoolHandle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.allocated_count -= 1;
        Some(value)
    }

    /// Returns true if `handle` refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: PoolHandle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to a live object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live object.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Gets two distinct live objects mutably at once.
    ///
    /// Returns `None` if either handle is stale or both name the same slot.
    pub fn get_pair_mut(
        &mut self,
        a: PoolHandle<T>,
        b: PoolHandle<T>,
    ) -> Option<(&mut T, &mut T)> {
        if a.index == b.index {
            return None;
        }
        let (low, high, swapped) = if a.index < b.index { (a, b, false) } else { (b, a, true) };
        let (head, tail) = self.slots.split_at_mut(high.index as usize);
        let low_slot = head.get_mut(low.index as usize)?;
        let high_slot = tail.first_mut()?;
        if low_slot.generation != low.generation || high_slot.generation != high.generation {
            return None;
        }
        let low_value = low_slot.value.as_mut()?;
        let high_value = high_slot.value.as_mut()?;
        if swapped {
            Some((high_value, low_value))
        } else {
            Some((low_value, high_value))
        }
    }

    /// Releases every object. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free_list.clear();
        self.free_list.extend((0..self.slots.len() as u32).rev());
        self.allocated_count = 0;
    }

    /// Iterates over all live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|v| (PoolHandle::new(index as u32, slot.generation), v))
        })
    }

    /// Iterates mutably over all live objects in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(move |v| (PoolHandle::new(index as u32, generation), v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocate_free() {
        let mut pool: SlotPool<u32> = SlotPool::new(10);

        let h1 = pool.allocate(42).unwrap();
        assert_eq!(*pool.get(h1).unwrap(), 42);
        assert_eq!(pool.allocated_count(), 1);

        let freed = pool.free(h1).unwrap();
        assert_eq!(freed, 42);
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(pool.free_count(), 10);
    }

    #[test]
    fn test_pool_full() {
        let mut pool: SlotPool<u8> = SlotPool::new(2);

        let _ = pool.allocate(1).unwrap();
        let _ = pool.allocate(2).unwrap();
        assert!(pool.allocate(3).is_none());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut pool: SlotPool<u32> = SlotPool::new(1);

        let h1 = pool.allocate(1).unwrap();
        pool.free(h1);

        let h2 = pool.allocate(2).unwrap();
        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert_ne!(h1, h2);
        assert!(pool.get(h1).is_none());
        assert!(pool.free(h1).is_none());
        assert_eq!(*pool.get(h2).unwrap(), 2);
    }

    #[test]
    fn test_pair_mut() {
        let mut pool: SlotPool<u32> = SlotPool::new(4);
        let a = pool.allocate(1).unwrap();
        let b = pool.allocate(2).unwrap();

        let (x, y) = pool.get_pair_mut(b, a).unwrap();
        assert_eq!((*x, *y), (2, 1));
        *x = 20;
        *y = 10;
        assert_eq!(pool.get(a), Some(&10));
        assert_eq!(pool.get(b), Some(&20));

        assert!(pool.get_pair_mut(a, a).is_none());
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        let a = pool.allocate(1).unwrap();
        pool.clear();
        assert!(pool.get(a).is_none());
        assert_eq!(pool.free_count(), 3);
        assert_eq!(pool.iter().count(), 0);
    }
}
