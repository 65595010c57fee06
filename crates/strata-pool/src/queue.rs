//! Intrusive LIFO free-list guarded by a spin flag.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_core::{MemoryError, QueueId, Result};

use crate::spin::SpinLock;

struct Node<T> {
    /// Next node while linked into a queue; null otherwise.
    next: *mut Node<T>,
    owner: QueueId,
    value: T,
}

/// A value wrapped in a queue-owned node.
///
/// Entries are created by [`RecyclingQueue::allocate_entry`] and carry the
/// id of that queue. The node allocation travels with the entry through
/// put/poll cycles, so recycling an entry never allocates.
pub struct Entry<T> {
    node: Box<Node<T>>,
}

// SAFETY: an `Entry` exclusively owns its node; `next` is null whenever the
// node is outside a queue, so no other thread can reach it through the entry.
unsafe impl<T: Send> Send for Entry<T> {}
// SAFETY: shared access to an entry only exposes `&T`.
unsafe impl<T: Sync> Sync for Entry<T> {}

impl<T> Entry<T> {
    /// Id of the queue that allocated this entry.
    pub fn owner(&self) -> QueueId {
        self.node.owner
    }

    /// The wrapped value.
    pub fn get(&self) -> &T {
        &self.node.value
    }

    /// The wrapped value, mutably.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.node.value
    }

    /// Swap in a new value, keeping the node for reuse.
    pub fn replace(&mut self, value: T) -> T {
        std::mem::replace(&mut self.node.value, value)
    }

    /// Unwrap the value, releasing the node.
    pub fn into_inner(self) -> T {
        let node = *self.node;
        node.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("owner", &self.node.owner)
            .field("value", &self.node.value)
            .finish()
    }
}

/// A LIFO pool of entries shared across threads.
///
/// All mutation happens under a spin flag held for a single pointer swap.
/// No operation allocates, blocks, or logs while the flag is held.
pub struct RecyclingQueue<T> {
    id: QueueId,
    lock: SpinLock,
    /// Head of the intrusive list. Only read or written while `lock` is held.
    head: UnsafeCell<*mut Node<T>>,
    /// Updated under `lock`, read without it.
    size: AtomicUsize,
}

// SAFETY: nodes are only reachable through `head`, which is guarded by
// `lock`; values move between threads, so `T: Send` is required.
unsafe impl<T: Send> Send for RecyclingQueue<T> {}
// SAFETY: see above; the queue never hands out `&T` to linked nodes.
unsafe impl<T: Send> Sync for RecyclingQueue<T> {}

impl<T> RecyclingQueue<T> {
    /// Create an empty queue with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: QueueId::next(),
            lock: SpinLock::new(),
            head: UnsafeCell::new(ptr::null_mut()),
            size: AtomicUsize::new(0),
        }
    }

    /// This queue's identity, used as the ownership tag of its entries.
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Wrap `value` in an entry owned by this queue without inserting it.
    pub fn allocate_entry(&self, value: T) -> Entry<T> {
        Entry {
            node: Box::new(Node {
                next: ptr::null_mut(),
                owner: self.id,
                value,
            }),
        }
    }

    /// Whether `entry` was allocated by this queue. Does not take the lock.
    pub fn is_associated(&self, entry: &Entry<T>) -> bool {
        entry.node.owner == self.id
    }

    /// Push `entry` as the new head.
    ///
    /// Fails with an illegal-state error if the entry belongs to another
    /// queue; the rejected entry is dropped.
    pub fn put_entry(&self, entry: Entry<T>) -> Result<()> {
        if !self.is_associated(&entry) {
            return Err(MemoryError::ForeignEntry { queue: self.id });
        }
        let node = Box::into_raw(entry.node);
        let _guard = self.lock.lock();
        // SAFETY: `node` came from `Box::into_raw` and is uniquely owned;
        // `head` is only accessed under the lock we hold.
        unsafe {
            (*node).next = *self.head.get();
            *self.head.get() = node;
        }
        self.size.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Push `entry` only if the queue currently holds at most `max_size`
    /// entries. Returns whether the push happened; a rejected entry is
    /// dropped.
    ///
    /// The size check happens before the lock is taken, so concurrent
    /// callers may overshoot `max_size` slightly: this is a soft cap.
    pub fn put_entry_if_size(&self, entry: Entry<T>, max_size: usize) -> Result<bool> {
        if !self.is_associated(&entry) {
            return Err(MemoryError::ForeignEntry { queue: self.id });
        }
        if self.size() > max_size {
            return Ok(false);
        }
        self.put_entry(entry)?;
        Ok(true)
    }

    /// Remove and return the head entry, or `None` if the queue is empty.
    pub fn poll_entry(&self) -> Option<Entry<T>> {
        let head = {
            let _guard = self.lock.lock();
            // SAFETY: `head` is only accessed under the lock we hold, and
            // every linked node is a live `Box` allocation.
            let head = unsafe { *self.head.get() };
            if head.is_null() {
                return None;
            }
            // SAFETY: as above.
            unsafe {
                *self.head.get() = (*head).next;
            }
            self.size.fetch_sub(1, Ordering::Relaxed);
            head
        };
        // SAFETY: the node was unlinked above, so this is the only pointer
        // to an allocation produced by `Box::into_raw` in `put_entry`.
        let mut node = unsafe { Box::from_raw(head) };
        node.next = ptr::null_mut();
        Some(Entry { node })
    }

    /// Number of linked entries.
    ///
    /// A best-effort snapshot read without the lock; it may be stale by the
    /// time the caller looks at it.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Whether [`size`](Self::size) is currently zero.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<T> Default for RecyclingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RecyclingQueue<T> {
    fn drop(&mut self) {
        while self.poll_entry().is_some() {}
    }
}

impl<T> fmt::Debug for RecyclingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclingQueue")
            .field("id", &self.id)
            .field("size", &self.size())
            .finish()
    }
}
