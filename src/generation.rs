//! Latest-request-wins bookkeeping for asynchronous fetches.
//!
//! Every fetch takes a [`Ticket`] from a shared [`Generations`] counter. When its
//! result arrives it may only be committed into a [`Latest`] slot while the ticket
//! is still the newest one issued; anything older is stale and gets dropped, no
//! matter in which order the responses resolve.
//!
//! ```
//! use idb_rs::generation::{Generations, Latest};
//!
//! let gens = Generations::new();
//! let slot = Latest::new();
//! let first = gens.issue();
//! let second = gens.issue();
//! assert!(slot.commit(&second, "new"));
//! assert!(!slot.commit(&first, "old")); // resolved late, discarded
//! assert_eq!(slot.get(), Some("new"));
//! ```

use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Monotonic request counter, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct Generations {
    latest: Arc<AtomicU64>,
}

/// Proof of which generation a request belongs to.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; every earlier ticket becomes stale.
    pub fn issue(&self) -> Ticket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { generation, latest: Arc::clone(&self.latest) }
    }

    /// Most recently issued generation (0 before the first request).
    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `false` once a newer request has been issued. Workers may check this to
    /// abandon superseded work early.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Single "current result" slot with one logical writer: the newest ticket.
#[derive(Debug)]
pub struct Latest<T> {
    inner: Mutex<Slot<T>>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(Slot { generation: 0, value: None }) }
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value` if `ticket` is still current and newer than what is stored.
    /// Returns whether the value was committed.
    pub fn commit(&self, ticket: &Ticket, value: T) -> bool {
        let mut slot = self.lock();
        if !ticket.is_current() || ticket.generation <= slot.generation {
            debug!(
                "discarding stale result of generation {} (slot holds {})",
                ticket.generation, slot.generation
            );
            return false;
        }
        slot.generation = ticket.generation;
        slot.value = Some(value);
        true
    }

    /// Generation of the committed value (0 when empty).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.lock().value.as_ref())
    }

    pub fn clear(&self) {
        self.lock().value = None;
    }
}

impl<T: Clone> Latest<T> {
    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }
}
