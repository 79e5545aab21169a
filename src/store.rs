//! Typed scratch storage kept across iterations.
//!
//! Operators that need memory between iterations (stagnation counters,
//! adaptive rates, ...) declare a [`StoreKey`] carrying the value type and
//! use it against the lifecycle's [`Store`]:
//!
//! ```
//! use u_evolve::{Store, StoreKey};
//!
//! const BEST_SO_FAR: StoreKey<f64> = StoreKey::new("best-so-far");
//!
//! let mut store = Store::default();
//! store.insert(&BEST_SO_FAR, 3.5);
//! assert_eq!(store.get(&BEST_SO_FAR), Some(&3.5));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Typed key into a [`Store`].
///
/// Two keys with the same name but different value types address
/// different slots.
pub struct StoreKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StoreKey<T> {
    /// Creates a key. Usable in `const` position.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Name of the key.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StoreKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StoreKey<T> {}

impl<T> fmt::Debug for StoreKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreKey").field(&self.name).finish()
    }
}

type Slot = (&'static str, TypeId);

/// Heterogeneous map of values owned by user operators.
#[derive(Default)]
pub struct Store {
    values: HashMap<Slot, Box<dyn Any + Send + Sync>>,
}

impl Store {
    fn slot<T: 'static>(key: &StoreKey<T>) -> Slot {
        (key.name, TypeId::of::<T>())
    }

    /// Returns the value stored under `key`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &StoreKey<T>) -> Option<&T> {
        self.values
            .get(&Self::slot(key))
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self, key: &StoreKey<T>) -> Option<&mut T> {
        self.values
            .get_mut(&Self::slot(key))
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Stores `value`, returning the previous one.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: &StoreKey<T>, value: T) -> Option<T> {
        self.values
            .insert(Self::slot(key), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Runs `f` on the value under `key`, inserting `init()` first if
    /// absent, and returns what `f` returns.
    pub fn update<T, I, U, R>(&mut self, key: &StoreKey<T>, init: I, f: U) -> R
    where
        T: Send + Sync + 'static,
        I: FnOnce() -> T,
        U: FnOnce(&mut T) -> R,
    {
        let mut value = self.remove(key).unwrap_or_else(init);
        let result = f(&mut value);
        self.insert(key, value);
        result
    }

    /// Removes and returns the value under `key`.
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &StoreKey<T>) -> Option<T> {
        self.values
            .remove(&Self::slot(key))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains<T: 'static>(&self, key: &StoreKey<T>) -> bool {
        self.values.contains_key(&Self::slot(key))
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every stored value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(|(name, _)| name))
            .finish()
    }
}
