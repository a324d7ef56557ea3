//! Handling the native objects exposed to the managed side.

use crate::Handle;
use crate::HANDLE_NONE;
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

/// The global [Registry] every bound native object is stored in.
pub static REGISTRY: Lazy<Registry> = Lazy::new(Default::default);

/// Thread-safe collection of native objects addressed by [Handle].
///
/// These objects are allocated and freed on the Rust side while only a
/// handle is exposed to the managed side. Removing an entry is what makes a
/// handle dead; a dead handle can still be presented by the managed side
/// but will never reach an object again.
pub struct Registry {
    entries: RwLock<HashMap<Handle, Arc<Mutex<dyn Any + Send>>>>,
    counter: AtomicI64,
}

impl Registry {
    /// Stores an object and issues a fresh handle for it.
    ///
    /// Handles are never reused within a process and are never
    /// [HANDLE_NONE].
    pub fn store<T: Any + Send>(&self, obj: T) -> Handle {
        let mut entries_guard = self
            .entries
            .write()
            .expect("Failed to write-lock the registry");
        let handle = self.counter.fetch_add(1, Ordering::Relaxed);
        entries_guard.insert(handle, Arc::new(Mutex::new(obj)));
        handle
    }

    /// Runs an action on the object behind `handle`.
    ///
    /// Yields [None] when the handle is dead or points to an object of a
    /// different concrete type.
    pub fn peek<T: Any, R>(&self, handle: Handle, action: impl FnOnce(&mut T) -> R) -> Option<R> {
        let entries_guard = self
            .entries
            .read()
            .expect("Failed to read-lock the registry");
        let entry = entries_guard.get(&handle)?.clone();
        drop(entries_guard);

        let mut obj = entry.lock().expect("Failed to lock the object");
        match obj.downcast_mut::<T>() {
            Some(concrete) => Some(action(concrete)),
            None => {
                log::warn!("Handle {} does not point to the requested type", handle);
                None
            }
        }
    }

    /// Drops the object behind `handle`. Safe to call on a dead handle.
    pub fn remove(&self, handle: Handle) -> bool {
        self.entries
            .write()
            .expect("Failed to write-lock the registry")
            .remove(&handle)
            .is_some()
    }

    /// Checks if `handle` still points to a stored object.
    pub fn alive(&self, handle: Handle) -> bool {
        self.entries
            .read()
            .expect("Failed to read-lock the registry")
            .contains_key(&handle)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            entries: HashMap::with_capacity(0).into(),
            // 0 is reserved as the cleared sentinel
            counter: AtomicI64::new(HANDLE_NONE + 1),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::*;

    struct Sensor {
        reading: i32,
    }

    #[test]
    fn Registry_store_issues_fresh_nonzero_handles() {
        let registry = Registry::default();
        let first = registry.store(Sensor { reading: 1 });
        let second = registry.store(Sensor { reading: 2 });
        assert_ne!(first, HANDLE_NONE);
        assert_ne!(second, HANDLE_NONE);
        assert_ne!(first, second);
    }

    #[test]
    fn Registry_peek_reaches_the_stored_object() {
        let registry = Registry::default();
        let handle = registry.store(Sensor { reading: 7 });
        let reading = registry.peek(handle, |sensor: &mut Sensor| sensor.reading);
        assert_eq!(reading, Some(7));
    }

    #[test]
    fn Registry_peek_with_the_wrong_type_is_a_miss() {
        let registry = Registry::default();
        let handle = registry.store(Sensor { reading: 7 });
        assert_eq!(registry.peek(handle, |text: &mut String| text.clone()), None);
    }

    #[test]
    fn Registry_peek_on_the_sentinel_is_a_miss() {
        let registry = Registry::default();
        registry.store(Sensor { reading: 7 });
        assert!(!registry.alive(HANDLE_NONE));
        assert_eq!(
            registry.peek(HANDLE_NONE, |sensor: &mut Sensor| sensor.reading),
            None
        );
    }

    #[test]
    fn Registry_remove_is_idempotent() {
        let registry = Registry::default();
        let handle = registry.store(Sensor { reading: 7 });
        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        assert!(!registry.alive(handle));
    }

    #[test]
    fn Registry_dead_handles_stay_dead_across_rebinds() {
        let registry = Registry::default();
        let first = registry.store(Sensor { reading: 1 });
        registry.remove(first);
        let second = registry.store(Sensor { reading: 2 });
        assert_ne!(first, second);
        assert_eq!(
            registry.peek(first, |sensor: &mut Sensor| sensor.reading),
            None
        );
        assert_eq!(
            registry.peek(second, |sensor: &mut Sensor| sensor.reading),
            Some(2)
        );
    }

    // The bind / resolve / release / resolve sequence as seen through a
    // peer's handle field, with the field modeled as a plain integer.
    #[test]
    fn Registry_round_trip_through_a_handle_field() {
        let registry = Registry::default();

        let mut field = registry.store(Sensor { reading: 42 });
        let bound = field;
        assert_eq!(
            registry.peek(field, |sensor: &mut Sensor| sensor.reading),
            Some(42)
        );

        registry.remove(field);
        field = HANDLE_NONE;
        assert_eq!(field, HANDLE_NONE);
        assert!(!registry.alive(bound));
        assert_eq!(
            registry.peek(bound, |sensor: &mut Sensor| sensor.reading),
            None
        );
    }
}
