//! Application-lifetime override table.
//!
//! The override table maps the key a caller asks for to an alternate
//! factory. It is filled while the application starts, emptied while it
//! shuts down, and read on every resolution in between.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::key_of_type;
use crate::registration::{AnyArc, Ctor, ResolverContext};
use crate::{DiResult, Key};

/// Process-wide mapping from a service key to the factory that replaces the
/// default registration.
///
/// At most one entry exists per key. [`insert`](Self::insert) keeps the
/// first entry it sees, so a second startup pass can never replace an
/// instance that requests are already sharing. [`remove`](Self::remove) is
/// idempotent.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{ServiceCollection, Resolver, key_of_type};
/// use std::sync::Arc;
///
/// struct Counter(u32);
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<Counter, _>(|_| Counter(0));
/// let provider = services.build();
///
/// let shared = Arc::new(Counter(42));
/// assert!(provider.overrides().insert_instance(shared.clone()));
///
/// let scope = provider.create_scope();
/// assert!(Arc::ptr_eq(&scope.get_required::<Counter>(), &shared));
///
/// assert!(provider.overrides().remove(&key_of_type::<Counter>()));
/// assert!(!provider.overrides().remove(&key_of_type::<Counter>()));
/// assert_eq!(provider.create_scope().get_required::<Counter>().0, 0);
/// ```
#[derive(Default)]
pub struct OverrideTable {
    entries: RwLock<HashMap<Key, Ctor>>,
}

impl std::fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideTable")
            .field("keys", &self.keys())
            .finish()
    }
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `factory` for `key` unless an override is already present.
    ///
    /// Returns `true` when the factory was installed and `false` when an
    /// existing entry was kept.
    pub fn insert<F>(&self, key: Key, factory: F) -> bool
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.insert_ctor(key, Arc::new(factory))
    }

    /// Installs one shared instance of `T` for the unnamed key of `T`.
    pub fn insert_instance<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> bool {
        let shared: AnyArc = instance;
        self.insert(key_of_type::<T>(), move |_| Ok(shared.clone()))
    }

    pub(crate) fn insert_ctor(&self, key: Key, ctor: Ctor) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            tracing::debug!(service = %key, "override already installed, keeping existing entry");
            return false;
        }
        entries.insert(key, ctor);
        tracing::debug!(service = %key, "override installed");
        true
    }

    /// Removes the override for `key`. Absence is not an error.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, key: &Key) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            tracing::debug!(service = %key, "override removed");
        }
        removed
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Installed keys in a stable order.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.entries.read().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Removes every override.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Looks up the factory for `key`. The lock is released before the
    /// factory runs, so a factory may resolve other services.
    pub(crate) fn get(&self, key: &Key) -> Option<Ctor> {
        self.entries.read().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_named;

    #[test]
    fn test_insert_keeps_first_entry() {
        let table = OverrideTable::new();
        let first = Arc::new(1u32);
        let second = Arc::new(2u32);

        assert!(table.insert_instance(first));
        assert!(!table.insert_instance(second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = OverrideTable::new();
        let key = key_of_type::<u32>();

        assert!(!table.remove(&key));
        table.insert_instance(Arc::new(7u32));
        assert!(table.remove(&key));
        assert!(!table.remove(&key));
        assert!(table.is_empty());
    }

    #[test]
    fn test_named_and_unnamed_keys_do_not_collide() {
        let table = OverrideTable::new();
        assert!(table.insert(key_of_named::<u32>("a"), |_| Ok(Arc::new(1u32) as AnyArc)));
        assert!(table.insert_instance(Arc::new(2u32)));

        assert_eq!(table.keys(), vec![key_of_type::<u32>(), key_of_named::<u32>("a")]);

        table.clear();
        assert!(!table.contains(&key_of_named::<u32>("a")));
    }
}
