//! Service registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;

pub(crate) use crate::provider::ResolverContext;

/// Type-erased shared service instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased constructor shared by default registrations and overrides.
pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Service registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Singleton cache, lock-free after initialization
    pub(crate) single_runtime: Option<OnceCell<AnyArc>>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            Lifetime::Scoped => None,
        };

        Self {
            lifetime,
            ctor,
            single_runtime,
        }
    }
}

/// Default factories, frozen once the provider is built.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Registration>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a registration, replacing any earlier one for the same key.
    pub(crate) fn insert(&mut self, key: Key, registration: Registration) {
        self.entries.insert(key, registration);
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.entries.get(key)
    }

    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> {
        self.entries.iter()
    }
}
