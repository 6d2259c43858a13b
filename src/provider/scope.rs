//! Scoped service resolution.
//!
//! This module contains the Scope type which caches scoped services for the
//! duration of a single request.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ResolverContext, ServiceProvider};
use crate::registration::{AnyArc, Registration};
use crate::traits::ResolverCore;
use crate::{DiError, DiResult, Key, Lifetime};

/// Scoped service container for request-scoped dependency resolution.
///
/// # Lifetime Behavior
///
/// - **Override installed**: the override's factory runs, whatever the
///   registered lifetime is
/// - **Singleton**: resolved and cached in the root provider
/// - **Scoped**: resolved and cached within this specific scope
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     DatabaseConnection("connection-123".to_string())
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
/// let a = scope.get_required::<DatabaseConnection>();
/// let b = scope.get_required::<DatabaseConnection>();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub struct Scope {
    pub(crate) root: ServiceProvider,
    pub(crate) scoped: Mutex<HashMap<Key, AnyArc>>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            scoped: Mutex::new(HashMap::new()),
        }
    }

    /// The provider this scope was created from.
    pub fn provider(&self) -> &ServiceProvider {
        &self.root
    }

    fn resolve_scoped(&self, reg: &Registration, key: &Key) -> DiResult<AnyArc> {
        if let Some(cached) = self.scoped.lock().get(key) {
            return Ok(cached.clone());
        }

        // The lock is not held while the factory runs; it may resolve
        // other scoped services from this scope.
        let ctx = ResolverContext::new(self);
        let value = (reg.ctor)(&ctx)?;

        let mut guard = self.scoped.lock();
        Ok(guard.entry(*key).or_insert(value).clone())
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        if let Some(result) = self.root.resolve_override(self, key) {
            return result;
        }

        match self.root.inner().registry.get(key) {
            Some(reg) => match reg.lifetime {
                Lifetime::Singleton => self.root.resolve_singleton(reg),
                Lifetime::Scoped => self.resolve_scoped(reg, key),
            },
            None => Err(DiError::NotFound(key.display_name())),
        }
    }
}
