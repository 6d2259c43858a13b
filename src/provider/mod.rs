//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type and related functionality
//! for resolving registered services from the DI container.

use std::sync::Arc;

use crate::overrides::OverrideTable;
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::ResolverCore;
use crate::{DiError, DiResult, Key, Lifetime};

pub mod context;
pub mod scope;
pub use context::ResolverContext;
pub use scope::Scope;

/// Service provider for resolving dependencies from the DI container.
///
/// Every resolution first consults the provider's [`OverrideTable`]. When
/// no override is installed for the requested key, the default
/// registration decides: singletons are created once and cached here,
/// scoped services can only be resolved through a [`Scope`].
///
/// The provider is cheap to clone; clones share registrations, singleton
/// caches and the override table.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
///
/// let provider = collection.build();
/// let db = provider.get_required::<Database>();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
    pub(crate) overrides: OverrideTable,
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registrations", &self.inner.registry.len())
            .field("overrides", &self.inner.overrides)
            .finish()
    }
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                overrides: OverrideTable::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// The web layer creates one scope per inbound request.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// The application-lifetime override table shared by all clones and
    /// scopes of this provider.
    pub fn overrides(&self) -> &OverrideTable {
        &self.inner.overrides
    }

    /// Registered default keys with their lifetimes, sorted by key.
    pub fn registrations(&self) -> Vec<(Key, Lifetime)> {
        let mut out: Vec<(Key, Lifetime)> = self
            .inner
            .registry
            .iter()
            .map(|(k, r)| (*k, r.lifetime))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Singleton resolution using the registration's embedded OnceCell.
    pub(crate) fn resolve_singleton(&self, reg: &Registration) -> DiResult<AnyArc> {
        if let Some(cell) = &reg.single_runtime {
            if let Some(value) = cell.get() {
                return Ok(value.clone());
            }
            // Build outside the cell so a failed factory leaves it empty.
            let ctx = ResolverContext::new(self);
            let v = (reg.ctor)(&ctx)?;
            return Ok(cell.get_or_init(|| v).clone());
        }
        let ctx = ResolverContext::new(self);
        (reg.ctor)(&ctx)
    }

    /// Resolves through the override table. `None` means no override is
    /// installed for `key`.
    pub(crate) fn resolve_override<R: ResolverCore>(
        &self,
        resolver: &R,
        key: &Key,
    ) -> Option<DiResult<AnyArc>> {
        let ctor = self.inner.overrides.get(key)?;
        tracing::trace!(service = %key, "resolving through override");
        let ctx = ResolverContext::new(resolver);
        Some((ctor)(&ctx))
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        if let Some(result) = self.resolve_override(self, key) {
            return result;
        }

        match self.inner.registry.get(key) {
            Some(reg) => match reg.lifetime {
                Lifetime::Singleton => self.resolve_singleton(reg),
                Lifetime::Scoped => Err(DiError::WrongLifetime(
                    "Cannot resolve scoped service from root provider",
                )),
            },
            None => Err(DiError::NotFound(key.display_name())),
        }
    }
}
