//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which provides
//! the interface for factory functions to resolve dependencies.

use crate::registration::AnyArc;
use crate::traits::ResolverCore;
use crate::{DiResult, Key};

/// Context passed to factory functions for resolving dependencies.
///
/// ResolverContext wraps the resolver (ServiceProvider or Scope) that is
/// running the factory, so a scoped factory resolving another scoped
/// service receives the instance of the same scope.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_scoped_factory::<UserService, _>(|resolver| {
///     UserService {
///         db: resolver.get_required::<Database>(),
///     }
/// });
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new<T>(resolver: &'a T) -> Self
    where
        T: ResolverCore,
    {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolver.resolve_any(key)
    }
}
