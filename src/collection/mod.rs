//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type used to register the
//! default factories before building a service provider.

use std::sync::Arc;

use crate::key::{key_of_named, key_of_type};
use crate::registration::{AnyArc, Registration, Registry};
use crate::provider::ResolverContext;
use crate::{DiResult, Key, Lifetime, ServiceProvider};

/// Collection of default service registrations.
///
/// Registrations describe how a service is normally produced: once per
/// provider (singleton) or once per request scope (scoped). The built
/// provider additionally carries an override table which can replace any
/// of these factories for the application lifetime.
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
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<UserService, _>(|resolver| UserService {
///     db: resolver.get_required::<Database>(),
/// });
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// let users = scope.get_required::<UserService>();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ServiceCollection {
    registry: Registry,
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    // ----- Concrete Type Registrations -----

    /// Registers a ready-made singleton instance.
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(Lifetime::Singleton, Arc::new(ctor)),
        );
        self
    }

    /// Registers a singleton factory that creates the instance on first request.
    ///
    /// The factory is called only once; the result is cached on the provider
    /// and shared across all scopes.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(key_of_type::<T>(), Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory that creates one instance per scope.
    ///
    /// The web layer opens a scope per inbound request, so this is the
    /// "fresh instance per request" registration.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(key_of_type::<T>(), Lifetime::Scoped, factory)
    }

    /// Registers a scoped factory under a name.
    pub fn add_named_scoped_factory<T, F>(&mut self, name: &'static str, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(key_of_named::<T>(name), Lifetime::Scoped, factory)
    }

    fn add_factory<T, F>(&mut self, key: Key, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry
            .insert(key, Registration::new(lifetime, Arc::new(ctor)));
        self
    }

    /// Returns true if a default factory is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.registry.contains_key(&key_of_type::<T>())
    }

    /// Builds the service provider. The registry is frozen from here on;
    /// only the provider's override table can still change.
    pub fn build(self) -> ServiceProvider {
        tracing::debug!(registrations = self.registry.len(), "building service provider");
        ServiceProvider::new(self.registry)
    }
}
