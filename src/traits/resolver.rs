//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{key_of_named, key_of_type, Key};

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`Scope`](crate::Scope) and [`ResolverContext`](crate::ResolverContext).
/// Most callers use the generic methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service by key.
    ///
    /// The override table is consulted first; when no override is installed
    /// the default registration decides according to its lifetime.
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{ServiceCollection, Resolver};
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton("configuration".to_string());
///
/// let provider = collection.build();
/// let config = provider.get::<String>().unwrap();
/// assert_eq!(&*config, "configuration");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&key_of_type::<T>())?)
    }

    /// Resolves a concrete service type registered under `name`.
    fn get_named<T: 'static + Send + Sync>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&key_of_named::<T>(name))?)
    }

    /// Resolves a concrete service type, panicking on failure.
    ///
    /// Intended for bootstrap code and tests; request paths use [`get`](Self::get).
    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast<T: 'static + Send + Sync>(any: Arc<dyn Any + Send + Sync>) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}
