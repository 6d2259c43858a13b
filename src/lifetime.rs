//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// A default factory is registered with one of these lifetimes. An
/// application-lifetime override installed at startup bypasses both: the
/// override's instance is returned regardless of the registered lifetime.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifespan::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<RequestModel, _>(|_| RequestModel { id: 7 });
///
/// let provider = services.build();
///
/// // Singleton: Same instance across scopes
/// let scope1 = provider.create_scope();
/// let scope2 = provider.create_scope();
/// assert!(Arc::ptr_eq(
///     &scope1.get_required::<Database>(),
///     &scope2.get_required::<Database>(),
/// ));
///
/// // Scoped: Same within scope, different across scopes
/// let a = scope1.get_required::<RequestModel>();
/// let b = scope1.get_required::<RequestModel>();
/// let c = scope2.get_required::<RequestModel>();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Single instance per provider, created on first use and kept for the
    /// application lifetime.
    Singleton,
    /// Single instance per scope. The web layer opens one scope per inbound
    /// request, so scoped services are request-scoped.
    Scoped,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
        }
    }
}
