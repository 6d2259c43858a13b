//! Application lifespan: overrides installed at startup, removed at shutdown.

use std::future::Future;
use std::sync::Arc;

use crate::internal::ShutdownStack;
use crate::key::key_of_type;
use crate::registration::{AnyArc, ResolverContext};
use crate::{DiResult, Key, ServiceProvider};

/// The application-lifetime scope of a [`ServiceProvider`].
///
/// While a `Lifespan` is open, the overrides it installed replace the
/// provider's default factories for every request. Closing it with
/// [`shutdown`](Self::shutdown) removes exactly those overrides, then runs
/// the registered shutdown callbacks newest first.
///
/// Dropping an open lifespan still removes its overrides and runs the
/// synchronous callbacks; async callbacks are skipped with a warning.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::{Lifespan, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Greeter(&'static str);
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<Greeter, _>(|_| Greeter("per request"));
/// let provider = services.build();
///
/// let mut lifespan = Lifespan::startup(&provider);
/// let shared = Arc::new(Greeter("shared"));
/// lifespan.install(shared.clone());
///
/// let a = provider.create_scope().get_required::<Greeter>();
/// let b = provider.create_scope().get_required::<Greeter>();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// lifespan.shutdown().await;
/// assert_eq!(provider.create_scope().get_required::<Greeter>().0, "per request");
/// # });
/// ```
pub struct Lifespan {
    provider: ServiceProvider,
    installed: Vec<Key>,
    callbacks: ShutdownStack,
    closed: bool,
}

impl std::fmt::Debug for Lifespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifespan")
            .field("installed", &self.installed)
            .field("callbacks", &self.callbacks.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Lifespan {
    /// Opens the lifespan of `provider`.
    pub fn startup(provider: &ServiceProvider) -> Self {
        tracing::debug!("application lifespan opened");
        Self {
            provider: provider.clone(),
            installed: Vec::new(),
            callbacks: ShutdownStack::default(),
            closed: false,
        }
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Keys this lifespan installed and will remove at shutdown.
    pub fn installed(&self) -> &[Key] {
        &self.installed
    }

    /// Installs `instance` as the one shared `T` for the application lifetime.
    ///
    /// Returns `false` and leaves the table untouched when an override for
    /// `T` is already present; such an entry is not removed at shutdown.
    pub fn install<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) -> bool {
        let shared: AnyArc = instance;
        self.install_factory(key_of_type::<T>(), move |_| Ok(shared.clone()))
    }

    /// Installs an arbitrary override factory for `key`.
    pub fn install_factory<F>(&mut self, key: Key, factory: F) -> bool
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let installed = self.provider.overrides().insert(key, factory);
        if installed {
            self.installed.push(key);
        } else {
            tracing::warn!(service = %key, "override already present, not installing");
        }
        installed
    }

    /// Registers a callback to run when the lifespan closes.
    pub fn on_shutdown<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.callbacks.push_sync(Box::new(f));
    }

    /// Registers an async callback to run when the lifespan closes.
    pub fn on_shutdown_async<Fut, F>(&mut self, f: F)
    where
        Fut: Future<Output = ()> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
    {
        self.callbacks.push_async(f);
    }

    /// Closes the lifespan: removes the installed overrides, then runs the
    /// shutdown callbacks newest first.
    pub async fn shutdown(mut self) {
        self.remove_overrides();
        self.callbacks.unwind().await;
        self.closed = true;
        tracing::debug!("application lifespan closed");
    }

    fn remove_overrides(&mut self) {
        for key in self.installed.drain(..).rev() {
            self.provider.overrides().remove(&key);
        }
    }
}

impl Drop for Lifespan {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.remove_overrides();
        let skipped = self.callbacks.unwind_sync();
        if skipped > 0 {
            tracing::warn!(
                skipped,
                "lifespan dropped without shutdown().await, async callbacks not run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resolver, ServiceCollection};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_shutdown_removes_only_own_overrides() {
        let provider = ServiceCollection::new().build();
        provider.overrides().insert_instance(Arc::new(1u8));

        let mut lifespan = Lifespan::startup(&provider);
        assert!(!lifespan.install(Arc::new(2u8)));
        assert!(lifespan.install(Arc::new(3u16)));
        assert_eq!(lifespan.installed(), &[key_of_type::<u16>()]);

        lifespan.shutdown().await;

        assert_eq!(*provider.get_required::<u8>(), 1);
        assert!(provider.get::<u16>().is_err());
    }

    #[tokio::test]
    async fn test_overrides_removed_before_callbacks_run() {
        let provider = ServiceCollection::new().build();
        let seen = Arc::new(Mutex::new(None));

        let mut lifespan = Lifespan::startup(&provider);
        lifespan.install(Arc::new(5u32));

        let p = provider.clone();
        let s = seen.clone();
        lifespan.on_shutdown(move || {
            *s.lock().unwrap() = Some(p.overrides().is_empty());
        });

        lifespan.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_callbacks_run_newest_first() {
        let provider = ServiceCollection::new().build();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut lifespan = Lifespan::startup(&provider);
        let o = order.clone();
        lifespan.on_shutdown(move || o.lock().unwrap().push("first"));
        let o = order.clone();
        lifespan.on_shutdown_async(move || async move { o.lock().unwrap().push("second") });

        lifespan.shutdown().await;
        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_drop_cleans_up() {
        let provider = ServiceCollection::new().build();
        let ran = Arc::new(Mutex::new(false));

        {
            let mut lifespan = Lifespan::startup(&provider);
            lifespan.install(Arc::new(9i64));
            let r = ran.clone();
            lifespan.on_shutdown(move || *r.lock().unwrap() = true);
            assert_eq!(provider.overrides().len(), 1);
        }

        assert!(provider.overrides().is_empty());
        assert!(*ran.lock().unwrap());
    }
}
