//! The HTTP application: container wiring, lifespan and server loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{AppConfig, Variant};
use crate::services::{AnalyticsService, DataService, LayeredService};
use crate::{web, Lifespan, ServiceCollection, ServiceProvider};

/// A configured application ready to start.
///
/// Every variant registers a scoped factory for its service, so without a
/// running lifespan each request gets its own instance. [`startup`](Self::startup)
/// installs one shared instance when `singleton` is enabled.
#[derive(Debug)]
pub struct Application {
    config: AppConfig,
    provider: ServiceProvider,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        let mut services = ServiceCollection::new();
        match config.variant {
            Variant::Health => {
                services.add_scoped_factory::<DataService, _>(|_| DataService::probing());
            }
            Variant::Params => {
                let params = config.params.clone();
                services.add_scoped_factory::<DataService, _>(move |_| {
                    DataService::with_params(params.clone())
                });
            }
            Variant::Ping => {
                services.add_scoped_factory::<AnalyticsService, _>(|_| AnalyticsService::new());
            }
        }

        Self {
            provider: services.build(),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Opens the application lifespan.
    pub fn startup(&self) -> Lifespan {
        let mut lifespan = Lifespan::startup(&self.provider);
        if self.config.singleton {
            match self.config.variant {
                Variant::Health => install_shared(&mut lifespan, DataService::probing()),
                Variant::Params => install_shared(
                    &mut lifespan,
                    DataService::with_params(self.config.params.clone()),
                ),
                Variant::Ping => install_shared(&mut lifespan, AnalyticsService::new()),
            }
        }
        lifespan.on_shutdown(|| tracing::info!("Services shutdown complete"));
        lifespan
    }

    pub fn router(&self) -> Router {
        web::router(self.provider.clone(), self.config.variant)
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves, then closes the lifespan.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let lifespan = self.startup();
        tracing::info!(
            addr = %listener.local_addr()?,
            variant = %self.config.variant,
            singleton = self.config.singleton,
            "listening"
        );

        let served = axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        lifespan.shutdown().await;
        served
    }
}

fn install_shared<S: LayeredService>(lifespan: &mut Lifespan, service: S) {
    let instance = service.instance_id();
    if lifespan.install(Arc::new(service)) {
        tracing::info!(instance, "created {} once for the application lifetime", S::NAME);
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resolver;

    #[tokio::test]
    async fn test_singleton_installed_for_lifespan() {
        let app = Application::new(AppConfig::default());
        assert!(app.provider().create_scope().get::<DataService>().is_ok());

        let lifespan = app.startup();
        let a = app.provider().create_scope().get_required::<DataService>();
        let b = app.provider().create_scope().get_required::<DataService>();
        assert!(Arc::ptr_eq(&a, &b));

        lifespan.shutdown().await;
        assert!(app.provider().overrides().is_empty());
        let c = app.provider().create_scope().get_required::<DataService>();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_singleton_disabled() {
        let config = AppConfig {
            variant: Variant::Ping,
            singleton: false,
            ..AppConfig::default()
        };
        let app = Application::new(config);
        let lifespan = app.startup();
        assert!(lifespan.installed().is_empty());

        let a = app.provider().create_scope().get_required::<AnalyticsService>();
        let b = app.provider().create_scope().get_required::<AnalyticsService>();
        assert_ne!(a.instance_id(), b.instance_id());
        lifespan.shutdown().await;
    }
}
