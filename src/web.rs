//! Axum integration: per-request scopes, request context extraction and
//! the endpoint handlers.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{request::Parts, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::config::Variant;
use crate::context::RequestContext;
use crate::services::{AnalyticsService, DataService, LayeredService};
use crate::traits::Resolver;
use crate::{DiResult, Scope, ServiceProvider, ServiceResult};

/// Response header carrying the instance id of the service that answered.
pub const INSTANCE_HEADER: &str = "x-service-instance";

/// Axum application state wrapping the container.
#[derive(Clone)]
pub struct AppState {
    provider: ServiceProvider,
}

impl AppState {
    pub fn new(provider: ServiceProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("overrides", &self.provider.overrides().len())
            .finish()
    }
}

impl FromRef<AppState> for ServiceProvider {
    fn from_ref(state: &AppState) -> Self {
        state.provider.clone()
    }
}

/// Extractor for the request-scoped container.
///
/// A fresh scope is opened for every request, so scoped registrations
/// produce one instance per request unless an override is installed.
pub struct DiScope {
    scope: Scope,
}

impl DiScope {
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.scope.get()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for DiScope
where
    ServiceProvider: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = ServiceProvider::from_ref(state);
        Ok(DiScope {
            scope: provider.create_scope(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let client = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(RequestContext::new(parts.headers.clone(), client))
    }
}

/// Resolves `S` from the request scope and returns its payload as JSON.
pub async fn respond<S: LayeredService>(
    scope: DiScope,
    ctx: RequestContext,
) -> ServiceResult<Response> {
    let service = scope.get::<S>()?;
    tracing::info!(service = S::NAME, instance = service.instance_id(), "service resolved");
    let payload = service.respond(Some(&ctx)).await?;

    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert(INSTANCE_HEADER, HeaderValue::from(service.instance_id()));
    Ok(response)
}

/// Builds the router serving `variant` from `provider`.
pub fn router(provider: ServiceProvider, variant: Variant) -> Router {
    let handler = match variant {
        Variant::Health | Variant::Params => get(respond::<DataService>),
        Variant::Ping => get(respond::<AnalyticsService>),
    };
    Router::new()
        .route(variant.route(), handler)
        .with_state(AppState::new(provider))
}
