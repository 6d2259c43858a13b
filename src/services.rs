//! Top-level services served by the HTTP endpoints.
//!
//! Each service owns a [`Pipeline`] and nothing request-specific, so a
//! single instance can safely be shared by every request for the lifetime
//! of the application.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::ServiceResult;
use crate::pipeline::{ClientProbe, EchoParams, Enrich, Finalize, HeaderProbe, Payload, Pipeline};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// A service an endpoint resolves and asks for a response payload.
#[async_trait]
pub trait LayeredService: Send + Sync + 'static {
    /// Value written to the payload's `service` field.
    const NAME: &'static str;

    /// Process-unique identity of this instance.
    fn instance_id(&self) -> u64;

    fn pipeline(&self) -> &Pipeline;

    /// Runs the service's pipeline for one request.
    ///
    /// Fails with [`ServiceError::UnboundContext`](crate::ServiceError::UnboundContext)
    /// when `ctx` is `None` and a stage needs the request.
    async fn respond(&self, ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        self.pipeline().run(ctx).await
    }
}

/// Service behind `GET /health`.
///
/// Built either as a header probe over mocked rows or as an echo of the
/// parameters it was constructed with. Both shapes add `enriched: true`
/// and `service: "DataService"`.
#[derive(Debug)]
pub struct DataService {
    instance_id: u64,
    pipeline: Pipeline,
}

impl DataService {
    /// Header whose presence triggers the debugging log line.
    pub const DEBUG_HEADER: &'static str = "debugging";

    /// `{"rows": [...], "enriched": true, "service": "DataService"}`
    pub fn probing() -> Self {
        Self::from_pipeline(
            Pipeline::new()
                .then(HeaderProbe::new(Self::DEBUG_HEADER))
                .then(Enrich::new("enriched", true))
                .then(Finalize::new(Self::NAME)),
        )
    }

    /// `{"result": {<params>}, "enriched": true, "service": "DataService"}`
    pub fn with_params(params: BTreeMap<String, String>) -> Self {
        Self::from_pipeline(
            Pipeline::new()
                .then(EchoParams::new(params))
                .then(Enrich::new("enriched", true))
                .then(Finalize::new(Self::NAME)),
        )
    }

    fn from_pipeline(pipeline: Pipeline) -> Self {
        let instance_id = next_instance_id();
        tracing::debug!(service = Self::NAME, instance = instance_id, "service constructed");
        Self {
            instance_id,
            pipeline,
        }
    }
}

impl LayeredService for DataService {
    const NAME: &'static str = "DataService";

    fn instance_id(&self) -> u64 {
        self.instance_id
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Service behind `GET /ping`: `{"status": "ok", "audit": "complete",
/// "service": "analytics"}`.
#[derive(Debug)]
pub struct AnalyticsService {
    instance_id: u64,
    pipeline: Pipeline,
}

impl AnalyticsService {
    pub const DEBUG_HEADER: &'static str = "x-debugging";

    pub fn new() -> Self {
        let instance_id = next_instance_id();
        tracing::debug!(service = Self::NAME, instance = instance_id, "service constructed");
        Self {
            instance_id,
            pipeline: Pipeline::new()
                .then(ClientProbe::new(Self::DEBUG_HEADER))
                .then(Enrich::new("audit", "complete"))
                .then(Finalize::new(Self::NAME)),
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredService for AnalyticsService {
    const NAME: &'static str = "analytics";

    fn instance_id(&self) -> u64 {
        self.instance_id
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;
    use serde_json::{json, Value};

    #[test]
    fn test_instances_get_distinct_ids() {
        let a = DataService::probing();
        let b = DataService::probing();
        let c = AnalyticsService::new();
        assert_ne!(a.instance_id(), b.instance_id());
        assert_ne!(b.instance_id(), c.instance_id());
    }

    #[tokio::test]
    async fn test_data_service_with_params() {
        let params = BTreeMap::from([("name".to_string(), "Alex from lifespan".to_string())]);
        let service = DataService::with_params(params);

        // Echoing parameters needs no request.
        let payload = service.respond(None).await.unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({
                "result": {"name": "Alex from lifespan"},
                "enriched": true,
                "service": "DataService"
            })
        );
    }

    #[tokio::test]
    async fn test_analytics_service() {
        let service = AnalyticsService::new();
        assert_eq!(service.pipeline().stage_names(), vec!["client_probe", "enrich", "finalize"]);

        let payload = service.respond(Some(&RequestContext::default())).await.unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({"status": "ok", "audit": "complete", "service": "analytics"})
        );
    }

    #[tokio::test]
    async fn test_probing_service_requires_context() {
        let err = DataService::probing().respond(None).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnboundContext { stage: "header_probe" }));
    }
}
