//! Layered processing chain behind every endpoint.
//!
//! A service answers a request by running an ordered list of [`Stage`]s
//! over a JSON object: one fetch stage that seeds the payload from the
//! mocked data source, then stages that each add one field.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};

/// The JSON object a pipeline builds up.
pub type Payload = Map<String, Value>;

/// One step of a service pipeline.
///
/// A stage receives the payload produced so far and the request context,
/// if one was supplied, and returns the extended payload.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    async fn apply(&self, payload: Payload, ctx: Option<&RequestContext>) -> ServiceResult<Payload>;
}

fn require<'a>(
    stage: &'static str,
    ctx: Option<&'a RequestContext>,
) -> ServiceResult<&'a RequestContext> {
    ctx.ok_or(ServiceError::UnboundContext { stage })
}

/// Mocked database fetch that reports a debugging header.
///
/// Yields `{"rows": ["mocked", "data"]}`. When the configured header is
/// present and non-empty, logs `Debugging header received: <value>`.
#[derive(Debug, Clone)]
pub struct HeaderProbe {
    header: &'static str,
}

impl HeaderProbe {
    pub fn new(header: &'static str) -> Self {
        Self { header }
    }
}

#[async_trait]
impl Stage for HeaderProbe {
    fn name(&self) -> &'static str {
        "header_probe"
    }

    async fn apply(&self, mut payload: Payload, ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        let ctx = require(self.name(), ctx)?;
        if let Some(value) = ctx.header(self.header).filter(|v| !v.is_empty()) {
            tracing::info!("Debugging header received: {}", value);
        }

        // Stand-in for the database round trip.
        tokio::task::yield_now().await;

        payload.insert("rows".into(), json!(["mocked", "data"]));
        Ok(payload)
    }
}

/// Mocked database fetch that reports a debugging header together with
/// the caller's address.
///
/// Yields `{"status": "ok"}`.
#[derive(Debug, Clone)]
pub struct ClientProbe {
    header: &'static str,
}

impl ClientProbe {
    pub fn new(header: &'static str) -> Self {
        Self { header }
    }
}

#[async_trait]
impl Stage for ClientProbe {
    fn name(&self) -> &'static str {
        "client_probe"
    }

    async fn apply(&self, mut payload: Payload, ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        let ctx = require(self.name(), ctx)?;
        if let Some(value) = ctx.header(self.header).filter(|v| !v.is_empty()) {
            tracing::info!("Debugging '{}' for {}", value, ctx.client_host());
        }

        tokio::task::yield_now().await;

        payload.insert("status".into(), Value::String("ok".into()));
        Ok(payload)
    }
}

/// Mocked fetch returning the parameters the service was built with.
///
/// Yields `{"result": {<params>}}`. Needs no request context.
#[derive(Debug, Clone, Default)]
pub struct EchoParams {
    params: BTreeMap<String, String>,
}

impl EchoParams {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

#[async_trait]
impl Stage for EchoParams {
    fn name(&self) -> &'static str {
        "echo_params"
    }

    async fn apply(&self, mut payload: Payload, _ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        tokio::task::yield_now().await;
        payload.insert("result".into(), json!(self.params));
        Ok(payload)
    }
}

/// Adds one fixed field.
#[derive(Debug, Clone)]
pub struct Enrich {
    field: &'static str,
    value: Value,
}

impl Enrich {
    pub fn new(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

#[async_trait]
impl Stage for Enrich {
    fn name(&self) -> &'static str {
        "enrich"
    }

    async fn apply(&self, mut payload: Payload, _ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        payload.insert(self.field.into(), self.value.clone());
        Ok(payload)
    }
}

/// Stamps the payload with the name of the service that produced it.
#[derive(Debug, Clone)]
pub struct Finalize {
    service: &'static str,
}

impl Finalize {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Stage for Finalize {
    fn name(&self) -> &'static str {
        "finalize"
    }

    async fn apply(&self, mut payload: Payload, _ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        payload.insert("service".into(), Value::String(self.service.into()));
        Ok(payload)
    }
}

/// Ordered list of stages.
///
/// # Examples
///
/// ```
/// use ferrous_lifespan::pipeline::{EchoParams, Enrich, Finalize, Pipeline};
/// use std::collections::BTreeMap;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let params = BTreeMap::from([("name".to_string(), "demo".to_string())]);
/// let pipeline = Pipeline::new()
///     .then(EchoParams::new(params))
///     .then(Enrich::new("enriched", true))
///     .then(Finalize::new("DataService"));
///
/// let payload = pipeline.run(None).await.unwrap();
/// assert_eq!(payload["result"]["name"], "demo");
/// assert_eq!(payload["enriched"], true);
/// assert_eq!(payload["service"], "DataService");
/// # });
/// ```
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order, starting from an empty payload.
    ///
    /// The first failing stage stops the run.
    pub async fn run(&self, ctx: Option<&RequestContext>) -> ServiceResult<Payload> {
        let mut payload = Payload::new();
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), "applying stage");
            payload = stage.apply(payload, ctx).await?;
        }
        Ok(payload)
    }
}
