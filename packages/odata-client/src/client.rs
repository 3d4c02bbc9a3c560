use crate::auth::token_provider;
use crate::config::ClientConfig;
use crate::http::HttpTransport;
use anyhow::{Context, Result};
use odata_query::{
    BooleanFormat, Cancellation, ContinuationDriver, Entity, HttpRequest, HttpResponse, Method,
    Query, QueryError, QueryResult, RecordEvaluator, Transport,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Collection queries plus single-record operations against one service.
///
/// Errors are `anyhow` wrappers around [`QueryError`]; downcast to inspect
/// the status of a transport failure.
pub struct EntityClient {
    transport: Arc<dyn Transport>,
    booleans: BooleanFormat,
    cross_company: bool,
    page_size: Option<u32>,
}

impl EntityClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            booleans: config.boolean_format.clone(),
            cross_company: config.cross_company,
            page_size: config.page_size,
        }
    }

    /// Client over HTTP with the token source the config implies.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config, token_provider(config))?;
        info!(base_url = %transport.base_url(), "OData client ready");
        Ok(Self::new(Arc::new(transport), config))
    }

    fn preset(&self, query: Query) -> Query {
        let query = query
            .with_boolean_format(self.booleans.clone())
            .cross_company(self.cross_company);
        match self.page_size {
            Some(size) => query.page_size(size),
            None => query,
        }
    }

    /// New query carrying this client's boolean format, tenant scope and
    /// page size.
    pub fn query(&self, entity: &str) -> Query {
        self.preset(Query::new(entity))
    }

    pub fn query_for<E: Entity>(&self) -> Query {
        self.preset(Query::for_entity::<E>())
    }

    pub async fn fetch(&self, query: &Query, cancel: &Cancellation) -> Result<QueryResult> {
        let evaluator = RecordEvaluator::new(query.boolean_format().clone());
        let driver = ContinuationDriver::new(self.transport.as_ref(), evaluator);
        let result = driver
            .run(query, cancel)
            .await
            .context(format!("Query against {} failed", query.entity()))?;
        Ok(result)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let target = request.target();
        debug!(method = request.method.as_str(), target = %target, "Sending record request");
        let response = self
            .transport
            .send(request)
            .await
            .context(format!("Request to {target} failed"))?;
        Ok(response)
    }

    /// Record addressed by the query's identity key, or `None` on 404.
    pub async fn get(&self, query: &Query) -> Result<Option<Value>> {
        let response = self.send(query.key_request(Method::Get)?).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_failure().into());
        }
        let record = serde_json::from_slice(&response.body)
            .map_err(|e| QueryError::Decode(e.to_string()))?;
        Ok(Some(record))
    }

    /// Inserts a record and returns the representation the service sent
    /// back (`Null` when it answered without a body).
    pub async fn create(&self, entity: &str, record: &Value) -> Result<Value> {
        let mut request = HttpRequest::new(Method::Post, entity)
            .with_header("Accept", "application/json")
            .with_json(record);
        if self.cross_company {
            request = request.with_query(vec![(
                odata_query::query::CROSS_COMPANY.to_string(),
                "true".to_string(),
            )]);
        }

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(response.into_failure().into());
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        let created = serde_json::from_slice(&response.body)
            .map_err(|e| QueryError::Decode(e.to_string()))?;
        info!(entity = %entity, "Record created");
        Ok(created)
    }

    /// Partial update of the keyed record.
    pub async fn update(&self, query: &Query, changes: &Value) -> Result<()> {
        let request = query.key_request(Method::Patch)?.with_json(changes);
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(response.into_failure().into());
        }
        info!(entity = %query.entity(), "Record updated");
        Ok(())
    }

    pub async fn delete(&self, query: &Query) -> Result<()> {
        let response = self.send(query.key_request(Method::Delete)?).await?;
        if !response.is_success() {
            return Err(response.into_failure().into());
        }
        info!(entity = %query.entity(), "Record deleted");
        Ok(())
    }
}
