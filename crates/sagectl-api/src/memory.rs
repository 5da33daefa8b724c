use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sagectl_common::{
    time::from_epoch_seconds, CreateEndpointConfigInput, CreateEndpointInput, CreateModelInput,
    EndpointConfigDescription, EndpointDescription, EndpointStatus, EndpointSummary, Error,
    ListQuery, ModelSummary, Page, ProductionVariant, Result,
};

use crate::types::{ControlPlane, Operation};

const ARN_PREFIX: &str = "arn:aws:sagemaker:us-east-1:000000000000";

/// One recorded control-plane call and the resource it named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateModel(String),
    CreateEndpointConfig(String),
    CreateEndpoint(String),
    DescribeEndpoint(String),
    DescribeEndpointConfig(String),
    DeleteEndpoint(String),
    DeleteEndpointConfig(String),
    DeleteModel(String),
    ListModels(Option<String>),
    ListEndpoints(Option<String>),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::CreateModel(_) => Operation::CreateModel,
            Call::CreateEndpointConfig(_) => Operation::CreateEndpointConfig,
            Call::CreateEndpoint(_) => Operation::CreateEndpoint,
            Call::DescribeEndpoint(_) => Operation::DescribeEndpoint,
            Call::DescribeEndpointConfig(_) => Operation::DescribeEndpointConfig,
            Call::DeleteEndpoint(_) => Operation::DeleteEndpoint,
            Call::DeleteEndpointConfig(_) => Operation::DeleteEndpointConfig,
            Call::DeleteModel(_) => Operation::DeleteModel,
            Call::ListModels(_) => Operation::ListModels,
            Call::ListEndpoints(_) => Operation::ListEndpoints,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Call::DeleteEndpoint(_) | Call::DeleteEndpointConfig(_) | Call::DeleteModel(_)
        )
    }
}

/// In-process control plane.
///
/// Resources are kept in creation order. List calls are paged by
/// a per-kind page size with the next offset as continuation token. A created
/// endpoint stays `Creating` for `polls_until_ready` describe calls and then
/// turns `InService` (or `Failed` when a creation failure is configured).
#[derive(Debug, Clone)]
pub struct MemoryControlPlane {
    inner: Arc<RwLock<Inner>>,
    model_page_size: usize,
    endpoint_page_size: usize,
    polls_until_ready: u32,
    creation_failure: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    clock: u64,
    models: Vec<(ModelSummary, CreateModelInput)>,
    configs: Vec<EndpointConfigDescription>,
    endpoints: Vec<StoredEndpoint>,
    failures: HashMap<Operation, Error>,
    calls: Vec<Call>,
}

#[derive(Debug)]
struct StoredEndpoint {
    description: EndpointDescription,
    pending_polls: u32,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            model_page_size: 100,
            endpoint_page_size: 100,
            polls_until_ready: 0,
            creation_failure: None,
        }
    }

    /// Page size for both list calls.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.model_page_size = page_size.max(1);
        self.endpoint_page_size = page_size.max(1);
        self
    }

    pub fn with_endpoint_page_size(mut self, page_size: usize) -> Self {
        self.endpoint_page_size = page_size.max(1);
        self
    }

    pub fn with_polls_until_ready(mut self, polls: u32) -> Self {
        self.polls_until_ready = polls;
        self
    }

    /// New endpoints end up `Failed` with this reason instead of `InService`.
    pub fn with_creation_failure(mut self, reason: &str) -> Self {
        self.creation_failure = Some(reason.to_string());
        self
    }

    /// Make every subsequent `op` call fail with `err`.
    pub async fn fail_on(&self, op: Operation, err: Error) {
        self.inner.write().await.failures.insert(op, err);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.inner.read().await.calls.clone()
    }

    pub async fn deletes(&self) -> Vec<Call> {
        self.calls().await.into_iter().filter(Call::is_delete).collect()
    }

    pub async fn count(&self, op: Operation) -> usize {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }

    pub async fn clear_calls(&self) {
        self.inner.write().await.calls.clear();
    }

    /// Register a model without going through `create_model`.
    pub async fn seed_model(&self, name: &str) {
        let mut inner = self.inner.write().await;
        let created = tick(&mut inner);
        inner.models.push((
            model_summary(name, created),
            CreateModelInput {
                model_name: name.to_string(),
                execution_role_arn: String::new(),
                primary_container: Default::default(),
            },
        ));
    }

    /// Register an in-service endpoint whose config has one variant per model name.
    pub async fn seed_endpoint(&self, name: &str, config_name: &str, model_names: &[&str]) {
        let mut inner = self.inner.write().await;
        let created = tick(&mut inner);
        inner.configs.push(EndpointConfigDescription {
            endpoint_config_name: config_name.to_string(),
            endpoint_config_arn: format!("{ARN_PREFIX}:endpoint-config/{config_name}"),
            production_variants: model_names
                .iter()
                .enumerate()
                .map(|(i, m)| ProductionVariant {
                    variant_name: format!("variant-{i}"),
                    model_name: Some(m.to_string()),
                    instance_type: Some("ml.g5.2xlarge".to_string()),
                    initial_instance_count: Some(1),
                    initial_variant_weight: Some(1.0),
                })
                .collect(),
            creation_time: Some(created),
        });
        inner.endpoints.push(StoredEndpoint {
            description: endpoint_description(name, config_name, EndpointStatus::InService, created),
            pending_polls: 0,
        });
    }

    pub async fn has_model(&self, name: &str) -> bool {
        self.inner
            .read()
            .await
            .models
            .iter()
            .any(|(m, _)| m.model_name == name)
    }

    pub async fn has_endpoint(&self, name: &str) -> bool {
        self.inner
            .read()
            .await
            .endpoints
            .iter()
            .any(|e| e.description.endpoint_name == name)
    }

    pub async fn has_endpoint_config(&self, name: &str) -> bool {
        self.inner
            .read()
            .await
            .configs
            .iter()
            .any(|c| c.endpoint_config_name == name)
    }

    /// The `CreateModel` body a model was registered with.
    pub async fn model_input(&self, name: &str) -> Option<CreateModelInput> {
        self.inner
            .read()
            .await
            .models
            .iter()
            .find(|(m, _)| m.model_name == name)
            .map(|(_, input)| input.clone())
    }

    fn paginate<T: Clone>(
        op: Operation,
        items: Vec<T>,
        query: &ListQuery,
        page_size: usize,
    ) -> Result<Page<T>> {
        let start = match &query.next_token {
            Some(t) => t.parse::<usize>().map_err(|_| {
                Error::remote(op.as_str(), "ValidationException", format!("invalid NextToken '{t}'"))
            })?,
            None => 0,
        };
        let size = query
            .max_results
            .map(|m| m as usize)
            .unwrap_or(page_size)
            .max(1);
        let end = start.saturating_add(size).min(items.len());
        let next_token = (end < items.len()).then(|| end.to_string());
        let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        Ok(Page {
            items: page,
            next_token,
            request_id: Some(format!("mem-{}-{start}", op.as_str())),
        })
    }
}

impl Default for MemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

fn tick(inner: &mut Inner) -> DateTime<Utc> {
    inner.clock = inner.clock.saturating_add(1);
    from_epoch_seconds(1_700_000_000.0 + inner.clock as f64).unwrap_or_else(Utc::now)
}

fn model_summary(name: &str, created: DateTime<Utc>) -> ModelSummary {
    ModelSummary {
        model_name: name.to_string(),
        model_arn: format!("{ARN_PREFIX}:model/{name}"),
        creation_time: created,
    }
}

fn endpoint_description(
    name: &str,
    config_name: &str,
    status: EndpointStatus,
    created: DateTime<Utc>,
) -> EndpointDescription {
    EndpointDescription {
        endpoint_name: name.to_string(),
        endpoint_arn: format!("{ARN_PREFIX}:endpoint/{name}"),
        endpoint_config_name: config_name.to_string(),
        endpoint_status: status,
        failure_reason: None,
        creation_time: Some(created),
    }
}

/// Record the call and return the injected failure for it, if any.
fn enter(inner: &mut Inner, call: Call) -> Result<()> {
    let op = call.operation();
    inner.calls.push(call);
    match inner.failures.get(&op) {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

fn already_exists(op: Operation, kind: &str, name: &str) -> Error {
    Error::remote(
        op.as_str(),
        "ValidationException",
        format!("Cannot create already existing {kind} \"{name}\"."),
    )
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn create_model(&self, input: &CreateModelInput) -> Result<String> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::CreateModel(input.model_name.clone()))?;
        if inner.models.iter().any(|(m, _)| m.model_name == input.model_name) {
            return Err(already_exists(Operation::CreateModel, "model", &input.model_name));
        }
        let created = tick(&mut inner);
        let summary = model_summary(&input.model_name, created);
        let arn = summary.model_arn.clone();
        inner.models.push((summary, input.clone()));
        Ok(arn)
    }

    async fn create_endpoint_config(&self, input: &CreateEndpointConfigInput) -> Result<String> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::CreateEndpointConfig(input.endpoint_config_name.clone()))?;
        if inner
            .configs
            .iter()
            .any(|c| c.endpoint_config_name == input.endpoint_config_name)
        {
            return Err(already_exists(
                Operation::CreateEndpointConfig,
                "endpoint configuration",
                &input.endpoint_config_name,
            ));
        }
        for model in input.production_variants.iter().filter_map(|v| v.model_name.as_ref()) {
            if !inner.models.iter().any(|(m, _)| &m.model_name == model) {
                return Err(Error::not_found("model", model));
            }
        }
        let created = tick(&mut inner);
        let arn = format!("{ARN_PREFIX}:endpoint-config/{}", input.endpoint_config_name);
        inner.configs.push(EndpointConfigDescription {
            endpoint_config_name: input.endpoint_config_name.clone(),
            endpoint_config_arn: arn.clone(),
            production_variants: input.production_variants.clone(),
            creation_time: Some(created),
        });
        Ok(arn)
    }

    async fn create_endpoint(&self, input: &CreateEndpointInput) -> Result<String> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::CreateEndpoint(input.endpoint_name.clone()))?;
        if inner
            .endpoints
            .iter()
            .any(|e| e.description.endpoint_name == input.endpoint_name)
        {
            return Err(already_exists(Operation::CreateEndpoint, "endpoint", &input.endpoint_name));
        }
        if !inner
            .configs
            .iter()
            .any(|c| c.endpoint_config_name == input.endpoint_config_name)
        {
            return Err(Error::not_found("endpoint config", &input.endpoint_config_name));
        }
        let created = tick(&mut inner);
        let mut description = endpoint_description(
            &input.endpoint_name,
            &input.endpoint_config_name,
            EndpointStatus::Creating,
            created,
        );
        if self.polls_until_ready == 0 {
            settle(&mut description, self.creation_failure.as_deref());
        }
        let arn = description.endpoint_arn.clone();
        inner.endpoints.push(StoredEndpoint {
            description,
            pending_polls: self.polls_until_ready,
        });
        Ok(arn)
    }

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::DescribeEndpoint(name.to_string()))?;
        let stored = inner
            .endpoints
            .iter_mut()
            .find(|e| e.description.endpoint_name == name)
            .ok_or_else(|| Error::not_found("endpoint", name))?;
        if stored.description.endpoint_status == EndpointStatus::Creating {
            stored.pending_polls = stored.pending_polls.saturating_sub(1);
            if stored.pending_polls == 0 {
                settle(&mut stored.description, self.creation_failure.as_deref());
            }
        }
        Ok(stored.description.clone())
    }

    async fn describe_endpoint_config(&self, name: &str) -> Result<EndpointConfigDescription> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::DescribeEndpointConfig(name.to_string()))?;
        inner
            .configs
            .iter()
            .find(|c| c.endpoint_config_name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("endpoint config", name))
    }

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::DeleteEndpoint(name.to_string()))?;
        let before = inner.endpoints.len();
        inner.endpoints.retain(|e| e.description.endpoint_name != name);
        if inner.endpoints.len() == before {
            return Err(Error::not_found("endpoint", name));
        }
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::DeleteEndpointConfig(name.to_string()))?;
        let before = inner.configs.len();
        inner.configs.retain(|c| c.endpoint_config_name != name);
        if inner.configs.len() == before {
            return Err(Error::not_found("endpoint config", name));
        }
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        enter(&mut inner, Call::DeleteModel(name.to_string()))?;
        let before = inner.models.len();
        inner.models.retain(|(m, _)| m.model_name != name);
        if inner.models.len() == before {
            return Err(Error::not_found("model", name));
        }
        Ok(())
    }

    async fn list_models(&self, query: &ListQuery) -> Result<Page<ModelSummary>> {
        let items = {
            let mut inner = self.inner.write().await;
            enter(&mut inner, Call::ListModels(query.next_token.clone()))?;
            inner
                .models
                .iter()
                .map(|(m, _)| m)
                .filter(|m| matches_filter(&m.model_name, query))
                .cloned()
                .collect::<Vec<_>>()
        };
        Self::paginate(Operation::ListModels, items, query, self.model_page_size)
    }

    async fn list_endpoints(&self, query: &ListQuery) -> Result<Page<EndpointSummary>> {
        let items = {
            let mut inner = self.inner.write().await;
            enter(&mut inner, Call::ListEndpoints(query.next_token.clone()))?;
            inner
                .endpoints
                .iter()
                .map(|e| &e.description)
                .filter(|d| matches_filter(&d.endpoint_name, query))
                .map(|d| EndpointSummary {
                    endpoint_name: d.endpoint_name.clone(),
                    endpoint_arn: d.endpoint_arn.clone(),
                    endpoint_status: d.endpoint_status.clone(),
                    creation_time: d.creation_time.unwrap_or_else(Utc::now),
                    last_modified_time: d.creation_time,
                })
                .collect::<Vec<_>>()
        };
        Self::paginate(Operation::ListEndpoints, items, query, self.endpoint_page_size)
    }
}

fn settle(description: &mut EndpointDescription, failure: Option<&str>) {
    match failure {
        Some(reason) => {
            description.endpoint_status = EndpointStatus::Failed;
            description.failure_reason = Some(reason.to_string());
        }
        None => description.endpoint_status = EndpointStatus::InService,
    }
}

fn matches_filter(name: &str, query: &ListQuery) -> bool {
    query
        .name_contains
        .as_deref()
        .map_or(true, |needle| name.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_follow_offsets() {
        let cp = MemoryControlPlane::new().with_page_size(2);
        for name in ["a", "b", "c"] {
            cp.seed_model(name).await;
        }

        let p1 = cp.list_models(&ListQuery::default()).await.unwrap();
        assert_eq!(p1.items.len(), 2);
        assert_eq!(p1.next_token.as_deref(), Some("2"));

        let p2 = cp
            .list_models(&ListQuery::default().with_token(p1.next_token))
            .await
            .unwrap();
        assert_eq!(p2.items.len(), 1);
        assert_eq!(p2.items[0].model_name, "c");
        assert!(p2.next_token.is_none());
    }

    #[tokio::test]
    async fn test_empty_listing_has_no_token() {
        let cp = MemoryControlPlane::new();
        let page = cp.list_endpoints(&ListQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_name_filter() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("llama-a").await;
        cp.seed_model("mistral-b").await;
        let query = ListQuery {
            name_contains: Some("mistral".to_string()),
            ..Default::default()
        };
        let page = cp.list_models(&query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].model_name, "mistral-b");
    }

    #[tokio::test]
    async fn test_endpoint_becomes_ready_after_polls() {
        let cp = MemoryControlPlane::new().with_polls_until_ready(2);
        cp.seed_endpoint("seed", "cfg", &["m"]).await;
        cp.create_endpoint(&CreateEndpointInput {
            endpoint_name: "ep".to_string(),
            endpoint_config_name: "cfg".to_string(),
        })
        .await
        .unwrap();

        let first = cp.describe_endpoint("ep").await.unwrap();
        assert_eq!(first.endpoint_status, EndpointStatus::Creating);
        let second = cp.describe_endpoint("ep").await.unwrap();
        assert_eq!(second.endpoint_status, EndpointStatus::InService);
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let cp = MemoryControlPlane::new();
        cp.fail_on(Operation::ListModels, Error::remote("ListModels", "AccessDenied", "no"))
            .await;
        let err = cp.list_models(&ListQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::RemoteService { .. }));
        assert_eq!(cp.count(Operation::ListModels).await, 1);
    }

    #[tokio::test]
    async fn test_token_past_the_end_is_an_empty_last_page() {
        let cp = MemoryControlPlane::new().with_page_size(2);
        cp.seed_model("a").await;
        let query = ListQuery::default().with_token(Some(usize::MAX.to_string()));
        let page = cp.list_models(&query).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let cp = MemoryControlPlane::new();
        let err = cp.delete_model("ghost").await.unwrap_err();
        assert_eq!(err, Error::not_found("model", "ghost"));
    }
}
