use std::fmt;

use async_trait::async_trait;
use sagectl_common::{
    CreateEndpointConfigInput, CreateEndpointInput, CreateModelInput, EndpointConfigDescription,
    EndpointDescription, EndpointSummary, ListQuery, ModelSummary, Page, Result,
};

/// Control-plane calls this tool issues, named as the service names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateModel,
    CreateEndpointConfig,
    CreateEndpoint,
    DescribeEndpoint,
    DescribeEndpointConfig,
    DeleteEndpoint,
    DeleteEndpointConfig,
    DeleteModel,
    ListModels,
    ListEndpoints,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateModel => "CreateModel",
            Operation::CreateEndpointConfig => "CreateEndpointConfig",
            Operation::CreateEndpoint => "CreateEndpoint",
            Operation::DescribeEndpoint => "DescribeEndpoint",
            Operation::DescribeEndpointConfig => "DescribeEndpointConfig",
            Operation::DeleteEndpoint => "DeleteEndpoint",
            Operation::DeleteEndpointConfig => "DeleteEndpointConfig",
            Operation::DeleteModel => "DeleteModel",
            Operation::ListModels => "ListModels",
            Operation::ListEndpoints => "ListEndpoints",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD surface of the model-hosting control plane.
///
/// Create calls return the ARN of the new resource. List calls return one
/// page; callers follow `Page::next_token` themselves.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_model(&self, input: &CreateModelInput) -> Result<String>;
    async fn create_endpoint_config(&self, input: &CreateEndpointConfigInput) -> Result<String>;
    async fn create_endpoint(&self, input: &CreateEndpointInput) -> Result<String>;

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription>;
    async fn describe_endpoint_config(&self, name: &str) -> Result<EndpointConfigDescription>;

    async fn delete_endpoint(&self, name: &str) -> Result<()>;
    async fn delete_endpoint_config(&self, name: &str) -> Result<()>;
    async fn delete_model(&self, name: &str) -> Result<()>;

    async fn list_models(&self, query: &ListQuery) -> Result<Page<ModelSummary>>;
    async fn list_endpoints(&self, query: &ListQuery) -> Result<Page<EndpointSummary>>;
}
