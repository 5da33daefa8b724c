pub mod endpoint;
pub mod endpoint_config;
pub mod error;
pub mod model;
pub mod page;
pub mod time;

pub use endpoint::{CreateEndpointInput, EndpointDescription, EndpointStatus, EndpointSummary};
pub use endpoint_config::{CreateEndpointConfigInput, EndpointConfigDescription, ProductionVariant};
pub use error::{Error, Result};
pub use model::{
    ContainerDefinition, CreateModelInput, ModelAccessConfig, ModelDataSource, ModelSummary,
    S3DataSource,
};
pub use page::{Collected, ListQuery, Page};

pub mod telemetry;
