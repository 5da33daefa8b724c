use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{debug, info};

use sagectl_api::ControlPlane;
use sagectl_common::{
    CreateEndpointConfigInput, CreateEndpointInput, CreateModelInput, EndpointStatus, Error,
    ProductionVariant,
};

use crate::catalog::ArtifactResolver;
use crate::settings::Settings;

const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub model_id: String,
    pub model_version: String,
    pub role_arn: Option<String>,
    pub instance_type: String,
    pub accept_eula: bool,
    /// Block until the endpoint is `InService` or `Failed`.
    pub wait: bool,
    /// Defaults to `<model id>-endpoint`.
    pub endpoint_name: Option<String>,
}

impl DeployRequest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model_id: settings.default_model_id.clone(),
            model_version: settings.default_model_version.clone(),
            role_arn: settings.role_arn.clone(),
            instance_type: settings.default_instance_type.clone(),
            accept_eula: true,
            wait: false,
            endpoint_name: None,
        }
    }
}

/// What was created. `status` is `None` when the deploy did not wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHandle {
    pub endpoint_name: String,
    pub endpoint_arn: String,
    pub endpoint_config_name: String,
    pub model_name: String,
    pub status: Option<EndpointStatus>,
}

#[derive(Debug, ThisError)]
pub enum DeployError {
    #[error(transparent)]
    Api(#[from] Error),

    #[error("endpoint '{name}' failed to come up: {reason}")]
    EndpointFailed { name: String, reason: String },
}

/// Restrict to `[A-Za-z0-9-]` and the service's name length limit.
pub fn resource_name(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    out.truncate(MAX_NAME_LEN);
    out.trim_matches('-').to_string()
}

/// Create the model, its endpoint config and the endpoint.
///
/// Nothing is retried and nothing is rolled back: a failure after
/// `CreateModel` leaves the earlier resources in place.
pub async fn deploy(
    cp: &dyn ControlPlane,
    artifacts: &dyn ArtifactResolver,
    settings: &Settings,
    req: &DeployRequest,
) -> Result<EndpointHandle, DeployError> {
    let role_arn = req
        .role_arn
        .clone()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::Configuration("an execution role is required (--role)".to_string()))?;

    let artifact = artifacts.resolve(&req.model_id, &req.model_version).await?;
    if artifact.gated && !req.accept_eula {
        return Err(Error::Configuration(format!(
            "model {} requires accepting its end-user license agreement",
            req.model_id
        ))
        .into());
    }

    let model_name = resource_name(&req.model_id);
    let endpoint_name = match &req.endpoint_name {
        Some(n) => resource_name(n),
        None => resource_name(&format!("{}-endpoint", req.model_id)),
    };
    if model_name.is_empty() || endpoint_name.is_empty() {
        return Err(Error::Configuration(format!(
            "cannot derive resource names from model id '{}'",
            req.model_id
        ))
        .into());
    }
    let endpoint_config_name = endpoint_name.clone();

    info!(
        model_id = %req.model_id,
        version = %artifact.version,
        instance_type = %req.instance_type,
        "deploying model"
    );

    cp.create_model(&CreateModelInput {
        model_name: model_name.clone(),
        execution_role_arn: role_arn,
        primary_container: artifact.container(req.accept_eula),
    })
    .await?;
    info!(model = %model_name, "model created");

    cp.create_endpoint_config(&CreateEndpointConfigInput {
        endpoint_config_name: endpoint_config_name.clone(),
        production_variants: vec![ProductionVariant::all_traffic(&model_name, &req.instance_type)],
    })
    .await?;
    info!(endpoint_config = %endpoint_config_name, "endpoint config created");

    let endpoint_arn = cp
        .create_endpoint(&CreateEndpointInput {
            endpoint_name: endpoint_name.clone(),
            endpoint_config_name: endpoint_config_name.clone(),
        })
        .await?;
    info!(endpoint = %endpoint_name, "endpoint creation accepted");

    let mut handle = EndpointHandle {
        endpoint_name,
        endpoint_arn,
        endpoint_config_name,
        model_name,
        status: None,
    };

    if req.wait {
        handle.status = Some(wait_until_terminal(cp, settings, &handle.endpoint_name).await?);
    }
    Ok(handle)
}

async fn wait_until_terminal(
    cp: &dyn ControlPlane,
    settings: &Settings,
    endpoint_name: &str,
) -> Result<EndpointStatus, DeployError> {
    let mut polls = 0u32;
    loop {
        let desc = cp.describe_endpoint(endpoint_name).await?;
        polls += 1;
        debug!(endpoint = endpoint_name, status = %desc.endpoint_status, polls, "endpoint status");

        if !desc.endpoint_status.is_terminal() {
            tokio::time::sleep(settings.poll_interval).await;
            continue;
        }
        if desc.endpoint_status == EndpointStatus::Failed {
            return Err(DeployError::EndpointFailed {
                name: endpoint_name.to_string(),
                reason: desc
                    .failure_reason
                    .unwrap_or_else(|| "no failure reason reported".to_string()),
            });
        }
        info!(endpoint = endpoint_name, polls, "endpoint in service");
        return Ok(desc.endpoint_status);
    }
}
