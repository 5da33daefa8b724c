use std::fmt;

use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{error, info, warn};

use sagectl_api::ControlPlane;
use sagectl_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TeardownStep {
    DescribeEndpoint,
    DescribeEndpointConfig,
    DeleteEndpoint,
    DeleteEndpointConfig,
    DeleteModel,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeardownStep::DescribeEndpoint => "describe endpoint",
            TeardownStep::DescribeEndpointConfig => "describe endpoint config",
            TeardownStep::DeleteEndpoint => "delete endpoint",
            TeardownStep::DeleteEndpointConfig => "delete endpoint config",
            TeardownStep::DeleteModel => "delete model",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Deleted {
    Endpoint(String),
    EndpointConfig(String),
    Model(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub endpoint_name: String,
    pub endpoint_config_name: String,
    /// Distinct models the endpoint config referenced.
    pub models: Vec<String>,
    pub models_kept: bool,
}

/// Teardown stopped at `step`; whatever is in `deleted` is gone and the rest is orphaned.
#[derive(Debug, ThisError)]
#[error("teardown of endpoint '{endpoint_name}' failed at {step}: {source}")]
pub struct TeardownFailure {
    pub endpoint_name: String,
    pub step: TeardownStep,
    pub deleted: Vec<Deleted>,
    #[source]
    pub source: Error,
}

impl TeardownFailure {
    /// The config disappeared between describing the endpoint and describing the config.
    pub fn config_removed_out_of_band(&self) -> bool {
        self.step == TeardownStep::DescribeEndpointConfig && self.source.is_not_found()
    }
}

fn at(step: TeardownStep) -> impl FnOnce(Error) -> (TeardownStep, Error) {
    move |e| (step, e)
}

/// Delete an endpoint, then its config, then (unless `keep_models`) its models.
///
/// Never propagates: every failure is logged and returned as a
/// `TeardownFailure`. There is no rollback of steps already done.
pub async fn teardown(
    cp: &dyn ControlPlane,
    endpoint_name: &str,
    keep_models: bool,
) -> Result<TeardownReport, TeardownFailure> {
    let mut deleted = Vec::new();
    match run(cp, endpoint_name, keep_models, &mut deleted).await {
        Ok(report) => Ok(report),
        Err((step, source)) => {
            let failure = TeardownFailure {
                endpoint_name: endpoint_name.to_string(),
                step,
                deleted,
                source,
            };
            if failure.config_removed_out_of_band() {
                warn!(endpoint = endpoint_name, "endpoint config was removed out-of-band");
            }
            error!(
                endpoint = endpoint_name,
                step = %failure.step,
                deleted = ?failure.deleted,
                error = %failure.source,
                "error deleting endpoint and resources"
            );
            Err(failure)
        }
    }
}

async fn run(
    cp: &dyn ControlPlane,
    endpoint_name: &str,
    keep_models: bool,
    deleted: &mut Vec<Deleted>,
) -> Result<TeardownReport, (TeardownStep, Error)> {
    info!(endpoint = endpoint_name, "retrieving endpoint details");
    let endpoint = cp
        .describe_endpoint(endpoint_name)
        .await
        .map_err(at(TeardownStep::DescribeEndpoint))?;
    let config_name = endpoint.endpoint_config_name;

    let config = cp
        .describe_endpoint_config(&config_name)
        .await
        .map_err(at(TeardownStep::DescribeEndpointConfig))?;
    let models = config.distinct_model_names();

    info!(endpoint = endpoint_name, "deleting endpoint");
    cp.delete_endpoint(endpoint_name)
        .await
        .map_err(at(TeardownStep::DeleteEndpoint))?;
    deleted.push(Deleted::Endpoint(endpoint_name.to_string()));

    info!(endpoint_config = %config_name, "deleting endpoint config");
    cp.delete_endpoint_config(&config_name)
        .await
        .map_err(at(TeardownStep::DeleteEndpointConfig))?;
    deleted.push(Deleted::EndpointConfig(config_name.clone()));

    if keep_models {
        info!(models = ?models, "keeping models");
    } else {
        for model in &models {
            info!(model = %model, "deleting model");
            cp.delete_model(model)
                .await
                .map_err(at(TeardownStep::DeleteModel))?;
            deleted.push(Deleted::Model(model.clone()));
        }
    }

    Ok(TeardownReport {
        endpoint_name: endpoint_name.to_string(),
        endpoint_config_name: config_name,
        models,
        models_kept: keep_models,
    })
}

#[cfg(test)]
mod tests {
    use sagectl_api::{Call, MemoryControlPlane, Operation};

    use super::*;

    fn call(c: fn(String) -> Call, name: &str) -> Call {
        c(name.to_string())
    }

    #[tokio::test]
    async fn test_delete_order_and_dedup() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("model-a").await;
        cp.seed_model("model-b").await;
        cp.seed_endpoint("ep", "ep-config", &["model-a", "model-b", "model-a"])
            .await;

        let report = teardown(&cp, "ep", false).await.unwrap();
        assert_eq!(report.models, vec!["model-a", "model-b"]);
        assert_eq!(
            cp.deletes().await,
            vec![
                call(Call::DeleteEndpoint, "ep"),
                call(Call::DeleteEndpointConfig, "ep-config"),
                call(Call::DeleteModel, "model-a"),
                call(Call::DeleteModel, "model-b"),
            ]
        );
        assert!(!cp.has_model("model-a").await);
        assert!(!cp.has_endpoint("ep").await);
        assert!(!cp.has_endpoint_config("ep-config").await);
    }

    #[tokio::test]
    async fn test_keep_models() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("model-a").await;
        cp.seed_endpoint("ep", "ep-config", &["model-a"]).await;

        let report = teardown(&cp, "ep", true).await.unwrap();
        assert!(report.models_kept);
        assert_eq!(cp.count(Operation::DeleteModel).await, 0);
        assert!(cp.has_model("model-a").await);
    }

    #[tokio::test]
    async fn test_missing_endpoint() {
        let cp = MemoryControlPlane::new();
        let failure = teardown(&cp, "ghost", false).await.unwrap_err();

        assert_eq!(failure.step, TeardownStep::DescribeEndpoint);
        assert!(failure.source.is_not_found());
        assert!(failure.deleted.is_empty());
        assert_eq!(cp.count(Operation::DeleteEndpoint).await, 0);
    }

    #[tokio::test]
    async fn test_config_removed_out_of_band() {
        let cp = MemoryControlPlane::new();
        cp.seed_endpoint("ep", "ep-config", &["model-a"]).await;
        cp.delete_endpoint_config("ep-config").await.unwrap();
        cp.clear_calls().await;

        let failure = teardown(&cp, "ep", false).await.unwrap_err();
        assert!(failure.config_removed_out_of_band());
        assert!(cp.deletes().await.is_empty());
        assert!(cp.has_endpoint("ep").await);
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_orphans() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("model-a").await;
        cp.seed_endpoint("ep", "ep-config", &["model-a"]).await;
        cp.fail_on(
            Operation::DeleteEndpointConfig,
            Error::remote("DeleteEndpointConfig", "ThrottlingException", "rate exceeded"),
        )
        .await;

        let failure = teardown(&cp, "ep", false).await.unwrap_err();
        assert_eq!(failure.step, TeardownStep::DeleteEndpointConfig);
        assert_eq!(failure.deleted, vec![Deleted::Endpoint("ep".to_string())]);
        assert!(!cp.has_endpoint("ep").await);
        assert!(cp.has_endpoint_config("ep-config").await);
        assert!(cp.has_model("model-a").await);
        assert_eq!(cp.count(Operation::DeleteModel).await, 0);
    }

    #[tokio::test]
    async fn test_failure_message_names_step() {
        let cp = MemoryControlPlane::new();
        let failure = teardown(&cp, "ghost", true).await.unwrap_err();
        assert_eq!(
            failure.to_string(),
            "teardown of endpoint 'ghost' failed at describe endpoint: endpoint 'ghost' not found"
        );
    }
}
