mod args;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use sagectl::{
    deploy, list, teardown, ArtifactResolver, Catalog, DeployRequest, FixedArtifact, ListOptions,
    Settings,
};
use sagectl_api::{ControlPlane, Credentials, HttpControlPlane};
use sagectl_common::Error;

use crate::args::{Args, Command};
use crate::output::{print_deployed, print_listing_as, print_teardown, print_teardown_failure};

fn control_plane(settings: &Settings) -> Result<Box<dyn ControlPlane>, Error> {
    let cp = HttpControlPlane::new(
        &settings.region,
        settings.endpoint_url.as_deref(),
        Credentials::from_env()?,
    )?;
    Ok(Box::new(cp))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let otel_guard = sagectl_common::telemetry::init_tracing(
        "sagectl",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
        &args.log_format,
    );

    let settings = args.settings();
    let result = dispatch(&settings, args.command, control_plane).await;

    if let Some(provider) = otel_guard {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }
    result
}

/// Run one subcommand. `connect` is only called once the arguments are known to be usable.
async fn dispatch<F>(settings: &Settings, command: Option<Command>, connect: F) -> Result<ExitCode>
where
    F: FnOnce(&Settings) -> Result<Box<dyn ControlPlane>, Error>,
{
    let Some(command) = command else {
        eprintln!("error: a command is required\n");
        eprintln!("{}", Args::command().render_usage());
        return Ok(ExitCode::from(1));
    };

    match command {
        Command::Deploy {
            model_id,
            model_version,
            instance_type,
            no_eula,
            wait,
            endpoint_name,
            image_uri,
            model_data_url,
        } => {
            let mut req = DeployRequest::from_settings(settings);
            if let Some(id) = model_id {
                req.model_id = id;
            }
            if let Some(v) = model_version {
                req.model_version = v;
            }
            if let Some(t) = instance_type {
                req.instance_type = t;
            }
            req.accept_eula = !no_eula;
            req.wait = wait;
            req.endpoint_name = endpoint_name;

            let artifacts: Box<dyn ArtifactResolver> = match &image_uri {
                Some(image) => Box::new(FixedArtifact::new(image, model_data_url.as_deref())),
                None => Box::new(Catalog::from_settings(settings)?),
            };
            let cp = connect(settings)?;
            let handle = deploy(cp.as_ref(), artifacts.as_ref(), settings, &req).await?;
            print_deployed(&handle);
        }
        Command::List {
            endpoints_only,
            models_only,
            json,
            name_contains,
        } => {
            let opts = ListOptions {
                models: !endpoints_only,
                endpoints: !models_only,
                name_contains,
            };
            let cp = connect(settings)?;
            match list(cp.as_ref(), &opts).await {
                Ok(listing) => print_listing_as(&listing, json),
                Err(e) => {
                    print_listing_as(&e.partial, json);
                    return Err(e.into());
                }
            }
        }
        Command::Delete {
            endpoint_name,
            keep_model,
        } => {
            let Some(endpoint_name) = endpoint_name.filter(|n| !n.is_empty()) else {
                eprintln!(
                    "✗ {}",
                    Error::Configuration("--endpoint-name is required".to_string())
                );
                return Ok(ExitCode::from(1));
            };
            let cp = match connect(settings) {
                Ok(cp) => cp,
                Err(e) => {
                    eprintln!("✗ Failed to delete endpoint '{}': {}", endpoint_name, e);
                    return Ok(ExitCode::from(1));
                }
            };
            match teardown(cp.as_ref(), &endpoint_name, keep_model).await {
                Ok(report) => print_teardown(&report),
                Err(failure) => {
                    print_teardown_failure(&failure);
                    return Ok(ExitCode::from(1));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use sagectl_api::{MemoryControlPlane, Operation};

    use super::*;

    async fn run_with(cp: &MemoryControlPlane, argv: &[&str]) -> Result<ExitCode> {
        let args = Args::try_parse_from(argv).unwrap();
        let settings = Settings {
            poll_interval: std::time::Duration::ZERO,
            ..args.settings()
        };
        let cp = cp.clone();
        dispatch(&settings, args.command, move |_| {
            Ok(Box::new(cp) as Box<dyn ControlPlane>)
        })
        .await
    }

    #[tokio::test]
    async fn test_no_command_exits_one() {
        let cp = MemoryControlPlane::new();
        let code = run_with(&cp, &["sagectl"]).await.unwrap();
        assert_eq!(code, ExitCode::from(1));
    }

    #[tokio::test]
    async fn test_delete_without_name_exits_one() {
        let cp = MemoryControlPlane::new();
        let code = run_with(&cp, &["sagectl", "delete"]).await.unwrap();
        assert_eq!(code, ExitCode::from(1));
        assert!(cp.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_endpoint_exits_one() {
        let cp = MemoryControlPlane::new();
        let code = run_with(&cp, &["sagectl", "delete", "--endpoint-name", "ghost"])
            .await
            .unwrap();
        assert_eq!(code, ExitCode::from(1));
        assert_eq!(cp.count(Operation::DeleteEndpoint).await, 0);
    }

    #[tokio::test]
    async fn test_delete_existing_endpoint_succeeds() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("demo-model").await;
        cp.seed_endpoint("demo-model-endpoint", "demo-model-endpoint", &["demo-model"])
            .await;

        let code = run_with(&cp, &["sagectl", "delete", "--endpoint-name", "demo-model-endpoint"])
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!cp.has_endpoint("demo-model-endpoint").await);
        assert!(!cp.has_model("demo-model").await);
    }

    #[tokio::test]
    async fn test_deploy_with_image_succeeds() {
        let cp = MemoryControlPlane::new();
        let code = run_with(
            &cp,
            &[
                "sagectl",
                "deploy",
                "--role",
                "arn:aws:iam::000000000000:role/test",
                "--model-id",
                "demo-model",
                "--image-uri",
                "img:1",
            ],
        )
        .await
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(cp.has_endpoint("demo-model-endpoint").await);
    }

    #[tokio::test]
    async fn test_list_empty_succeeds() {
        let cp = MemoryControlPlane::new();
        let code = run_with(&cp, &["sagectl", "list", "--json"]).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_list_json_failure_is_an_error() {
        let cp = MemoryControlPlane::new();
        cp.seed_model("demo-model").await;
        cp.fail_on(
            Operation::ListEndpoints,
            Error::remote("ListEndpoints", "ThrottlingException", "slow down"),
        )
        .await;

        let err = run_with(&cp, &["sagectl", "list", "--json"]).await.unwrap_err();
        let list_err = err.downcast_ref::<sagectl::ListError>().unwrap();
        assert_eq!(list_err.partial.models.as_ref().map(|m| m.len()), Some(1));
        assert_eq!(cp.count(Operation::ListModels).await, 1);
    }
}
