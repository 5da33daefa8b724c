use std::time::Duration;

use clap::{Parser, Subcommand};

use sagectl::settings::{Settings, DEFAULT_REGION};

#[derive(Debug, Parser)]
#[command(name = "sagectl")]
#[command(about = "Deploy, list and tear down hosted model endpoints", long_about = None)]
pub struct Args {
    /// Service region (falls back to AWS_DEFAULT_REGION, then us-east-1)
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Control-plane URL override
    #[arg(long, env = "SAGECTL_ENDPOINT_URL", global = true)]
    pub endpoint_url: Option<String>,

    /// Model hub base URL override
    #[arg(long, env = "SAGECTL_CATALOG_URL", global = true)]
    pub catalog_url: Option<String>,

    /// Execution role ARN for created models
    #[arg(long, env = "SAGECTL_ROLE_ARN", global = true)]
    pub role: Option<String>,

    /// Seconds between status polls with `deploy --wait`
    #[arg(long, env = "SAGECTL_POLL_INTERVAL_SECS", default_value_t = 30, global = true)]
    pub poll_interval_secs: u64,

    /// Log format: text or json
    #[arg(long, env = "SAGECTL_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// OTLP/HTTP endpoint for exporting traces
    #[arg(long, env = "SAGECTL_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint
    #[arg(long, env = "SAGECTL_OTLP_TOKEN", global = true)]
    pub otlp_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a model and an endpoint serving it
    Deploy {
        /// Model hub identifier
        #[arg(long)]
        model_id: Option<String>,

        /// Model version, `*` for the latest
        #[arg(long)]
        model_version: Option<String>,

        /// Instance type to host on
        #[arg(long)]
        instance_type: Option<String>,

        /// Do not accept the model's end-user license agreement
        #[arg(long)]
        no_eula: bool,

        /// Block until the endpoint is InService or Failed
        #[arg(long)]
        wait: bool,

        /// Endpoint name (default: <model-id>-endpoint)
        #[arg(long)]
        endpoint_name: Option<String>,

        /// Container image; skips the model hub lookup
        #[arg(long)]
        image_uri: Option<String>,

        /// Model artifact location used with --image-uri
        #[arg(long, requires = "image_uri")]
        model_data_url: Option<String>,
    },
    /// List models and endpoints
    List {
        /// Only list endpoints
        #[arg(long, conflicts_with = "models_only")]
        endpoints_only: bool,

        /// Only list models
        #[arg(long)]
        models_only: bool,

        /// Print raw JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Only names containing this substring
        #[arg(long)]
        name_contains: Option<String>,
    },
    /// Delete an endpoint, its config and its models
    Delete {
        /// Endpoint to delete
        #[arg(long)]
        endpoint_name: Option<String>,

        /// Keep the models the endpoint served
        #[arg(long)]
        keep_model: bool,
    },
}

impl Args {
    pub fn settings(&self) -> Settings {
        let region = self
            .region
            .clone()
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Settings {
            region,
            endpoint_url: self.endpoint_url.clone(),
            catalog_url: self.catalog_url.clone(),
            role_arn: self.role.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            ..Default::default()
        }
    }
}
