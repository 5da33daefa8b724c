use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MODEL_ID: &str = "huggingface-llm-mistral-7b-v3";
/// `*` resolves to the newest published version.
pub const DEFAULT_MODEL_VERSION: &str = "*";
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.g5.2xlarge";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Everything an operation needs to know about its environment.
///
/// Built once per invocation from CLI flags and environment, then passed
/// by reference into each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub region: String,
    /// Overrides the regional control-plane URL.
    pub endpoint_url: Option<String>,
    /// Overrides the public model hub base URL.
    pub catalog_url: Option<String>,
    /// Execution role for created models. No built-in default.
    pub role_arn: Option<String>,
    pub default_model_id: String,
    pub default_model_version: String,
    pub default_instance_type: String,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            catalog_url: None,
            role_arn: None,
            default_model_id: DEFAULT_MODEL_ID.to_string(),
            default_model_version: DEFAULT_MODEL_VERSION.to_string(),
            default_instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Settings {
    /// Bucket holding the hub's prebuilt artifacts for this region.
    pub fn artifact_bucket(&self) -> String {
        format!("jumpstart-cache-prod-{}", self.region)
    }

    pub fn catalog_base(&self) -> String {
        match &self.catalog_url {
            Some(u) => u.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                self.artifact_bucket(),
                self.region
            ),
        }
    }
}
