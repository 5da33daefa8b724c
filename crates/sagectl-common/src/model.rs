use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a `ListModels` page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelSummary {
    pub model_name: String,

    #[serde(default)]
    pub model_arn: String,

    #[serde(with = "crate::time::epoch_seconds")]
    pub creation_time: DateTime<Utc>,
}

/// Body of `CreateModel`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateModelInput {
    pub model_name: String,
    pub execution_role_arn: String,
    pub primary_container: ContainerDefinition,
}

/// Container image plus the model artifacts it serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub image: String,

    /// Compressed (`.tar.gz`) artifact location for ungated models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_data_url: Option<String>,

    /// Used instead of `model_data_url` when the artifact needs EULA acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_data_source: Option<ModelDataSource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelDataSource {
    pub s3_data_source: S3DataSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    pub s3_uri: String,
    /// `S3Prefix` or `S3Object`.
    pub s3_data_type: String,
    /// `None` or `Gzip`.
    pub compression_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_access_config: Option<ModelAccessConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelAccessConfig {
    pub accept_eula: bool,
}

impl S3DataSource {
    /// Describe an artifact location; a trailing `/` means an uncompressed prefix.
    pub fn for_uri(uri: &str, accept_eula: bool) -> Self {
        let prefix = uri.ends_with('/');
        Self {
            s3_uri: uri.to_string(),
            s3_data_type: if prefix { "S3Prefix" } else { "S3Object" }.to_string(),
            compression_type: if prefix { "None" } else { "Gzip" }.to_string(),
            model_access_config: Some(ModelAccessConfig { accept_eula }),
        }
    }
}
