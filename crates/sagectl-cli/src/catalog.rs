//! Resolve a model id and version to a container image and artifact location.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, info};

use sagectl_common::{ContainerDefinition, Error, ModelDataSource, Result, S3DataSource};

use crate::settings::Settings;

const MANIFEST_KEY: &str = "models_manifest.json";

/// What a deploy needs to build the model's primary container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub model_id: String,
    pub version: String,
    pub image: String,
    pub artifact_uri: Option<String>,
    pub environment: BTreeMap<String, String>,
    /// The model is licensed and needs explicit EULA acceptance.
    pub gated: bool,
}

impl ResolvedArtifact {
    pub fn container(&self, accept_eula: bool) -> ContainerDefinition {
        let mut container = ContainerDefinition {
            image: self.image.clone(),
            environment: self.environment.clone(),
            ..Default::default()
        };
        match &self.artifact_uri {
            Some(uri) if self.gated => {
                container.model_data_source = Some(ModelDataSource {
                    s3_data_source: S3DataSource::for_uri(uri, accept_eula),
                });
            }
            Some(uri) => container.model_data_url = Some(uri.clone()),
            None => {}
        }
        container
    }
}

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, model_id: &str, version: &str) -> Result<ResolvedArtifact>;
}

/// Artifact given directly on the command line.
#[derive(Debug, Clone)]
pub struct FixedArtifact {
    image: String,
    artifact_uri: Option<String>,
    gated: bool,
}

impl FixedArtifact {
    pub fn new(image: &str, artifact_uri: Option<&str>) -> Self {
        Self {
            image: image.to_string(),
            artifact_uri: artifact_uri.map(str::to_string),
            gated: false,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }
}

#[async_trait]
impl ArtifactResolver for FixedArtifact {
    async fn resolve(&self, model_id: &str, version: &str) -> Result<ResolvedArtifact> {
        Ok(ResolvedArtifact {
            model_id: model_id.to_string(),
            version: version.to_string(),
            image: self.image.clone(),
            artifact_uri: self.artifact_uri.clone(),
            environment: BTreeMap::new(),
            gated: self.gated,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub model_id: String,
    pub version: String,
    pub spec_key: String,
}

#[derive(Debug, Deserialize)]
struct ModelSpecDoc {
    #[serde(default)]
    hosting_ecr_uri: Option<String>,
    #[serde(default)]
    hosting_artifact_key: Option<String>,
    #[serde(default)]
    hosting_prepacked_artifact_key: Option<String>,
    #[serde(default)]
    hosting_eula_key: Option<String>,
    #[serde(default)]
    inference_environment_variables: Vec<EnvVar>,
}

#[derive(Debug, Deserialize)]
struct EnvVar {
    name: String,
    #[serde(default)]
    default: Value,
    #[serde(default)]
    scope: Option<String>,
}

/// Public model hub, read over plain HTTPS.
#[derive(Debug, Clone)]
pub struct Catalog {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl Catalog {
    pub fn new(base_url: &str, bucket: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.catalog_base(), &settings.artifact_bucket())
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, key: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, key.trim_start_matches('/'));
        debug!(%url, "fetching catalog document");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::remote(operation, "TransportError", e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::remote(operation, format!("Http{}", status.as_u16()), body));
        }
        resp.json()
            .await
            .map_err(|e| Error::remote(operation, "DeserializationError", e.to_string()))
    }

    fn s3_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArtifactResolver for Catalog {
    async fn resolve(&self, model_id: &str, version: &str) -> Result<ResolvedArtifact> {
        let manifest: Vec<ManifestEntry> = self.get_json("FetchModelManifest", MANIFEST_KEY).await?;
        let entry = select_version(&manifest, model_id, version).ok_or_else(|| {
            Error::not_found("model artifact", format!("{model_id}@{version}"))
        })?;
        let spec: ModelSpecDoc = self.get_json("FetchModelSpec", &entry.spec_key).await?;

        let image = spec.hosting_ecr_uri.ok_or_else(|| {
            Error::Configuration(format!(
                "catalog entry {}@{} has no hosting image; pass --image-uri",
                entry.model_id, entry.version
            ))
        })?;
        let artifact_uri = spec
            .hosting_prepacked_artifact_key
            .or(spec.hosting_artifact_key)
            .map(|k| self.s3_uri(&k));
        let environment = spec
            .inference_environment_variables
            .into_iter()
            .filter(|v| v.scope.as_deref() == Some("container"))
            .map(|v| {
                let value = match v.default {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (v.name, value)
            })
            .collect();

        info!(model_id = %entry.model_id, version = %entry.version, %image, "resolved model artifact");
        Ok(ResolvedArtifact {
            model_id: entry.model_id.clone(),
            version: entry.version.clone(),
            image,
            artifact_uri,
            environment,
            gated: spec.hosting_eula_key.is_some(),
        })
    }
}

/// Pick the manifest entry for `model_id`; `*` means the highest version.
pub fn select_version<'a>(
    entries: &'a [ManifestEntry],
    model_id: &str,
    version: &str,
) -> Option<&'a ManifestEntry> {
    let candidates = entries.iter().filter(|e| e.model_id == model_id);
    if version == "*" {
        candidates.max_by(|a, b| compare_versions(&a.version, &b.version))
    } else {
        candidates
            .filter(|e| e.version == version)
            .max_by(|a, b| compare_versions(&a.version, &b.version))
    }
}

/// Dotted comparison, numerically where both parts are numbers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, version: &str) -> ManifestEntry {
        ManifestEntry {
            model_id: id.to_string(),
            version: version.to_string(),
            spec_key: format!("specs/{id}/{version}.json"),
        }
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare_versions("3.1.4", "3.1.4"), Ordering::Equal);
    }

    #[test]
    fn test_select_latest() {
        let manifest = vec![
            entry("m", "1.2.0"),
            entry("other", "9.0.0"),
            entry("m", "1.10.0"),
            entry("m", "1.9.9"),
        ];
        assert_eq!(select_version(&manifest, "m", "*").unwrap().version, "1.10.0");
        assert_eq!(select_version(&manifest, "m", "1.2.0").unwrap().version, "1.2.0");
        assert!(select_version(&manifest, "m", "4.0.0").is_none());
        assert!(select_version(&manifest, "missing", "*").is_none());
    }

    #[test]
    fn test_gated_container_uses_data_source() {
        let artifact = ResolvedArtifact {
            model_id: "m".to_string(),
            version: "1".to_string(),
            image: "img".to_string(),
            artifact_uri: Some("s3://bucket/m/artifacts/".to_string()),
            environment: BTreeMap::new(),
            gated: true,
        };
        let c = artifact.container(true);
        assert!(c.model_data_url.is_none());
        let src = c.model_data_source.unwrap().s3_data_source;
        assert_eq!(src.s3_data_type, "S3Prefix");
        assert!(src.model_access_config.unwrap().accept_eula);

        let open = ResolvedArtifact {
            gated: false,
            artifact_uri: Some("s3://bucket/m.tar.gz".to_string()),
            ..artifact
        };
        let c = open.container(false);
        assert_eq!(c.model_data_url.as_deref(), Some("s3://bucket/m.tar.gz"));
        assert!(c.model_data_source.is_none());
    }
}
