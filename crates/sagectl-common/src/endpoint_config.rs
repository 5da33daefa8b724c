use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A model slot inside an endpoint config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProductionVariant {
    pub variant_name: String,

    /// Absent for variants backed by inference components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_instance_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_variant_weight: Option<f32>,
}

impl ProductionVariant {
    /// Single-instance variant taking all traffic.
    pub fn all_traffic(model_name: &str, instance_type: &str) -> Self {
        Self {
            variant_name: "AllTraffic".to_string(),
            model_name: Some(model_name.to_string()),
            instance_type: Some(instance_type.to_string()),
            initial_instance_count: Some(1),
            initial_variant_weight: Some(1.0),
        }
    }
}

/// Response of `DescribeEndpointConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfigDescription {
    pub endpoint_config_name: String,

    #[serde(default)]
    pub endpoint_config_arn: String,

    #[serde(default)]
    pub production_variants: Vec<ProductionVariant>,

    #[serde(
        default,
        with = "crate::time::option_epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
}

impl EndpointConfigDescription {
    /// Model names referenced by the variants, first occurrence order, no duplicates.
    pub fn distinct_model_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.production_variants.iter().filter_map(|v| v.model_name.as_ref()) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }
}

/// Body of `CreateEndpointConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointConfigInput {
    pub endpoint_config_name: String,
    pub production_variants: Vec<ProductionVariant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, model: Option<&str>) -> ProductionVariant {
        ProductionVariant {
            variant_name: name.to_string(),
            model_name: model.map(str::to_string),
            instance_type: None,
            initial_instance_count: None,
            initial_variant_weight: None,
        }
    }

    #[test]
    fn test_distinct_model_names() {
        let cfg = EndpointConfigDescription {
            endpoint_config_name: "cfg".to_string(),
            endpoint_config_arn: String::new(),
            production_variants: vec![
                variant("a", Some("model-b")),
                variant("b", Some("model-a")),
                variant("c", Some("model-b")),
                variant("d", None),
            ],
            creation_time: None,
        };
        assert_eq!(cfg.distinct_model_names(), vec!["model-b", "model-a"]);
    }
}
