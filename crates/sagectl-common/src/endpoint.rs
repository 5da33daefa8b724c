use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the hosting service for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointStatus {
    OutOfService,
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    Deleting,
    Failed,
    UpdateRollbackFailed,
    Unknown(String),
}

impl EndpointStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EndpointStatus::OutOfService => "OutOfService",
            EndpointStatus::Creating => "Creating",
            EndpointStatus::Updating => "Updating",
            EndpointStatus::SystemUpdating => "SystemUpdating",
            EndpointStatus::RollingBack => "RollingBack",
            EndpointStatus::InService => "InService",
            EndpointStatus::Deleting => "Deleting",
            EndpointStatus::Failed => "Failed",
            EndpointStatus::UpdateRollbackFailed => "UpdateRollbackFailed",
            EndpointStatus::Unknown(s) => s,
        }
    }

    /// States a deploy waiting on creation stops at.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EndpointStatus::InService | EndpointStatus::Failed)
    }
}

impl From<String> for EndpointStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OutOfService" => EndpointStatus::OutOfService,
            "Creating" => EndpointStatus::Creating,
            "Updating" => EndpointStatus::Updating,
            "SystemUpdating" => EndpointStatus::SystemUpdating,
            "RollingBack" => EndpointStatus::RollingBack,
            "InService" => EndpointStatus::InService,
            "Deleting" => EndpointStatus::Deleting,
            "Failed" => EndpointStatus::Failed,
            "UpdateRollbackFailed" => EndpointStatus::UpdateRollbackFailed,
            _ => EndpointStatus::Unknown(s),
        }
    }
}

impl From<EndpointStatus> for String {
    fn from(s: EndpointStatus) -> Self {
        match s {
            EndpointStatus::Unknown(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a `ListEndpoints` page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSummary {
    pub endpoint_name: String,

    #[serde(default)]
    pub endpoint_arn: String,

    pub endpoint_status: EndpointStatus,

    #[serde(with = "crate::time::epoch_seconds")]
    pub creation_time: DateTime<Utc>,

    #[serde(
        default,
        with = "crate::time::option_epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_time: Option<DateTime<Utc>>,
}

/// Response of `DescribeEndpoint`, trimmed to the fields this tool reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointDescription {
    pub endpoint_name: String,

    #[serde(default)]
    pub endpoint_arn: String,

    pub endpoint_config_name: String,

    pub endpoint_status: EndpointStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(
        default,
        with = "crate::time::option_epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
}

/// Body of `CreateEndpoint`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointInput {
    pub endpoint_name: String,
    pub endpoint_config_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_unknown() {
        let s: EndpointStatus = serde_json::from_str("\"Creating\"").unwrap();
        assert_eq!(s, EndpointStatus::Creating);

        let s: EndpointStatus = serde_json::from_str("\"Hibernating\"").unwrap();
        assert_eq!(s, EndpointStatus::Unknown("Hibernating".to_string()));
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"Hibernating\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(EndpointStatus::InService.is_terminal());
        assert!(EndpointStatus::Failed.is_terminal());
        assert!(!EndpointStatus::Creating.is_terminal());
        assert!(!EndpointStatus::UpdateRollbackFailed.is_terminal());
    }
}
