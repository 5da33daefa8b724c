//! Deploy, list and delete against the in-memory control plane.

use std::time::Duration;

use sagectl::{deploy, list, teardown, DeployRequest, FixedArtifact, ListOptions, Settings};
use sagectl_api::{Call, MemoryControlPlane, Operation};

fn settings() -> Settings {
    Settings {
        role_arn: Some("arn:aws:iam::000000000000:role/service-role/test".to_string()),
        poll_interval: Duration::ZERO,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_deploy_list_delete() {
    let cp = MemoryControlPlane::new()
        .with_page_size(2)
        .with_endpoint_page_size(1)
        .with_polls_until_ready(3);
    let artifacts = FixedArtifact::new("123.dkr.ecr.us-east-1.amazonaws.com/llm:latest", None);
    let settings = settings();

    let req = DeployRequest {
        model_id: "demo-model".to_string(),
        ..DeployRequest::from_settings(&settings)
    };
    let handle = deploy(&cp, &artifacts, &settings, &req).await.unwrap();
    assert_eq!(handle.endpoint_name, "demo-model-endpoint");
    assert_eq!(cp.count(Operation::DescribeEndpoint).await, 0);

    cp.seed_model("other-model-a").await;
    cp.seed_model("other-model-b").await;
    cp.seed_endpoint("other-endpoint", "other-endpoint", &["other-model-a"])
        .await;

    let listing = list(&cp, &ListOptions::default()).await.unwrap();
    let models = listing.models.unwrap();
    let endpoints = listing.endpoints.unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(models.pages, 2);
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints.pages, 2);
    assert_eq!(models.items[0].model_name, "demo-model");

    cp.clear_calls().await;
    let report = teardown(&cp, "demo-model-endpoint", false).await.unwrap();
    assert_eq!(report.models, vec!["demo-model"]);
    assert_eq!(
        cp.deletes().await,
        vec![
            Call::DeleteEndpoint("demo-model-endpoint".to_string()),
            Call::DeleteEndpointConfig("demo-model-endpoint".to_string()),
            Call::DeleteModel("demo-model".to_string()),
        ]
    );

    let after = list(&cp, &ListOptions::default()).await.unwrap();
    assert_eq!(after.models.unwrap().len(), 2);
    assert_eq!(after.endpoints.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deploy_wait_then_delete_keeping_model() {
    let cp = MemoryControlPlane::new().with_polls_until_ready(3);
    let artifacts = FixedArtifact::new("img:1", Some("s3://bucket/model.tar.gz"));
    let settings = settings();

    let req = DeployRequest {
        model_id: "demo-model".to_string(),
        wait: true,
        ..DeployRequest::from_settings(&settings)
    };
    let handle = deploy(&cp, &artifacts, &settings, &req).await.unwrap();
    assert_eq!(handle.status.map(|s| s.to_string()).as_deref(), Some("InService"));
    assert_eq!(cp.count(Operation::DescribeEndpoint).await, 3);

    teardown(&cp, &handle.endpoint_name, true).await.unwrap();
    assert_eq!(cp.count(Operation::DeleteModel).await, 0);
    assert!(cp.has_model("demo-model").await);
}
