use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::debug;

use sagectl_common::{
    CreateEndpointConfigInput, CreateEndpointInput, CreateModelInput, EndpointConfigDescription,
    EndpointDescription, EndpointSummary, Error, ListQuery, ModelSummary, Page, Result,
};

use crate::sigv4::{self, Credentials, SigningInput};
use crate::types::{ControlPlane, Operation};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "SageMaker";
const SIGNING_SERVICE: &str = "sagemaker";

/// Control plane reached over the service's JSON 1.1 protocol.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    endpoint: Url,
    host: String,
    region: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListModelsOutput {
    #[serde(default)]
    models: Vec<ModelSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEndpointsOutput {
    #[serde(default)]
    endpoints: Vec<EndpointSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelArn {
    model_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointConfigArn {
    endpoint_config_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointArn {
    endpoint_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointName<'a> {
    endpoint_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointConfigName<'a> {
    endpoint_config_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModelName<'a> {
    model_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Resource a call is about, used to turn "could not find" errors into `NotFound`.
type Subject<'a> = Option<(&'static str, &'a str)>;

impl HttpControlPlane {
    /// `endpoint_url` overrides the regional default (VPC endpoints, local mocks).
    pub fn new(region: &str, endpoint_url: Option<&str>, credentials: Credentials) -> Result<Self> {
        let raw = match endpoint_url {
            Some(u) => u.to_string(),
            None => format!("https://api.sagemaker.{region}.amazonaws.com"),
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| Error::Configuration(format!("invalid endpoint url '{raw}': {e}")))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(Error::Configuration(format!("endpoint url '{raw}' has no host")))
            }
        };

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            host,
            region: region.to_string(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<I, O>(&self, op: Operation, input: &I, subject: Subject<'_>) -> Result<(O, Option<String>)>
    where
        I: Serialize + ?Sized + Sync,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| Error::Configuration(format!("encode {op} request: {e}")))?;
        let target = format!("{TARGET_PREFIX}.{op}");

        let headers = sigv4::sign(
            &self.credentials,
            &SigningInput {
                host: &self.host,
                path: self.endpoint.path(),
                region: &self.region,
                service: SIGNING_SERVICE,
                content_type: CONTENT_TYPE,
                target: &target,
                body: &body,
                now: chrono::Utc::now(),
            },
        );

        let mut req = self.http.post(self.endpoint.clone());
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| Error::remote(op.as_str(), "TransportError", e.to_string()))?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-amzn-RequestId")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let error_type = resp
            .headers()
            .get("x-amzn-ErrorType")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::remote(op.as_str(), "TransportError", e.to_string()))?;

        debug!(operation = %op, status = status.as_u16(), request_id = ?request_id, "control plane response");

        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let code = parsed
                .kind
                .or(error_type)
                .map(|c| error_code(&c).to_string())
                .unwrap_or_else(|| format!("Http{}", status.as_u16()));
            let message = parsed
                .message
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(classify(op, &code, &message, subject));
        }

        let payload: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        let out = serde_json::from_slice(payload)
            .map_err(|e| Error::remote(op.as_str(), "DeserializationError", e.to_string()))?;
        Ok((out, request_id))
    }
}

/// `com.amazonaws.sagemaker#ValidationException` or `ValidationException:http://...` → `ValidationException`.
fn error_code(raw: &str) -> &str {
    let tail = raw.rsplit('#').next().unwrap_or(raw);
    tail.split(':').next().unwrap_or(tail)
}

fn classify(op: Operation, code: &str, message: &str, subject: Subject<'_>) -> Error {
    let missing = code == "ResourceNotFound"
        || (code == "ValidationException" && message.starts_with("Could not find"));
    match subject {
        Some((kind, name)) if missing => Error::not_found(kind, name),
        _ => Error::remote(op.as_str(), code, message),
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_model(&self, input: &CreateModelInput) -> Result<String> {
        let (out, _): (ModelArn, _) = self.call(Operation::CreateModel, input, None).await?;
        Ok(out.model_arn)
    }

    async fn create_endpoint_config(&self, input: &CreateEndpointConfigInput) -> Result<String> {
        let (out, _): (EndpointConfigArn, _) =
            self.call(Operation::CreateEndpointConfig, input, None).await?;
        Ok(out.endpoint_config_arn)
    }

    async fn create_endpoint(&self, input: &CreateEndpointInput) -> Result<String> {
        let subject = Some(("endpoint config", input.endpoint_config_name.as_str()));
        let (out, _): (EndpointArn, _) = self.call(Operation::CreateEndpoint, input, subject).await?;
        Ok(out.endpoint_arn)
    }

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        let input = EndpointName { endpoint_name: name };
        let (out, _) = self
            .call(Operation::DescribeEndpoint, &input, Some(("endpoint", name)))
            .await?;
        Ok(out)
    }

    async fn describe_endpoint_config(&self, name: &str) -> Result<EndpointConfigDescription> {
        let input = EndpointConfigName {
            endpoint_config_name: name,
        };
        let (out, _) = self
            .call(Operation::DescribeEndpointConfig, &input, Some(("endpoint config", name)))
            .await?;
        Ok(out)
    }

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        let input = EndpointName { endpoint_name: name };
        let _: (IgnoredAny, _) = self
            .call(Operation::DeleteEndpoint, &input, Some(("endpoint", name)))
            .await?;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        let input = EndpointConfigName {
            endpoint_config_name: name,
        };
        let _: (IgnoredAny, _) = self
            .call(Operation::DeleteEndpointConfig, &input, Some(("endpoint config", name)))
            .await?;
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let input = ModelName { model_name: name };
        let _: (IgnoredAny, _) = self
            .call(Operation::DeleteModel, &input, Some(("model", name)))
            .await?;
        Ok(())
    }

    async fn list_models(&self, query: &ListQuery) -> Result<Page<ModelSummary>> {
        let (out, request_id): (ListModelsOutput, _) =
            self.call(Operation::ListModels, query, None).await?;
        Ok(Page {
            items: out.models,
            next_token: non_empty(out.next_token),
            request_id,
        })
    }

    async fn list_endpoints(&self, query: &ListQuery) -> Result<Page<EndpointSummary>> {
        let (out, request_id): (ListEndpointsOutput, _) =
            self.call(Operation::ListEndpoints, query, None).await?;
        Ok(Page {
            items: out.endpoints,
            next_token: non_empty(out.next_token),
            request_id,
        })
    }
}
