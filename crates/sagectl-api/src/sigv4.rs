//! AWS Signature Version 4 for JSON POST requests to `/`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use sagectl_common::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: &str, secret_access_key: &str, session_token: Option<&str>) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.map(str::to_string),
        }
    }

    /// Read the standard `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| Error::Configuration("AWS_ACCESS_KEY_ID is not set".to_string()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| Error::Configuration("AWS_SECRET_ACCESS_KEY is not set".to_string()))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// What gets signed for one request.
pub struct SigningInput<'a> {
    pub host: &'a str,
    /// Request path, already percent-encoded; empty means `/`.
    pub path: &'a str,
    pub region: &'a str,
    pub service: &'a str,
    pub content_type: &'a str,
    pub target: &'a str,
    pub body: &'a [u8],
    pub now: DateTime<Utc>,
}

/// Headers to attach to the request, `Authorization` included.
pub fn sign(creds: &Credentials, input: &SigningInput<'_>) -> Vec<(String, String)> {
    let amz_date = input.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = input.now.format("%Y%m%d").to_string();

    let mut headers: Vec<(String, String)> = vec![
        ("content-type".to_string(), input.content_type.to_string()),
        ("host".to_string(), input.host.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(token) = &creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.push(("x-amz-target".to_string(), input.target.to_string()));

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let path = if input.path.is_empty() { "/" } else { input.path };
    let canonical_request = format!(
        "POST\n{}\n\n{}\n{}\n{}",
        path,
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(input.body))
    );

    let scope = format!("{}/{}/{}/aws4_request", date, input.region, input.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&creds.secret_access_key, &date, input.region, input.service);
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, creds.access_key_id, scope, signed_headers, signature
    );

    // host is set by the HTTP client from the URL
    headers.retain(|(k, _)| k != "host");
    headers.push(("authorization".to_string(), authorization));
    headers
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(body: &[u8]) -> SigningInput<'_> {
        SigningInput {
            host: "api.sagemaker.us-east-1.amazonaws.com",
            path: "/",
            region: "us-east-1",
            service: "sagemaker",
            content_type: "application/x-amz-json-1.1",
            target: "SageMaker.ListModels",
            body,
            now: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_authorization_layout() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret", None);
        let headers = sign(&creds, &input(b"{}"));

        assert_eq!(header(&headers, "x-amz-date"), Some("20240301T123000Z"));
        assert!(header(&headers, "host").is_none());
        let auth = header(&headers, "authorization").unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/us-east-1/sagemaker/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature="
        ));
        let sig = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_token_is_signed() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret", Some("tok"));
        let headers = sign(&creds, &input(b"{}"));
        assert_eq!(header(&headers, "x-amz-security-token"), Some("tok"));
        assert!(header(&headers, "authorization")
            .unwrap()
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
    }

    #[test]
    fn test_signature_depends_on_body() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret", None);
        let a = sign(&creds, &input(b"{}"));
        let b = sign(&creds, &input(b"{\"NextToken\":\"x\"}"));
        let again = sign(&creds, &input(b"{}"));
        assert_ne!(header(&a, "authorization"), header(&b, "authorization"));
        assert_eq!(header(&a, "authorization"), header(&again, "authorization"));
    }

    #[test]
    fn test_path_prefix_is_signed() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret", None);
        let root = sign(&creds, &input(b"{}"));
        let prefixed = sign(
            &creds,
            &SigningInput {
                path: "/sagemaker/",
                ..input(b"{}")
            },
        );
        let empty = sign(
            &creds,
            &SigningInput {
                path: "",
                ..input(b"{}")
            },
        );
        assert_ne!(header(&root, "authorization"), header(&prefixed, "authorization"));
        assert_eq!(header(&root, "authorization"), header(&empty, "authorization"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("AKIDEXAMPLE", "very-secret", Some("tok"));
        let out = format!("{:?}", creds);
        assert!(!out.contains("very-secret"));
        assert!(!out.contains("tok\""));
    }
}
