pub mod error;
pub mod types;

pub use error::{GlifError, Result};
pub use types::RpcMethod;

use std::time::Duration;

use types::{RpcRequest, RpcResponse};

pub const DEFAULT_ENDPOINT: &str = "https://api.node.glif.io/rpc/v0";

/// JSON-RPC error codes some gateways use to signal throttling.
const RATE_LIMIT_RPC_CODES: [i64; 2] = [429, -32029];

pub struct GlifClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GlifClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve an ID address (`f0...`) to its public-key address.
    pub async fn state_account_key(&self, address_id: &str) -> Result<String> {
        self.call(RpcMethod::ResolveIdToKey, address_id).await
    }

    /// Resolve a public-key address to its ID address.
    pub async fn state_lookup_id(&self, address_key: &str) -> Result<String> {
        self.call(RpcMethod::ResolveKeyToId, address_key).await
    }

    /// Issue a single resolution call. A 429 status or a throttling RPC error
    /// comes back as `GlifError::RateLimited` so callers can back off.
    pub async fn call(&self, method: RpcMethod, address: &str) -> Result<String> {
        let request = RpcRequest::new(method, address);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            tracing::warn!(method = method.rpc_name(), address, "RPC endpoint rate limited");
            return Err(GlifError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GlifError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let rpc: RpcResponse = serde_json::from_str(&body)?;

        if let Some(err) = rpc.error {
            if RATE_LIMIT_RPC_CODES.contains(&err.code)
                || err.message.to_lowercase().contains("rate limit")
            {
                return Err(GlifError::RateLimited);
            }
            return Err(GlifError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        match rpc.result {
            Some(result) if !result.is_empty() => {
                tracing::debug!(method = method.rpc_name(), address, %result, "Resolved address");
                Ok(result)
            }
            _ => Err(GlifError::EmptyResult {
                method: method.rpc_name().to_string(),
                address: address.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn resolves_id_to_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "method": "Filecoin.StateAccountKey",
                "params": ["f01234", null],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "f1abcdefghijklmnop",
            })))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let key = client.state_account_key("f01234").await.unwrap();
        assert_eq!(key, "f1abcdefghijklmnop");
    }

    #[tokio::test]
    async fn resolves_key_to_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "method": "Filecoin.StateLookupID",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "f01234",
            })))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let id = client.state_lookup_id("f1abcdefghijklmnop").await.unwrap();
        assert_eq!(id, "f01234");
    }

    #[tokio::test]
    async fn http_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let err = client.state_lookup_id("f1abc").await.unwrap_err();
        assert!(matches!(err, GlifError::RateLimited));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn rpc_error_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 1, "message": "actor not found" },
            })))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let err = client.state_account_key("f09999").await.unwrap_err();
        assert!(matches!(err, GlifError::Rpc { code: 1, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn rpc_rate_limit_message_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "Rate limit exceeded" },
            })))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let err = client.state_account_key("f01234").await.unwrap_err();
        assert!(matches!(err, GlifError::RateLimited));
    }

    #[tokio::test]
    async fn null_result_is_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": null,
            })))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let err = client.state_account_key("f01234").await.unwrap_err();
        assert!(matches!(err, GlifError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = GlifClient::new(&server.uri()).unwrap();
        let err = client.state_account_key("f01234").await.unwrap_err();
        assert!(matches!(err, GlifError::Api { status: 502, .. }));
        assert!(err.is_retryable());
    }
}
