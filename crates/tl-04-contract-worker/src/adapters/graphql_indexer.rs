//! GraphQL indexer client for fee-payer nonces.

use async_trait::async_trait;
use launcher_telemetry::INDEXER_REQUESTS;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use shared_types::{Network, PublicKey};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::IndexerError;
use crate::ports::NonceSource;

/// Default request timeout for indexer queries.
pub const DEFAULT_INDEXER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest {
    operation_name: Option<String>,
    query: String,
    variables: serde_json::Map<String, Value>,
}

impl GraphqlRequest {
    fn inferred_nonce(address: &PublicKey) -> Self {
        Self {
            operation_name: None,
            query: format!(
                "query {{ account(publicKey: \"{}\") {{ inferredNonce }} }}",
                address
            ),
            variables: serde_json::Map::new(),
        }
    }
}

/// Reads `inferredNonce` from each network's GraphQL endpoint.
pub struct GraphqlIndexer {
    client: Client,
    /// Replaces the per-network endpoint when set.
    endpoint: Option<String>,
}

impl GraphqlIndexer {
    pub fn new(timeout: Duration) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| IndexerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: None,
        })
    }

    /// Send every query to `endpoint` instead of the network default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn url(&self, network: Network) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| network.graphql_url())
    }

    async fn query(&self, url: &str, request: &GraphqlRequest) -> Result<Value, IndexerError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IndexerError::Http(format!("request to {} timed out", url))
                } else if e.is_connect() {
                    IndexerError::Http(format!("cannot connect to {}", url))
                } else {
                    IndexerError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexerError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| IndexerError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl NonceSource for GraphqlIndexer {
    async fn inferred_nonce(
        &self,
        address: &PublicKey,
        network: Network,
    ) -> Result<u64, IndexerError> {
        let url = self.url(network);
        debug!(address = %address, url, "Querying inferred nonce");

        let result = self
            .query(url, &GraphqlRequest::inferred_nonce(address))
            .await
            .and_then(|body| parse_inferred_nonce(address, &body));

        let outcome = if result.is_ok() { "ok" } else { "error" };
        INDEXER_REQUESTS
            .with_label_values(&[network.as_str(), outcome])
            .inc();
        if let Err(e) = &result {
            warn!(address = %address, error = %e, "Nonce lookup failed");
        }
        result
    }
}

/// Extract `data.account.inferredNonce`, given as a number or a numeric string.
fn parse_inferred_nonce(address: &PublicKey, body: &Value) -> Result<u64, IndexerError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();
        if !messages.is_empty() {
            return Err(IndexerError::Query(messages.join("; ")));
        }
    }

    let account = body
        .get("data")
        .ok_or_else(|| IndexerError::Malformed("missing data".into()))?
        .get("account");
    let account = match account {
        Some(Value::Null) | None => return Err(IndexerError::AccountNotFound(address.to_string())),
        Some(account) => account,
    };

    match account.get("inferredNonce") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| IndexerError::Malformed(format!("inferredNonce {} is not a nonce", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| IndexerError::Malformed(format!("inferredNonce '{}' is not a nonce", s))),
        _ => Err(IndexerError::Malformed("missing inferredNonce".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> PublicKey {
        PublicKey::from_digest(&[4, 8, 15, 16, 23, 42])
    }

    #[test]
    fn test_request_body_shape() {
        let request = GraphqlRequest::inferred_nonce(&address());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["operationName"], Value::Null);
        assert_eq!(body["variables"], json!({}));
        let query = body["query"].as_str().unwrap();
        assert!(query.contains(&format!("account(publicKey: \"{}\")", address())));
        assert!(query.contains("inferredNonce"));
    }

    #[test]
    fn test_parse_numeric_string_nonce() {
        let body = json!({"data": {"account": {"inferredNonce": "12"}}});
        assert_eq!(parse_inferred_nonce(&address(), &body).unwrap(), 12);
    }

    #[test]
    fn test_parse_number_nonce() {
        let body = json!({"data": {"account": {"inferredNonce": 3}}});
        assert_eq!(parse_inferred_nonce(&address(), &body).unwrap(), 3);
    }

    #[test]
    fn test_parse_missing_account() {
        let body = json!({"data": {"account": null}});
        assert!(matches!(
            parse_inferred_nonce(&address(), &body),
            Err(IndexerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_parse_graphql_errors() {
        let body = json!({"errors": [{"message": "Invalid public key"}], "data": null});
        assert_eq!(
            parse_inferred_nonce(&address(), &body).unwrap_err(),
            IndexerError::Query("Invalid public key".into())
        );
    }

    #[test]
    fn test_parse_garbage_nonce() {
        let body = json!({"data": {"account": {"inferredNonce": "soon"}}});
        assert!(matches!(
            parse_inferred_nonce(&address(), &body),
            Err(IndexerError::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint_override() {
        let indexer = GraphqlIndexer::new(DEFAULT_INDEXER_TIMEOUT)
            .unwrap()
            .with_endpoint("http://127.0.0.1:8080/graphql");
        assert_eq!(indexer.url(Network::Mainnet), "http://127.0.0.1:8080/graphql");

        let indexer = GraphqlIndexer::new(DEFAULT_INDEXER_TIMEOUT).unwrap();
        assert_eq!(indexer.url(Network::Devnet), Network::Devnet.graphql_url());
    }

    #[tokio::test]
    async fn test_unreachable_indexer_is_http_error() {
        let indexer = GraphqlIndexer::new(Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/graphql");
        let err = indexer
            .inferred_nonce(&address(), Network::Devnet)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::Http(_)));
    }
}
