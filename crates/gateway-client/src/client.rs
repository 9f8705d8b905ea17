//! JSON-RPC client for the SMS gateway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{HistoryMessage, SmsGateway};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsParams<'a> {
    gateway_phone_number: &'a str,
    recipient_phone_number: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams<'a> {
    gateway_phone_number: &'a str,
    recipient_phone_number: &'a str,
    num_messages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactListParams<'a> {
    gateway_phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendSmsResponse {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    success: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct NumberListResponse {
    success: bool,
    error: Option<String>,
    #[serde(default)]
    numbers: Vec<String>,
}

/// Client for the SMS gateway's JSON-RPC interface.
///
/// One logical connection per process; the underlying HTTP client pools
/// transport connections internally.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
    request_id: Arc<AtomicU64>,
}

impl GatewayClient {
    /// Build a client without probing the gateway.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Build a client and verify the gateway answers before returning.
    pub async fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Self::new(config)?;

        client.gateway_numbers().await.map_err(|e| {
            GatewayError::Connection(format!(
                "gateway at {} is unreachable: {e}",
                client.config.base_url()
            ))
        })?;
        info!("connected to SMS gateway at {}", client.config.base_url());

        Ok(client)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Make a JSON-RPC call to the gateway.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, GatewayError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Connection(format!("HTTP {}: {}", status, body)));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(GatewayError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or_else(|| GatewayError::Rpc {
            code: -1,
            message: "no result in response".to_string(),
        })
    }
}

#[async_trait]
impl SmsGateway for GatewayClient {
    async fn send_sms(
        &self,
        gateway_number: &str,
        contact_number: &str,
        message: &str,
    ) -> Result<(), GatewayError> {
        let params = SendSmsParams {
            gateway_phone_number: gateway_number,
            recipient_phone_number: contact_number,
            message,
        };
        let resp: SendSmsResponse = self.rpc_call("sendSms", Some(params)).await?;

        match resp.error {
            Some(error) => Err(GatewayError::Gateway(error)),
            None => Ok(()),
        }
    }

    async fn contact_history(
        &self,
        gateway_number: &str,
        contact_number: &str,
        num_messages: u64,
    ) -> Result<Vec<HistoryMessage>, GatewayError> {
        let params = HistoryParams {
            gateway_phone_number: gateway_number,
            recipient_phone_number: contact_number,
            num_messages,
        };
        let resp: HistoryResponse = self.rpc_call("getContactHistory", Some(params)).await?;

        if !resp.success {
            return Err(GatewayError::Gateway(
                resp.error.unwrap_or_else(|| "unspecified failure".to_string()),
            ));
        }

        Ok(resp.messages)
    }

    async fn contact_list(&self, gateway_number: &str) -> Result<Vec<String>, GatewayError> {
        let params = ContactListParams {
            gateway_phone_number: gateway_number,
        };
        let resp: NumberListResponse = self.rpc_call("getContactList", Some(params)).await?;

        if !resp.success {
            return Err(GatewayError::Gateway(
                resp.error.unwrap_or_else(|| "unspecified failure".to_string()),
            ));
        }

        Ok(resp.numbers)
    }

    async fn gateway_numbers(&self) -> Result<Vec<String>, GatewayError> {
        let resp: NumberListResponse = self
            .rpc_call::<(), _>("getGatewayNumbers", None)
            .await?;

        if !resp.success {
            return Err(GatewayError::Gateway(
                resp.error.unwrap_or_else(|| "unspecified failure".to_string()),
            ));
        }

        Ok(resp.numbers)
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GatewayClient {
        let url = server.uri();
        let url = url.trim_start_matches("http://");
        let (host, port) = url.split_once(':').unwrap();
        GatewayClient::new(GatewayConfig::new(host, port.parse().unwrap())).unwrap()
    }

    #[tokio::test]
    async fn send_sms_posts_rpc_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "sendSms",
                "params": {
                    "gatewayPhoneNumber": "15550000000",
                    "recipientPhoneNumber": "15551111111",
                    "message": "pong"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {},
                "id": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .send_sms("15550000000", "15551111111", "pong")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_sms_surfaces_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {"error": "number not registered"},
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .send_sms("15550000000", "15551111111", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Gateway(msg) if msg == "number not registered"));
    }

    #[tokio::test]
    async fn history_decodes_messages_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {
                    "success": true,
                    "error": null,
                    "messages": [
                        {"source": true, "messageContents": "newer", "timestamp": 2000},
                        {"source": false, "messageContents": "older", "timestamp": 1000}
                    ]
                },
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let messages = client
            .contact_history("15550000000", "15551111111", 5)
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].inbound);
        assert_eq!(messages[0].contents, "newer");
        assert_eq!(messages[0].timestamp, 2000);
        assert!(!messages[1].inbound);
    }

    #[tokio::test]
    async fn history_failure_flag_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {"success": false, "error": "conversation not found", "messages": []},
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .contact_history("15550000000", "15551111111", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Gateway(msg) if msg == "conversation not found"));
    }

    #[tokio::test]
    async fn rpc_error_is_reported_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "method not found"},
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.gateway_numbers().await.unwrap_err();
        assert!(matches!(err, GatewayError::Rpc { code: -32601, .. }));
    }
}
