use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

use crate::domain::ports::{HttpMethod, HttpRequest, HttpTransport, TransportResponse};
use crate::utils::error::{RelayError, Result};

pub const MAX_REDIRECTS: usize = 10;

/// 以 reqwest 實作的 HTTP 傳輸
///
/// 不保留閒置連線，每次呼叫都建立新的連線，
/// 同時進行的多個目標不會共用連線。
/// 只有請求標記 `follow_redirects` 時才跟隨轉址。
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    redirecting: Client,
}

fn build_client(connect_timeout: Duration, policy: Policy) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(0)
        .redirect(policy)
        .build()
        .map_err(|e| RelayError::transport(format!("failed to build HTTP client: {}", e), None))
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(connect_timeout, Policy::none())?,
            redirecting: build_client(connect_timeout, Policy::limited(MAX_REDIRECTS))?,
        })
    }
}

/// 重建 `Name: value` 形式的原始標頭區塊
fn raw_header_block(response: &reqwest::Response) -> String {
    response
        .headers()
        .iter()
        .map(|(name, value)| format!("{}: {}", name.as_str(), String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> TransportResponse {
        let client = if request.follow_redirects {
            &self.redirecting
        } else {
            &self.client
        };
        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder = builder.timeout(request.timeout);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("⚠️ Request to {} failed: {}", request.url, e);
                return TransportResponse::failed(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let raw_headers = raw_header_block(&response);
        match response.text().await {
            Ok(body) => TransportResponse {
                status: Some(status),
                raw_headers,
                body,
                error: None,
            },
            Err(e) => TransportResponse {
                status: Some(status),
                raw_headers,
                body: String::new(),
                error: Some(e.to_string()),
            },
        }
    }
}
