use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// 傳送給外部端點的請求，內容已完成編碼
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
    /// 預設不跟隨轉址，3xx 原樣交給判定
    pub follow_redirects: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(60),
            follow_redirects: false,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
            timeout: Duration::from_secs(60),
            follow_redirects: false,
        }
    }

    /// 同名標頭（不分大小寫）會被取代
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self) -> Self {
        self.follow_redirects = true;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 傳輸層回應；連線失敗與逾時放在 `error`，不以 Err 回傳
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub status: Option<u16>,
    pub raw_headers: String,
    pub body: String,
    pub error: Option<String>,
}

impl TransportResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// HTTP 傳輸原語：送出請求並取得狀態碼、標頭與內容
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> TransportResponse;
}

/// 預存程序參數型別
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Bit(bool),
}

/// 已綁定的預存程序參數
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParam {
    pub name: String,
    pub value: ParamValue,
    pub max_length: Option<usize>,
}

/// 關聯式資料庫連線資訊
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSpec {
    pub server: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// 對遠端資料庫執行預存程序；錯誤字串來自驅動程式
#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    async fn execute(
        &self,
        connection: &ConnectionSpec,
        procedure: &str,
        params: &[BoundParam],
    ) -> std::result::Result<(), String>;
}

/// 診斷訊息輸出端
pub trait EventSink: Send + Sync {
    fn info(&self, text: &str);
    fn success(&self, text: &str);
    fn error(&self, text: &str, context: Option<&Value>);
}
