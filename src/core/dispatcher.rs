//! 傳輸調度：依目標要求的編碼建立請求並執行。
//!
//! 支援四種方式：單次 JSON POST、單次表單 POST（含把整筆記錄塞進查詢參數的舊式 GET）、
//! 多步驟會話 RPC、以及具型別參數的預存程序呼叫。
//! 連線失敗與逾時一律以 `DispatchResult.error` 回報，不會往外拋出。

use serde_json::Value;
use std::time::Duration;
use url::{form_urlencoded, Url};

use crate::core::classifier::{evaluate, ClassifyRule};
use crate::core::procedure::{execute_call, ProcedureCall};
use crate::core::session::{run_session, SessionProtocol};
use crate::domain::model::{is_blank, scalar_text, DispatchResult, LeadRecord};
use crate::domain::ports::{HttpRequest, HttpTransport, ProcedureExecutor};
use crate::utils::error::{RelayError, Result};

/// 單一目標的調度計畫
pub enum DispatchPlan {
    Single {
        request: HttpRequest,
        rule: ClassifyRule,
    },
    Session(Box<dyn SessionProtocol>),
    Procedure(ProcedureCall),
}

impl std::fmt::Debug for DispatchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchPlan::Single { request, rule } => f
                .debug_struct("Single")
                .field("request", request)
                .field("rule", rule)
                .finish(),
            DispatchPlan::Session(_) => f.write_str("Session"),
            DispatchPlan::Procedure(call) => f.debug_tuple("Procedure").field(call).finish(),
        }
    }
}

impl DispatchPlan {
    pub fn single(request: HttpRequest, rule: ClassifyRule) -> Self {
        DispatchPlan::Single { request, rule }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            DispatchPlan::Single { .. } => "single",
            DispatchPlan::Session(_) => "session",
            DispatchPlan::Procedure(_) => "procedure",
        }
    }
}

/// 認證方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: <key>`，不加前綴
    Raw(String),
    /// 自訂標頭，例如 `X-API-KEY`
    Header(&'static str, String),
}

impl Auth {
    pub fn apply(&self, request: HttpRequest) -> HttpRequest {
        match self {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Raw(key) => request.header("Authorization", key.clone()),
            Auth::Header(name, key) => request.header(*name, key.clone()),
        }
    }
}

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// 把記錄包進外層物件，例如 `{"Lead": {...}}`
pub fn envelope(key: &str, body: Value) -> Value {
    let mut wrapper = serde_json::Map::new();
    wrapper.insert(key.to_string(), body);
    Value::Object(wrapper)
}

/// 攤平的表單編碼；`skip_empty` 時不送出空值欄位
pub fn form_encode(record: &LeadRecord, skip_empty: bool) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in record.iter() {
        if skip_empty && is_blank(value) {
            continue;
        }
        serializer.append_pair(key, &scalar_text(value));
    }
    serializer.finish()
}

/// 組合帶查詢參數的網址
pub fn query_url(base: &str, params: &[(&str, String)]) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| RelayError::InvalidConfigValueError {
        field: "endpoint".to_string(),
        value: base.to_string(),
        reason: e.to_string(),
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

/// 單次 JSON POST
pub fn json_post(url: &str, body: &Value, auth: &Auth, timeout: Duration) -> Result<HttpRequest> {
    json_post_as(url, body, auth, CONTENT_TYPE_JSON, timeout)
}

/// 指定 Content-Type 的 JSON POST（部分端點只接受 text/plain）
pub fn json_post_as(
    url: &str,
    body: &Value,
    auth: &Auth,
    content_type: &str,
    timeout: Duration,
) -> Result<HttpRequest> {
    let encoded = serde_json::to_string(body)?;
    let request = HttpRequest::post(url, encoded)
        .header("Accept", "*/*")
        .header("Content-Type", content_type)
        .timeout(timeout);
    Ok(auth.apply(request))
}

/// 單次表單 POST
pub fn form_post(
    url: &str,
    record: &LeadRecord,
    skip_empty: bool,
    auth: &Auth,
    timeout: Duration,
) -> HttpRequest {
    let request = HttpRequest::post(url, form_encode(record, skip_empty))
        .header("Accept", "*/*")
        .header("Content-Type", CONTENT_TYPE_FORM)
        .timeout(timeout);
    auth.apply(request)
}

/// 以查詢參數傳送的 GET
pub fn query_get(
    base: &str,
    params: &[(&str, String)],
    auth: &Auth,
    timeout: Duration,
) -> Result<HttpRequest> {
    let request = HttpRequest::get(query_url(base, params)?)
        .header("Accept", "*/*")
        .timeout(timeout);
    Ok(auth.apply(request))
}

/// 調度完成後的結果；`last` 為最後一次實際執行的傳輸
#[derive(Debug)]
pub struct DispatchOutcome {
    pub last: Option<DispatchResult>,
    pub result: Result<Option<String>>,
}

/// 執行計畫。呼叫端在此之前已完成設定檢查與驗證
pub async fn dispatch(
    plan: DispatchPlan,
    transport: &dyn HttpTransport,
    executor: Option<&dyn ProcedureExecutor>,
) -> DispatchOutcome {
    match plan {
        DispatchPlan::Single { request, rule } => {
            tracing::debug!("📡 {:?} {}", request.method, request.url);
            let response = transport.send(request).await;
            let (result, verdict) = evaluate(response, &rule);
            tracing::debug!("📥 Response status: {:?}", result.status);
            let outcome = match verdict.error {
                None if verdict.success => Ok(verdict.reference),
                Some(error) => Err(error),
                None => Err(RelayError::rejected("response did not satisfy the success rule")),
            };
            DispatchOutcome {
                last: Some(result),
                result: outcome,
            }
        }
        DispatchPlan::Session(protocol) => {
            let report = run_session(protocol.as_ref(), transport).await;
            DispatchOutcome {
                last: report.last,
                result: report.result,
            }
        }
        DispatchPlan::Procedure(call) => match executor {
            Some(executor) => {
                let (result, outcome) = execute_call(executor, &call).await;
                DispatchOutcome {
                    last: Some(result),
                    result: outcome.map(|_| None),
                }
            }
            None => DispatchOutcome {
                last: None,
                result: Err(RelayError::transport(
                    "no procedure executor is configured",
                    None,
                )),
            },
        },
    }
}
