//! 回應判定：把傳輸結果轉成成功/失敗，規則由各目標明確設定。

use regex::Regex;
use serde_json::Value;

use crate::domain::model::{is_blank, scalar_text, DispatchResult};
use crate::domain::ports::TransportResponse;
use crate::utils::error::RelayError;

pub const STATUS_OK: &[u16] = &[200];
pub const STATUS_OK_NO_CONTENT: &[u16] = &[200, 204];
pub const STATUS_OK_ACCEPTED: &[u16] = &[200, 202, 204];

/// 狀態碼通過後，對內容的額外檢查
#[derive(Debug, Clone)]
pub enum PayloadCheck {
    None,
    /// 內容必須是 JSON 物件
    JsonObject,
    /// JSON 物件且 `errors` 欄位不為真
    ErrorsFalsy,
    /// JSON 物件且欄位值不符合樣式（例如 `data` 不含 error）
    FieldNotMatching { field: String, pattern: Regex },
    /// JSON 物件且欄位值符合樣式（例如 `message` 含 success）
    FieldMatching { field: String, pattern: Regex },
    /// JSON 物件且路徑上的值非空（例如 `contact.id`）
    PathPresent(Vec<String>),
    /// 指定的回應標頭必須存在，其值作為結果編號
    Header(String),
}

#[derive(Debug, Clone)]
pub struct ClassifyRule {
    pub accepted: Vec<u16>,
    pub check: PayloadCheck,
}

impl ClassifyRule {
    pub fn status(accepted: &[u16]) -> Self {
        Self {
            accepted: accepted.to_vec(),
            check: PayloadCheck::None,
        }
    }

    pub fn with(mut self, check: PayloadCheck) -> Self {
        self.check = check;
        self
    }

    pub fn errors_falsy(accepted: &[u16]) -> Self {
        Self::status(accepted).with(PayloadCheck::ErrorsFalsy)
    }

    pub fn header(status: u16, name: &str) -> Self {
        Self::status(&[status]).with(PayloadCheck::Header(name.to_string()))
    }

    pub fn path(accepted: &[u16], path: &[&str]) -> Self {
        Self::status(accepted).with(PayloadCheck::PathPresent(
            path.iter().map(|segment| segment.to_string()).collect(),
        ))
    }
}

/// 判定結果；`reference` 為回應中擷取到的結果編號
#[derive(Debug)]
pub struct Verdict {
    pub success: bool,
    pub reference: Option<String>,
    pub error: Option<RelayError>,
}

impl Verdict {
    fn accepted(reference: Option<String>) -> Self {
        Self {
            success: true,
            reference,
            error: None,
        }
    }

    fn rejected(error: RelayError) -> Self {
        Self {
            success: false,
            reference: None,
            error: Some(error),
        }
    }
}

/// 解析 JSON 內容；若內容是包著 JSON 的字串則再解一次，
/// 未跳脫的外層引號（`"{...}"`）也會先去掉
pub fn decode_payload(body: &str) -> Option<Value> {
    let body = body.trim();
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            let inner = body.strip_prefix('"')?.strip_suffix('"')?;
            serde_json::from_str(inner.trim()).ok()?
        }
    };
    match value {
        Value::String(inner) => serde_json::from_str(inner.trim()).ok().or(Some(Value::String(inner))),
        other => Some(other),
    }
}

/// 逐行解析原始標頭區塊，每行以第一個 `": "` 分割
pub fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            line.split_once(": ")
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// 不分大小寫取得標頭值
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// 讓原始內容可以安全地放進診斷訊息
pub fn sanitize_body(body: &str) -> String {
    let neutralized = body.replace("<?", "<").replace("?>", ">");
    format!("<xmp>{}</xmp>", neutralized)
}

fn lookup_path<'a>(payload: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(payload, |current, segment| current.get(segment.as_str()))
}

/// 從錯誤內容取出可讀訊息（`error.message` 或 `message`）
pub fn payload_message(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(|error| error.get("message"))
        .or_else(|| payload.get("message"))
        .filter(|value| !is_blank(value))
        .map(scalar_text)
}

/// 依規則判定，同樣的輸入一定得到同樣的結果
pub fn classify(result: &DispatchResult, rule: &ClassifyRule) -> Verdict {
    if result.transport_failed() {
        return Verdict::rejected(RelayError::transport(
            result.error.clone().unwrap_or_default(),
            result.status,
        ));
    }

    let Some(status) = result.status.filter(|status| rule.accepted.contains(status)) else {
        return Verdict::rejected(RelayError::transport(
            format!("unexpected status {}", result.status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string())),
            result.status,
        ));
    };

    let object = || {
        result
            .payload
            .as_ref()
            .filter(|payload| payload.is_object())
            .ok_or_else(|| RelayError::rejected(format!("status {} without a JSON object body", status)))
    };

    match &rule.check {
        PayloadCheck::None => Verdict::accepted(None),
        PayloadCheck::JsonObject => match object() {
            Ok(_) => Verdict::accepted(None),
            Err(error) => Verdict::rejected(error),
        },
        PayloadCheck::ErrorsFalsy => match object() {
            Ok(payload) => match payload.get("errors").filter(|errors| !is_blank(errors)) {
                Some(errors) => Verdict::rejected(RelayError::rejected(format!("errors: {}", errors))),
                None => Verdict::accepted(None),
            },
            Err(error) => Verdict::rejected(error),
        },
        PayloadCheck::FieldNotMatching { field, pattern } => match object() {
            Ok(payload) => {
                let value = payload.get(field).map(scalar_text).unwrap_or_default();
                if pattern.is_match(&value) {
                    let detail = payload_message(payload).unwrap_or(value);
                    Verdict::rejected(RelayError::rejected(detail))
                } else {
                    Verdict::accepted(None)
                }
            }
            Err(error) => Verdict::rejected(error),
        },
        PayloadCheck::FieldMatching { field, pattern } => match object() {
            Ok(payload) => {
                let value = payload.get(field).map(scalar_text).unwrap_or_default();
                if pattern.is_match(&value) {
                    Verdict::accepted(None)
                } else {
                    Verdict::rejected(RelayError::rejected(format!("{}: {:?}", field, value)))
                }
            }
            Err(error) => Verdict::rejected(error),
        },
        PayloadCheck::PathPresent(path) => match object() {
            Ok(payload) => match lookup_path(payload, path).filter(|value| !is_blank(value)) {
                Some(value) => Verdict::accepted(Some(scalar_text(value))),
                None => Verdict::rejected(RelayError::rejected(format!(
                    "missing confirmation '{}'",
                    path.join(".")
                ))),
            },
            Err(error) => Verdict::rejected(error),
        },
        PayloadCheck::Header(name) => {
            let headers = parse_headers(&result.raw_headers);
            match find_header(&headers, name) {
                Some(value) => Verdict::accepted(Some(value.to_string())),
                None => Verdict::rejected(RelayError::rejected(format!("missing '{}' header", name))),
            }
        }
    }
}

/// 由傳輸回應建立結果並套用判定
pub fn evaluate(response: TransportResponse, rule: &ClassifyRule) -> (DispatchResult, Verdict) {
    let mut result = DispatchResult {
        payload: decode_payload(&response.body),
        status: response.status,
        body: response.body,
        raw_headers: response.raw_headers,
        error: response.error.filter(|error| !error.is_empty()),
        success: false,
    };
    let verdict = classify(&result, rule);
    result.success = verdict.success;
    (result, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(status: u16, body: &str) -> DispatchResult {
        DispatchResult {
            status: Some(status),
            body: body.to_string(),
            payload: decode_payload(body),
            ..DispatchResult::default()
        }
    }

    #[test]
    fn test_status_only() {
        let rule = ClassifyRule::status(STATUS_OK_NO_CONTENT);
        assert!(classify(&result(204, ""), &rule).success);
        assert!(!classify(&result(201, ""), &rule).success);
    }

    #[test]
    fn test_errors_true_is_rejected_despite_200() {
        let rule = ClassifyRule::errors_falsy(STATUS_OK_ACCEPTED);
        let verdict = classify(&result(200, r#"{"errors": true}"#), &rule);
        assert!(!verdict.success);
        assert!(matches!(verdict.error, Some(RelayError::ResponseError { .. })));

        assert!(classify(&result(200, r#"{"errors": false, "id": 3}"#), &rule).success);
        assert!(classify(&result(200, r#"{"errors": []}"#), &rule).success);
        assert!(!classify(&result(200, "<html>ok</html>"), &rule).success);
    }

    #[test]
    fn test_header_lookup() {
        let rule = ClassifyRule::header(201, "ResultID");
        let mut ok = result(201, "");
        ok.raw_headers = "HTTP/1.1 201 Created\r\nresultid: 98765\r\ncontent-length: 0".to_string();
        let verdict = classify(&ok, &rule);
        assert!(verdict.success);
        assert_eq!(verdict.reference.as_deref(), Some("98765"));

        let mut missing = result(201, "");
        missing.raw_headers = "content-length: 0".to_string();
        assert!(!classify(&missing, &rule).success);

        let mut wrong_status = result(200, "");
        wrong_status.raw_headers = "ResultID: 1".to_string();
        assert!(!classify(&wrong_status, &rule).success);
    }

    #[test]
    fn test_header_value_keeps_later_separators() {
        let headers = parse_headers("Location: http://x: y\nBad line\nX-Id:  42 ");
        assert_eq!(find_header(&headers, "location"), Some("http://x: y"));
        assert_eq!(find_header(&headers, "X-Id"), Some("42"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_field_not_matching() {
        let rule = ClassifyRule::status(STATUS_OK_NO_CONTENT).with(PayloadCheck::FieldNotMatching {
            field: "data".to_string(),
            pattern: Regex::new("(?i)error").unwrap(),
        });
        let verdict = classify(
            &result(200, r#"{"status":"500","data":"Error","message":"E+ response returned null"}"#),
            &rule,
        );
        assert!(!verdict.success);
        assert!(verdict.error.unwrap().to_string().contains("E+ response returned null"));
        assert!(classify(&result(200, r#"{"data":"Saved"}"#), &rule).success);
    }

    #[test]
    fn test_quoted_json_body_is_decoded() {
        let body = serde_json::to_string(&json!("{\"message\":\"Success\"}")).unwrap();
        let rule = ClassifyRule::status(STATUS_OK).with(PayloadCheck::FieldMatching {
            field: "message".to_string(),
            pattern: Regex::new("(?i)success").unwrap(),
        });
        assert!(classify(&result(200, &body), &rule).success);
    }

    #[test]
    fn test_path_present_captures_reference() {
        let rule = ClassifyRule::path(STATUS_OK_ACCEPTED, &["contact", "id"]);
        let verdict = classify(&result(200, r#"{"contact":{"id":"abc"}}"#), &rule);
        assert_eq!(verdict.reference.as_deref(), Some("abc"));
        assert!(!classify(&result(200, r#"{"contact":{}}"#), &rule).success);
    }

    #[test]
    fn test_transport_error_is_failure() {
        let mut failed = DispatchResult::default();
        failed.error = Some("operation timed out".to_string());
        let verdict = classify(&failed, &ClassifyRule::status(STATUS_OK));
        assert!(!verdict.success);
        assert!(matches!(verdict.error, Some(RelayError::TransportError { .. })));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let rule = ClassifyRule::errors_falsy(STATUS_OK_ACCEPTED);
        let sample = result(202, r#"{"errors": null}"#);
        let summary = |verdict: Verdict| (verdict.success, verdict.reference, verdict.error.map(|e| e.to_string()));
        let first = summary(classify(&sample, &rule));
        for _ in 0..5 {
            assert_eq!(summary(classify(&sample, &rule)), first);
        }
    }

    #[test]
    fn test_sanitize_body() {
        assert_eq!(sanitize_body("<?xml?><a/>"), "<xmp><xml><a/></xmp>");
    }
}
