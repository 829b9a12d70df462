//! 目標專屬的值清理：電話只留數字、郵遞區號截斷、州名轉代碼、長度上限。
//!
//! 轉換一律先於長度截斷執行。

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::mapper::Schema;
use crate::domain::model::{scalar_text, LeadRecord};

/// 數字保留方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitKeep {
    All,
    First(usize),
    Last(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Digits(DigitKeep),
    /// 只留數字並保留前 n 碼
    PostalCode(usize),
    /// `(555) 123-4567`
    FormattedPhone,
    StateCode,
}

impl Transform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Transform::Digits(keep) => keep_digits(value, *keep),
            Transform::PostalCode(length) => keep_digits(value, DigitKeep::First(*length)),
            Transform::FormattedPhone => format_phone(value),
            Transform::StateCode => state_code(value),
        }
    }
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn keep_digits(value: &str, keep: DigitKeep) -> String {
    let digits = digits_only(value);
    match keep {
        DigitKeep::All => digits,
        DigitKeep::First(n) => digits.chars().take(n).collect(),
        DigitKeep::Last(n) => {
            let skip = digits.len().saturating_sub(n);
            digits[skip..].to_string()
        }
    }
}

/// 取最後 10 碼並格式化；空值維持空值
pub fn format_phone(value: &str) -> String {
    let digits = keep_digits(value, DigitKeep::Last(10));
    if digits.is_empty() {
        return String::new();
    }
    if digits.len() < 10 {
        return digits;
    }
    format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}

/// 以字元數截斷（不是位元組）
pub fn truncate_chars(value: &str, max_length: usize) -> String {
    value.chars().take(max_length).collect()
}

pub fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

pub fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

static STATE_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("alabama", "AL"),
        ("alaska", "AK"),
        ("arizona", "AZ"),
        ("arkansas", "AR"),
        ("california", "CA"),
        ("colorado", "CO"),
        ("connecticut", "CT"),
        ("delaware", "DE"),
        ("district of columbia", "DC"),
        ("washington dc", "DC"),
        ("florida", "FL"),
        ("georgia", "GA"),
        ("hawaii", "HI"),
        ("idaho", "ID"),
        ("illinois", "IL"),
        ("indiana", "IN"),
        ("iowa", "IA"),
        ("kansas", "KS"),
        ("kentucky", "KY"),
        ("louisiana", "LA"),
        ("maine", "ME"),
        ("maryland", "MD"),
        ("massachusetts", "MA"),
        ("michigan", "MI"),
        ("minnesota", "MN"),
        ("mississippi", "MS"),
        ("missouri", "MO"),
        ("montana", "MT"),
        ("nebraska", "NE"),
        ("nevada", "NV"),
        ("new hampshire", "NH"),
        ("new jersey", "NJ"),
        ("new mexico", "NM"),
        ("new york", "NY"),
        ("north carolina", "NC"),
        ("north dakota", "ND"),
        ("ohio", "OH"),
        ("oklahoma", "OK"),
        ("oregon", "OR"),
        ("pennsylvania", "PA"),
        ("rhode island", "RI"),
        ("south carolina", "SC"),
        ("south dakota", "SD"),
        ("tennessee", "TN"),
        ("texas", "TX"),
        ("utah", "UT"),
        ("vermont", "VT"),
        ("virginia", "VA"),
        ("washington", "WA"),
        ("west virginia", "WV"),
        ("wisconsin", "WI"),
        ("wyoming", "WY"),
        ("american samoa", "AS"),
        ("guam", "GU"),
        ("northern mariana islands", "MP"),
        ("puerto rico", "PR"),
        ("virgin islands", "VI"),
        ("us virgin islands", "VI"),
        // 常見的非標準縮寫
        ("ala", "AL"),
        ("ariz", "AZ"),
        ("ark", "AR"),
        ("calif", "CA"),
        ("cal", "CA"),
        ("colo", "CO"),
        ("conn", "CT"),
        ("del", "DE"),
        ("fla", "FL"),
        ("ill", "IL"),
        ("ind", "IN"),
        ("kan", "KS"),
        ("kans", "KS"),
        ("mass", "MA"),
        ("mich", "MI"),
        ("minn", "MN"),
        ("miss", "MS"),
        ("mont", "MT"),
        ("neb", "NE"),
        ("nebr", "NE"),
        ("nev", "NV"),
        ("okla", "OK"),
        ("ore", "OR"),
        ("penn", "PA"),
        ("penna", "PA"),
        ("tenn", "TN"),
        ("tex", "TX"),
        ("wash", "WA"),
        ("wis", "WI"),
        ("wisc", "WI"),
        ("wyo", "WY"),
    ]
    .into_iter()
    .collect()
});

/// 州名或各種縮寫轉成兩碼代碼；無法辨識時原樣（去除空白）回傳
pub fn state_code(value: &str) -> String {
    let trimmed = value.trim();
    let key: String = trimmed
        .to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if key.len() == 2 && key.chars().all(|c| c.is_ascii_alphabetic()) {
        return key.to_uppercase();
    }

    STATE_CODES
        .get(key.as_str())
        .map(|code| code.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// 依欄位表清理記錄
pub fn normalize(mut record: LeadRecord, schema: &Schema) -> LeadRecord {
    for field in schema.fields() {
        let Some(value) = record.get_mut(&field.name) else {
            continue;
        };

        if field.transform.is_none() && field.max_length.is_none() {
            continue;
        }

        // 巢狀或 null 值不做字串轉換
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };

        let mut cleaned = match &field.transform {
            Some(transform) => transform.apply(&text),
            None => text,
        };
        if let Some(max_length) = field.max_length {
            cleaned = truncate_chars(&cleaned, max_length);
        }
        *value = Value::String(cleaned);
    }

    if schema.coerce_scalars {
        let coerced = record
            .iter()
            .map(|(key, value)| {
                // 布林與 null 一律成為空字串
                let value = match value {
                    Value::Null | Value::Bool(_) => Value::String(String::new()),
                    Value::Number(_) => Value::String(scalar_text(value)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect();
        record = coerced;
    }

    record
}
