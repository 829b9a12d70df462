use serde_json::Value;

use crate::domain::model::{scalar_text, LeadRecord};

pub const DEFAULT_VISIBLE_CHARS: usize = 4;

/// 遮蔽字串，只保留最後 `visible` 個字元
pub fn mask(value: &str, visible: usize) -> String {
    let total = value.chars().count();
    let hidden = total.saturating_sub(visible);
    value
        .chars()
        .enumerate()
        .map(|(index, c)| if index < hidden { '*' } else { c })
        .collect()
}

/// 回傳遮蔽過敏感欄位的記錄複本，原記錄不變
pub fn protect<S: AsRef<str>>(record: &LeadRecord, visible: usize, fields: &[S]) -> LeadRecord {
    record
        .iter()
        .map(|(key, value)| {
            let value = if fields.iter().any(|field| field.as_ref() == key) {
                match value {
                    Value::String(_) | Value::Number(_) => Value::String(mask(&scalar_text(value), visible)),
                    other => protect_nested(other, visible),
                }
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// 巢狀結構整個遮蔽
fn protect_nested(value: &Value, visible: usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| (key.clone(), protect_nested(inner, visible)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| protect_nested(item, visible)).collect()),
        Value::String(s) => Value::String(mask(s, visible)),
        other => other.clone(),
    }
}
