use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::error::RelayError;

/// 一筆名單記錄：有序的欄位名稱 → 值
///
/// 欄位「不存在」與「存在但為 null」是兩種不同狀態，
/// 對應器只會在有值時才寫入欄位。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadRecord {
    fields: Map<String, Value>,
}

/// 與表單值的「空」判斷一致：null、空字串、false、空陣列、空物件
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// 將純量值轉成字串；null 與 false 視為空字串
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// 欄位的字串形式；不存在時回傳空字串
    pub fn text(&self, key: &str) -> String {
        self.fields.get(key).map(scalar_text).unwrap_or_default()
    }

    /// 只有在欄位存在且非空時才回傳字串
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .filter(|value| !is_blank(value))
            .map(scalar_text)
    }

    pub fn is_filled(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|value| !is_blank(value))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// 移除所有空值欄位，只送出有設定的欄位
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.fields.retain(|key, value| keep(key, value));
    }

    pub fn retain_non_empty(&mut self) {
        self.fields.retain(|_, value| !is_blank(value));
    }

    /// 移除值為 null 的欄位（保留空字串）
    pub fn retain_non_null(&mut self) {
        self.fields.retain(|_, value| !value.is_null());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 攤平成 key/value 字串對，用於表單編碼
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), scalar_text(value)))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl FromIterator<(String, Value)> for LeadRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// 表單送出時的原始資訊，供預設值在呼叫時取用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormContext {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
    pub comments: Option<String>,
    pub source: Option<String>,
    pub product: Option<String>,
    pub referrer: Option<String>,
    pub form_name: Option<String>,
    pub form_id: Option<String>,
}

const FIRST_NAME_KEYS: &[&str] = &["first_name", "firstname", "fname", "first"];
const LAST_NAME_KEYS: &[&str] = &["last_name", "lastname", "lname", "last"];
const EMAIL_KEYS: &[&str] = &["email", "email_address", "email1"];
const PHONE_KEYS: &[&str] = &["phone", "phone1", "phone_number", "telephone"];
const ADDRESS_KEYS: &[&str] = &["address", "address1", "streetaddress", "street"];
const CITY_KEYS: &[&str] = &["city"];
const STATE_KEYS: &[&str] = &["state", "province"];
const ZIP_KEYS: &[&str] = &["zip", "zip_code", "postal_code", "zipcode"];
const COUNTRY_KEYS: &[&str] = &["country"];
const COMPANY_KEYS: &[&str] = &["company", "company_name"];
const COMMENTS_KEYS: &[&str] = &["comments", "notes", "message"];
const SOURCE_KEYS: &[&str] = &["source", "lead_source"];
const PRODUCT_KEYS: &[&str] = &["product", "products"];
const REFERRER_KEYS: &[&str] = &["referrer", "referer"];
const FORM_NAME_KEYS: &[&str] = &["form_name", "formname"];
const FORM_ID_KEYS: &[&str] = &["form_id", "formid"];

impl FormContext {
    /// 依常見欄位名稱從呼叫端記錄推導表單資訊
    pub fn from_record(record: &LeadRecord) -> Self {
        let first_of = |keys: &[&str]| keys.iter().find_map(|key| record.non_empty(key));

        Self {
            first_name: first_of(FIRST_NAME_KEYS),
            last_name: first_of(LAST_NAME_KEYS),
            email: first_of(EMAIL_KEYS),
            phone: first_of(PHONE_KEYS),
            address: first_of(ADDRESS_KEYS),
            city: first_of(CITY_KEYS),
            state: first_of(STATE_KEYS),
            zip: first_of(ZIP_KEYS),
            country: first_of(COUNTRY_KEYS),
            company: first_of(COMPANY_KEYS),
            comments: first_of(COMMENTS_KEYS),
            source: first_of(SOURCE_KEYS),
            product: first_of(PRODUCT_KEYS),
            referrer: first_of(REFERRER_KEYS),
            form_name: first_of(FORM_NAME_KEYS),
            form_id: first_of(FORM_ID_KEYS),
        }
    }

    /// 名 + 姓，兩者皆空時為 None
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// 表單標記，例如 `Form: Contact Us (#12)`
    pub fn form_label(&self) -> Option<String> {
        match (&self.form_name, &self.form_id) {
            (None, None) => None,
            (name, id) => Some(format!(
                "Form: {} (#{})",
                name.as_deref().unwrap_or_default(),
                id.as_deref().unwrap_or_default()
            )),
        }
    }

    /// 留言內容加上表單標記
    pub fn form_info(&self) -> Option<String> {
        let parts: Vec<String> = [self.comments.clone(), self.form_label()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// 一次傳輸（單一步驟）的原始結果與判定
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchResult {
    pub status: Option<u16>,
    pub body: String,
    pub raw_headers: String,
    pub payload: Option<Value>,
    pub error: Option<String>,
    pub success: bool,
}

impl DispatchResult {
    pub fn transport_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// 成功送達
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub target: String,
    pub lead: String,
    pub reference: Option<String>,
    pub dry_run: bool,
}

/// 失敗細節：錯誤本身、遮蔽後的記錄、最後一次傳輸結果
#[derive(Debug)]
pub struct FailureDetail {
    pub target: String,
    pub lead: String,
    pub error: RelayError,
    pub record: LeadRecord,
    pub dispatch: Option<DispatchResult>,
}

impl FailureDetail {
    pub fn step(&self) -> Option<u8> {
        self.error.failed_step()
    }

    pub fn status(&self) -> Option<u16> {
        self.dispatch
            .as_ref()
            .and_then(|result| result.status)
            .or_else(|| self.error.status())
    }
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}
