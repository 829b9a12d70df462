//! 欄位對應：把呼叫端的表單欄位整理成目標 CRM 的欄位集合。
//!
//! 每個目標欄位依序嘗試：欄位本身的名稱、別名（依列出順序）、預設值。
//! 之後套用部署設定的 custom 對應，這是唯一可以覆寫既有值的步驟。

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::core::normalizer::Transform;
use crate::domain::model::{is_blank, FormContext, LeadRecord};
use crate::utils::error::{RelayError, Result};

pub const DEFAULT_JOIN_DELIMITER: &str = ", ";

/// 預設值的來源，於呼叫時從表單資訊取值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Address,
    City,
    State,
    Zip,
    Country(&'static str),
    Company,
    Comments,
    FormInfo,
    FormLabel,
    Source(&'static str),
    Product,
    Referrer,
    FormName,
    FormId,
}

impl Standard {
    pub fn resolve(&self, form: &FormContext) -> Option<String> {
        match self {
            Standard::FirstName => form.first_name.clone(),
            Standard::LastName => form.last_name.clone(),
            Standard::FullName => form.full_name(),
            Standard::Email => form.email.clone(),
            Standard::Phone => form.phone.clone(),
            Standard::Address => form.address.clone(),
            Standard::City => form.city.clone(),
            Standard::State => form.state.clone(),
            Standard::Zip => form.zip.clone(),
            Standard::Country(fallback) => form
                .country
                .clone()
                .or_else(|| non_empty_literal(fallback)),
            Standard::Company => form.company.clone(),
            Standard::Comments => form.comments.clone(),
            Standard::FormInfo => form.form_info(),
            Standard::FormLabel => form.form_label(),
            Standard::Source(fallback) => form
                .source
                .clone()
                .or_else(|| non_empty_literal(fallback)),
            Standard::Product => form.product.clone(),
            Standard::Referrer => form.referrer.clone(),
            Standard::FormName => form.form_name.clone(),
            Standard::FormId => form.form_id.clone(),
        }
        .filter(|value| !value.is_empty())
    }
}

fn non_empty_literal(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    From(Standard),
    /// 呼叫當下的時間，使用 chrono 格式字串
    Timestamp(&'static str),
    /// 明確的 null，欄位會存在但值為 null
    Null,
}

impl DefaultValue {
    fn evaluate(&self, form: &FormContext) -> Option<Value> {
        match self {
            DefaultValue::Literal(value) => (!is_blank(value)).then(|| value.clone()),
            DefaultValue::From(standard) => standard.resolve(form).map(Value::String),
            DefaultValue::Timestamp(format) => {
                Some(Value::String(chrono::Local::now().format(format).to_string()))
            }
            DefaultValue::Null => Some(Value::Null),
        }
    }
}

/// 目標欄位描述
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub default: Option<DefaultValue>,
    pub aliases: Vec<String>,
    pub required: bool,
    pub keep_empty: bool,
    pub joined: bool,
    pub max_length: Option<usize>,
    pub transform: Option<Transform>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            aliases: Vec::new(),
            required: false,
            keep_empty: false,
            joined: false,
            max_length: None,
            transform: None,
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn from(mut self, standard: Standard) -> Self {
        self.default = Some(DefaultValue::From(standard));
        self
    }

    pub fn literal(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn null(mut self) -> Self {
        self.default = Some(DefaultValue::Null);
        self
    }

    pub fn timestamp(mut self, format: &'static str) -> Self {
        self.default = Some(DefaultValue::Timestamp(format));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.keep_empty = true;
        self
    }

    pub fn keep_empty(mut self) -> Self {
        self.keep_empty = true;
        self
    }

    pub fn joined(mut self) -> Self {
        self.joined = true;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// 欄位本身名稱加上別名，依探測順序
    fn sources(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// 一個目標的完整欄位表
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    pub coerce_scalars: bool,
    /// 呼叫端的所有欄位原樣帶入，再套用欄位表
    pub passthrough: bool,
}

impl Schema {
    /// 建立欄位表；不同欄位的別名不可重疊
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        // 欄位名稱與別名合起來，每個輸入鍵只能屬於一個欄位
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for field in &fields {
            for source in field.sources() {
                if let Some(owner) = owners.insert(source, field.name.as_str()) {
                    if owner != field.name {
                        return Err(RelayError::InvalidConfigValueError {
                            field: field.name.clone(),
                            value: source.to_string(),
                            reason: format!("input key already claimed by '{}'", owner),
                        });
                    }
                }
            }
        }
        Ok(Self {
            fields,
            coerce_scalars: false,
            passthrough: false,
        })
    }

    /// 不做欄位對應的目標使用
    pub fn passthrough() -> Self {
        Self {
            fields: Vec::new(),
            coerce_scalars: false,
            passthrough: true,
        }
    }

    /// 無法表示 null/布林的傳輸方式使用
    pub fn coerce_scalars(mut self) -> Self {
        self.coerce_scalars = true;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

/// 部署設定的 custom 欄位對應：目標欄位 → 呼叫端欄位
pub type CustomFieldMap = BTreeMap<String, String>;

/// 依欄位表產生目標記錄
pub fn map(
    input: &LeadRecord,
    form: &FormContext,
    schema: &Schema,
    custom: &CustomFieldMap,
    join_delimiter: &str,
) -> LeadRecord {
    let mut record = if schema.passthrough {
        input.clone()
    } else {
        LeadRecord::new()
    };

    for field in schema.fields() {
        if let Some(value) = resolve_field(input, form, field, join_delimiter) {
            record.insert(field.name.clone(), value);
        } else if field.keep_empty {
            record.insert(field.name.clone(), Value::String(String::new()));
        }
    }

    for (target_field, input_field) in custom {
        if let Some(value) = input.get(input_field).filter(|value| !is_blank(value)) {
            record.insert(target_field.clone(), value.clone());
        }
    }

    record
}

fn resolve_field(
    input: &LeadRecord,
    form: &FormContext,
    field: &FieldSpec,
    join_delimiter: &str,
) -> Option<Value> {
    if field.joined {
        let mut seen: Vec<String> = Vec::new();
        for source in field.sources() {
            if let Some(text) = input.non_empty(source) {
                if !seen.contains(&text) {
                    seen.push(text);
                }
            }
        }
        if !seen.is_empty() {
            return Some(Value::String(seen.join(join_delimiter)));
        }
    } else if let Some(value) = field
        .sources()
        .find_map(|source| input.get(source).filter(|value| !is_blank(value)))
    {
        return Some(value.clone());
    }

    field.default.as_ref().and_then(|default| default.evaluate(form))
}

/// 移除部署設定要求忽略的欄位
pub fn suppress(record: &mut LeadRecord, ignore: &[String]) {
    for field in ignore {
        record.remove(field);
    }
}
