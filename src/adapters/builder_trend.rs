use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{lenient_string, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{form_post, query_url, Auth, DispatchPlan};
use crate::core::mapper::{CustomFieldMap, FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::{DispatchResult, LeadRecord};
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://buildertrend.net/leads/contactforms/ContactFormFrame.aspx";

/// ASP.NET 表單控制項的名稱前綴
pub const DEFAULT_FIELD_PREFIX: &str = "ctl00$ctl00$ctl00$MasterMain$MasterMain$MasterMain$";

static BEFORE_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^.*<body[^>]*>").unwrap());
static AFTER_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</body>.*$").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// 取出回應頁面 `<body>` 內的文字
pub fn page_text(html: &str) -> String {
    let text = BEFORE_BODY.replace(html, "");
    let text = AFTER_BODY.replace(&text, "");
    TAG.replace_all(&text, "").trim().to_string()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BuilderTrendConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_id: Option<String>,
    pub field_prefix: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl BuilderTrendConfig {
    fn prefix(&self) -> &str {
        self.field_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_FIELD_PREFIX)
    }

    fn field(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

impl LeadAdapter for BuilderTrendConfig {
    fn name(&self) -> &'static str {
        "BuilderTrend"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "client_id", &self.client_id).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("__EVENTTARGET").literal("2"),
            FieldSpec::new(self.field("hidmbid")).literal("74028"),
            FieldSpec::new(self.field("LeadContactName"))
                .aliases(&["name"])
                .from(Standard::FullName),
            FieldSpec::new(self.field("LeadEmail"))
                .aliases(&["email"])
                .from(Standard::Email),
            FieldSpec::new(self.field("LeadPhone"))
                .aliases(&["phone"])
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::All))
                .keep_empty(),
            FieldSpec::new(self.field("LeadStreet"))
                .aliases(&["address", "streetaddress"])
                .from(Standard::Address),
            FieldSpec::new(self.field("LeadCity"))
                .aliases(&["city"])
                .from(Standard::City),
            FieldSpec::new(self.field("LeadState"))
                .aliases(&["state"])
                .from(Standard::State),
            FieldSpec::new(self.field("LeadZip"))
                .aliases(&["zip"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5))
                .keep_empty(),
            FieldSpec::new(self.field("LeadGeneralNotes"))
                .aliases(&["notes"])
                .joined()
                .from(Standard::FormLabel),
            FieldSpec::new(self.field("btnSubmit")).literal("Submit"),
        ])
    }

    /// custom 的目標欄位也要加上前綴
    fn custom_fields(&self) -> CustomFieldMap {
        self.options
            .custom
            .iter()
            .map(|(target, source)| (self.field(target), source.clone()))
            .collect()
    }

    fn identity_field(&self) -> Option<&'static str> {
        None
    }

    fn protected_fields(&self) -> Vec<String> {
        ["LeadContactName", "LeadEmail", "LeadPhone", "LeadStreet"]
            .iter()
            .map(|name| self.field(name))
            .collect()
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let client_id = require(self.name(), "client_id", &self.client_id)?;
        let url = query_url(
            &self.options.endpoint_or(ENDPOINT),
            &[("builderID", client_id.to_string())],
        )?;
        let request = form_post(&url, record, false, &Auth::None, context.timeout);
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK_NO_CONTENT)))
    }

    fn success_note(&self, result: &DispatchResult) -> Option<String> {
        Some(page_text(&result.body))
    }
}
