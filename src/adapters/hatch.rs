use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{field_list, lenient_string, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{json_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

/// 8 位數部門編號使用舊版端點
pub const ENDPOINT_V1: &str = "https://prod.usehatchapp.com/api/webhooks/{dept_id}/newlead";
pub const ENDPOINT_V2: &str = "https://app.usehatchapp.com/api/webhooks/{dept_id}/newlead";

static LEGACY_DEPT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());
static DEPT_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\{dept_id\}").unwrap());

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HatchConfig {
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dept_id: Option<String>,
    /// 可包含 `{dept_id}` 佔位字
    pub api_url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl HatchConfig {
    pub fn url(&self, dept_id: &str) -> String {
        let legacy = LEGACY_DEPT_ID.is_match(dept_id);
        let template = self
            .api_url
            .clone()
            .or_else(|| self.options.endpoint.clone())
            .unwrap_or_else(|| if legacy { ENDPOINT_V1 } else { ENDPOINT_V2 }.to_string());

        DEPT_PLACEHOLDER.replace_all(&template, dept_id).into_owned()
    }
}

impl LeadAdapter for HatchConfig {
    fn name(&self) -> &'static str {
        "Hatch"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key)?;
        require(self.name(), "Dept ID", &self.dept_id).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("firstName")
                .aliases(&["firstname", "first_name"])
                .from(Standard::FirstName),
            FieldSpec::new("lastName")
                .aliases(&["lastname", "last_name"])
                .from(Standard::LastName),
            FieldSpec::new("phoneNumber")
                .aliases(&["phone", "phone1"])
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::All)),
            FieldSpec::new("email")
                .aliases(&["email1"])
                .from(Standard::Email),
            FieldSpec::new("source"),
            FieldSpec::new("status"),
            FieldSpec::new("id"),
            FieldSpec::new("contactID"),
            FieldSpec::new("createdAt"),
            FieldSpec::new("updatedAt"),
            FieldSpec::new("address")
                .aliases(&["streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state").from(Standard::State),
            FieldSpec::new("zip")
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5)),
            FieldSpec::new("comments")
                .aliases(&["notes"])
                .joined()
                .from(Standard::FormInfo),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["lastName", "phoneNumber", "email", "address"])
    }

    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        record.retain_non_empty();
        record
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let dept_id = require(self.name(), "Dept ID", &self.dept_id)?;
        let request = json_post(
            &self.url(dept_id),
            &record.to_json(),
            &Auth::Header("X-API-KEY", api_key.to_string()),
            context.timeout,
        )?;
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::errors_falsy(STATUS_OK_NO_CONTENT),
        ))
    }
}
