use serde::Deserialize;

use super::{field_list, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://webto.salesforce.com/servlet/servlet.WebToLead";

/// Web-to-Lead 表單；組織編號 `oid` 隨名單欄位送出
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SalesforceConfig {
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl SalesforceConfig {
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => self.options.endpoint_or(ENDPOINT),
        }
    }
}

impl LeadAdapter for SalesforceConfig {
    fn name(&self) -> &'static str {
        "Salesforce"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        Ok(())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("first_name")
                .aliases(&["firstname"])
                .from(Standard::FirstName)
                .keep_empty(),
            FieldSpec::new("last_name")
                .aliases(&["lastname"])
                .from(Standard::LastName)
                .keep_empty(),
            FieldSpec::new("email").from(Standard::Email).keep_empty(),
            FieldSpec::new("phone")
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::First(10)))
                .keep_empty(),
            FieldSpec::new("street")
                .aliases(&["address"])
                .from(Standard::Address)
                .keep_empty(),
            FieldSpec::new("city").from(Standard::City).keep_empty(),
            FieldSpec::new("state_code")
                .aliases(&["state"])
                .from(Standard::State)
                .keep_empty(),
            FieldSpec::new("zip")
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(10))
                .keep_empty(),
            FieldSpec::new("country_code")
                .aliases(&["country"])
                .from(Standard::Country("US")),
            FieldSpec::new("lead_source").aliases(&["source"]).keep_empty(),
            FieldSpec::new("member_status").literal("Responded"),
            FieldSpec::new("Campaign_ID").aliases(&["campaign"]).keep_empty(),
            FieldSpec::new("oid").required(),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("first_name")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["last_name", "phone", "email", "street", "oid"])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let request = form_post(&self.url(), record, false, &Auth::None, context.timeout).follow_redirects();
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK)))
    }
}
