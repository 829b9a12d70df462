use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{json_post, query_url, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://app.jobnimbus.com/api1/contacts";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct JobNimbusConfig {
    pub api_key: Option<String>,
    /// 帳號 email，作為建立者
    pub actor: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl JobNimbusConfig {
    pub fn url(&self) -> Result<String> {
        let base = self.options.endpoint_or(ENDPOINT);
        match self.actor.as_deref().filter(|actor| !actor.trim().is_empty()) {
            Some(actor) => query_url(&base, &[("actor", actor.to_string())]),
            None => Ok(base),
        }
    }
}

impl LeadAdapter for JobNimbusConfig {
    fn name(&self) -> &'static str {
        "JobNimbus"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("first_name")
                .aliases(&["firstname"])
                .from(Standard::FirstName),
            FieldSpec::new("last_name")
                .aliases(&["lastname"])
                .from(Standard::LastName),
            FieldSpec::new("home_phone")
                .aliases(&["phone", "phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("mobile_phone").aliases(&["phone2"]),
            FieldSpec::new("work_phone").aliases(&["phone3"]),
            FieldSpec::new("email")
                .aliases(&["email_address"])
                .from(Standard::Email),
            FieldSpec::new("address_line1")
                .aliases(&["address", "streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state_text")
                .aliases(&["state"])
                .from(Standard::State),
            FieldSpec::new("zip")
                .aliases(&["postal_code", "zip_code"])
                .from(Standard::Zip),
            FieldSpec::new("record_type_name")
                .aliases(&["record_type"])
                .literal("Customer"),
            FieldSpec::new("status_name")
                .aliases(&["status"])
                .literal("Lead"),
            FieldSpec::new("source_name").aliases(&["source"]),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("first_name")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "last_name",
            "home_phone",
            "mobile_phone",
            "work_phone",
            "email",
            "address_line1",
        ])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let request = json_post(
            &self.url()?,
            &record.to_json(),
            &Auth::Bearer(api_key.to_string()),
            context.timeout,
        )?;
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::status(STATUS_OK_NO_CONTENT),
        ))
    }
}
