use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_ACCEPTED};
use crate::core::dispatcher::{json_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://api.acculynx.com/api/v1/leads";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AcculynxConfig {
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for AcculynxConfig {
    fn name(&self) -> &'static str {
        "Acculynx"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("firstName")
                .aliases(&["first_name", "firstname"])
                .from(Standard::FirstName),
            FieldSpec::new("lastName")
                .aliases(&["last_name", "lastname"])
                .from(Standard::LastName),
            FieldSpec::new("emailAddress")
                .aliases(&["email", "email_address"])
                .from(Standard::Email),
            FieldSpec::new("phoneNumber1")
                .aliases(&["phone", "phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("phoneType1")
                .aliases(&["phone_type", "phone_type1"])
                .literal("Home"),
            FieldSpec::new("phoneNumber2").aliases(&["phone2", "phone_number2"]),
            FieldSpec::new("phoneType2")
                .aliases(&["phone_type2"])
                .literal("Mobile"),
            FieldSpec::new("phoneNumber3").aliases(&["phone3", "phone_number3"]),
            FieldSpec::new("phoneType3")
                .aliases(&["phone_type3"])
                .literal("Work"),
            FieldSpec::new("street")
                .aliases(&["address", "streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state").from(Standard::State),
            FieldSpec::new("zip")
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("country").from(Standard::Country("US")),
            FieldSpec::new("notes")
                .aliases(&["comments"])
                .joined()
                .from(Standard::Comments),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "lastName",
            "phoneNumber1",
            "phoneNumber2",
            "phoneNumber3",
            "emailAddress",
            "street",
        ])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let request = json_post(
            &self.options.endpoint_or(ENDPOINT),
            &record.to_json(),
            &Auth::Bearer(api_key.to_string()),
            context.timeout,
        )?;
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::errors_falsy(STATUS_OK_ACCEPTED),
        ))
    }
}
