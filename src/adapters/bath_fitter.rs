use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::ClassifyRule;
use crate::core::dispatcher::{envelope, json_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://api.mybathfitter.com/BFService.svc/lead?format=json";

/// 測試名單固定使用的郵遞區號
pub const TEST_ZIP_CODE: &str = "z9z9z9";

static TEST_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@test(ing)?\.com").unwrap());

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BathFitterConfig {
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for BathFitterConfig {
    fn name(&self) -> &'static str {
        "Bath Fitter"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("FirstName")
                .aliases(&["first_name", "firstname"])
                .from(Standard::FirstName),
            FieldSpec::new("LastName")
                .aliases(&["last_name", "lastname"])
                .from(Standard::LastName),
            FieldSpec::new("Email")
                .aliases(&["email_address"])
                .from(Standard::Email),
            FieldSpec::new("Phone1")
                .aliases(&["phone", "phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("Phone2").null(),
            FieldSpec::new("Address1")
                .aliases(&["address", "streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("City").aliases(&["city"]).from(Standard::City),
            FieldSpec::new("State").from(Standard::State),
            FieldSpec::new("ZipCode")
                .aliases(&["zip", "zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("Country").from(Standard::Country("US")),
            FieldSpec::new("Message")
                .aliases(&["notes", "comments"])
                .joined()
                .from(Standard::Comments),
            FieldSpec::new("InterestedIn").null(),
            FieldSpec::new("YearHomeBuilt").null(),
            FieldSpec::new("PreferredLanguage").null(),
            FieldSpec::new("UtmSource")
                .aliases(&["utmsource", "utm_source"])
                .null(),
            FieldSpec::new("aff_id").aliases(&["affiliate"]).null(),
            FieldSpec::new("offer_id").aliases(&["offer"]).null(),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("FirstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["LastName", "Email", "Phone1", "Address1"])
    }

    /// 測試信箱的名單一律改用固定郵遞區號
    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        let is_test = record
            .non_empty("Email")
            .is_some_and(|email| TEST_EMAIL.is_match(&email));
        if is_test {
            record.insert("ZipCode", TEST_ZIP_CODE);
        }
        record
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;

        let mut lead = record.clone();
        lead.retain_non_null();

        let request = json_post(
            &self.options.endpoint_or(ENDPOINT),
            &envelope("Lead", lead.to_json()),
            &Auth::Raw(api_key.to_string()),
            context.timeout,
        )?;
        Ok(DispatchPlan::single(request, ClassifyRule::header(201, "ResultID")))
    }
}
