use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, PayloadCheck, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://www.renewalbyandersen.com/api/sitecore/featureforms/submitform";

static ERROR_DATA: Lazy<Regex> = Lazy::new(|| Regex::new("(?i)error").unwrap());

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EnabledPlusConfig {
    pub api_key: Option<String>,
    /// 測試環境網址
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl EnabledPlusConfig {
    fn url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => self.options.endpoint_or(ENDPOINT),
        }
    }
}

impl LeadAdapter for EnabledPlusConfig {
    fn name(&self) -> &'static str {
        "Enabled Plus"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        let optional = |name: &str, aliases: &[&str]| FieldSpec::new(name).aliases(aliases);

        Schema::new(vec![
            FieldSpec::new("FirstName")
                .aliases(&["first_name"])
                .from(Standard::FirstName),
            FieldSpec::new("LastName")
                .aliases(&["last_name"])
                .from(Standard::LastName),
            FieldSpec::new("EmailAddress")
                .aliases(&["email", "email_address"])
                .from(Standard::Email),
            FieldSpec::new("PhoneNumber")
                .aliases(&["phone", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("Address1")
                .aliases(&["address"])
                .from(Standard::Address),
            optional("Address2", &[]),
            FieldSpec::new("City").from(Standard::City),
            FieldSpec::new("State").from(Standard::State),
            FieldSpec::new("Zipcode")
                .aliases(&["zip", "zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("RbASource")
                .aliases(&["source"])
                .from(Standard::Source("")),
            optional("RbABreakdown", &["breakdown"]),
            optional("ConsultationType", &["consultation_type"]),
            FieldSpec::new("Project").from(Standard::Product),
            optional("BuildingType", &[]),
            optional("BestTimeToCall", &[]),
            FieldSpec::new("Comment")
                .aliases(&["comments", "notes"])
                .joined()
                .from(Standard::FormInfo),
            optional("JobNumber", &["job_number"]),
            // Y / N
            optional("CallingRights", &[]),
            optional("WindowsAge", &[]),
            optional("Windows", &[]),
            optional("WindowsRotting", &[]),
            optional("WindowsStyle", &[]),
            optional("WindowMaterial", &[]),
            optional("WindowsProblems", &["notes2"]),
            optional("Doors", &[]),
            optional("DoorsStyle", &[]),
            optional("FramesCondition", &[]),
            // MM/dd/yyyy
            optional("ApptDate", &[]),
            // hh:mm tt
            optional("ApptTime", &[]),
            optional("Sender", &[]),
            optional("callbackdatetime", &[]),
            optional("rba_1", &[]),
            optional("rba_2", &[]),
            optional("rba_3", &[]),
            optional("rba_4", &[]),
            optional("rba_5", &[]),
            FieldSpec::new("Form Type").aliases(&["FormType"]).literal("3"),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("FirstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "FirstName",
            "LastName",
            "PhoneNumber",
            "EmailAddress",
            "Address1",
        ])
    }

    /// 只保留有值的欄位
    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        record.retain_non_empty();
        record
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let pattern = ERROR_DATA.clone();

        let request = form_post(
            &self.url(),
            record,
            true,
            &Auth::Raw(api_key.to_string()),
            context.timeout,
        );
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::status(STATUS_OK_NO_CONTENT).with(PayloadCheck::FieldNotMatching {
                field: "data".to_string(),
                pattern,
            }),
        ))
    }
}
