use serde::Deserialize;

use super::{field_list, lenient_string, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://forms.hubspot.com/uploads/form/v2";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HubspotConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub portal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub form_id: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl HubspotConfig {
    /// `{endpoint}/{portal_id}/{form_id}`
    pub fn url(&self, portal_id: &str, form_id: &str) -> String {
        let base = self.options.endpoint_or(ENDPOINT);
        format!("{}/{}/{}", base.trim_end_matches('/'), portal_id, form_id)
    }
}

impl LeadAdapter for HubspotConfig {
    fn name(&self) -> &'static str {
        "HubSpot"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "portal_id", &self.portal_id)?;
        require(self.name(), "form_id", &self.form_id).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("firstname")
                .aliases(&["first_name"])
                .from(Standard::FirstName),
            FieldSpec::new("lastname")
                .aliases(&["last_name"])
                .from(Standard::LastName),
            FieldSpec::new("email")
                .aliases(&["email1"])
                .from(Standard::Email),
            FieldSpec::new("phone")
                .aliases(&["phone1"])
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::All)),
            FieldSpec::new("address")
                .aliases(&["streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("zip_code")
                .aliases(&["zip"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5)),
            FieldSpec::new("message")
                .aliases(&["comments", "notes"])
                .joined()
                .from(Standard::FormInfo),
            FieldSpec::new("product"),
            FieldSpec::new("source"),
            FieldSpec::new("source_type")
                .aliases(&["sourcetype"])
                .literal("Website"),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["firstname", "lastname", "phone", "email", "address"])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let portal_id = require(self.name(), "portal_id", &self.portal_id)?;
        let form_id = require(self.name(), "form_id", &self.form_id)?;
        let request = form_post(
            &self.url(portal_id, form_id),
            record,
            true,
            &Auth::None,
            context.timeout,
        );
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::status(STATUS_OK_NO_CONTENT),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_and_form_in_path() {
        let config = HubspotConfig::default();
        assert_eq!(
            config.url("3668872", "4ef91f1a"),
            "https://forms.hubspot.com/uploads/form/v2/3668872/4ef91f1a"
        );
    }

    #[test]
    fn test_missing_form_id() {
        let config = HubspotConfig {
            portal_id: Some("3668872".to_string()),
            ..HubspotConfig::default()
        };
        let error = config.check_config().unwrap_err();
        assert!(error.to_string().contains("form_id is missing"));
    }

    #[test]
    fn test_empty_values_are_not_posted() -> anyhow::Result<()> {
        let config = HubspotConfig {
            portal_id: Some("1".to_string()),
            form_id: Some("f".to_string()),
            ..HubspotConfig::default()
        };
        let record = LeadRecord::from_pairs([("firstname", "Jane"), ("product", ""), ("zip_code", "30301")]);
        let DispatchPlan::Single { request, .. } = config.plan(&record, &PlanContext::default())? else {
            panic!("expected a single request");
        };
        assert_eq!(request.body.as_deref(), Some("firstname=Jane&zip_code=30301"));
        Ok(())
    }
}
