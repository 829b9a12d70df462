use serde::Deserialize;

use super::{field_list, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://crm.zoho.com/crm/WebToLeadForm";

/// base64("Leads")
pub const DEFAULT_ACTION_TYPE: &str = "TGVhZHM=";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ZohoConfig {
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for ZohoConfig {
    fn name(&self) -> &'static str {
        "Zoho"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        Ok(())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("Company").from(Standard::Company).keep_empty(),
            FieldSpec::new("First Name")
                .aliases(&["firstname", "first_name"])
                .from(Standard::FirstName)
                .keep_empty(),
            FieldSpec::new("Last Name")
                .aliases(&["lastname", "last_name"])
                .from(Standard::LastName)
                .keep_empty(),
            FieldSpec::new("Email").from(Standard::Email).keep_empty(),
            FieldSpec::new("Phone")
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::First(10)))
                .keep_empty(),
            FieldSpec::new("Street")
                .aliases(&["address"])
                .from(Standard::Address)
                .keep_empty(),
            FieldSpec::new("City").from(Standard::City).keep_empty(),
            FieldSpec::new("State").from(Standard::State).keep_empty(),
            FieldSpec::new("Zip Code")
                .aliases(&["zip", "zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(10))
                .keep_empty(),
            FieldSpec::new("Country").from(Standard::Country("US")),
            FieldSpec::new("Description")
                .aliases(&["notes", "note"])
                .joined(),
            // 隱藏欄位
            FieldSpec::new("actionType")
                .aliases(&["action"])
                .literal(DEFAULT_ACTION_TYPE)
                .required(),
            FieldSpec::new("xnQsjsdp").aliases(&["xn"]).required(),
            FieldSpec::new("xmIwtLD").aliases(&["xm"]).required(),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("First Name")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "Last Name",
            "Phone",
            "Email",
            "Street",
            "actionType",
            "xnQsjsdp",
            "xmIwtLD",
        ])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let request = form_post(
            &self.options.endpoint_or(ENDPOINT),
            record,
            false,
            &Auth::None,
            context.timeout,
        )
        .follow_redirects();
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK)))
    }
}
