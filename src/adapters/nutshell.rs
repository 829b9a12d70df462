use serde::Deserialize;

use super::{require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const NAME_FIELD: &str = "contact[name]";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NutshellConfig {
    pub api_url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for NutshellConfig {
    fn name(&self) -> &'static str {
        "NutShell"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API URL", &self.api_url).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new(NAME_FIELD)
                .aliases(&["name", "contact_name"])
                .from(Standard::FullName)
                .keep_empty(),
            FieldSpec::new("contact[email]")
                .aliases(&["email", "contact_email"])
                .from(Standard::Email)
                .keep_empty(),
            FieldSpec::new("contact[phone]")
                .aliases(&["phone", "contact_phone"])
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::First(10)))
                .keep_empty(),
            FieldSpec::new("contact[address][address_1]")
                .aliases(&["address", "address1", "contact_address"])
                .from(Standard::Address)
                .keep_empty(),
            FieldSpec::new("contact[address][address_2]")
                .aliases(&["address2"])
                .keep_empty(),
            FieldSpec::new("contact[address][city]")
                .aliases(&["city", "contact_city"])
                .from(Standard::City)
                .keep_empty(),
            FieldSpec::new("contact[address][state]")
                .aliases(&["state", "contact_state"])
                .from(Standard::State)
                .keep_empty(),
            FieldSpec::new("contact[address][postal_code]")
                .aliases(&["zip", "postal_code", "contact_zip", "contact_postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5))
                .keep_empty(),
            FieldSpec::new("note").aliases(&["notes"]).joined(),
            FieldSpec::new("product[name]").aliases(&["product_name"]),
            FieldSpec::new("product[quantity]").aliases(&["product_quantity"]),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some(NAME_FIELD)
    }

    /// 表單端點本身就是公開的，記錄不遮蔽
    fn protected_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_url = require(self.name(), "API URL", &self.api_url)?;
        let request = form_post(api_url, record, false, &Auth::None, context.timeout).follow_redirects();
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK)))
    }
}
