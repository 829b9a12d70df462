use serde::Deserialize;
use serde_json::{Map, Value};

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_ACCEPTED};
use crate::core::dispatcher::{json_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::{is_blank, LeadRecord};
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://rest.gohighlevel.com/v1/contacts/";

pub const SOURCE_PREFIX: &str = "Public API";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GoHighLevelConfig {
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for GoHighLevelConfig {
    fn name(&self) -> &'static str {
        "GoHighLevel"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("name").from(Standard::FullName),
            FieldSpec::new("firstName")
                .aliases(&["first_name", "firstname"])
                .from(Standard::FirstName),
            FieldSpec::new("lastName")
                .aliases(&["last_name", "lastname"])
                .from(Standard::LastName),
            FieldSpec::new("email")
                .aliases(&["email_address"])
                .from(Standard::Email),
            FieldSpec::new("phone")
                .aliases(&["phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("address1")
                .aliases(&["address", "streetaddress", "street"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state").from(Standard::State),
            FieldSpec::new("postalCode")
                .aliases(&["zip", "zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("notes")
                .aliases(&["additional_notes", "description", "comments"])
                .joined()
                .from(Standard::FormInfo),
            FieldSpec::new("product").from(Standard::Product),
            FieldSpec::new("companyName").aliases(&["company", "company_name"]),
            FieldSpec::new("website"),
            FieldSpec::new("timezone"),
            FieldSpec::new("dnd"),
            FieldSpec::new("tags"),
            FieldSpec::new("source").from(Standard::Source("")),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["name", "lastName", "phone", "email", "address1"])
    }

    /// 把 custom 欄位搬進 `customField`，備註與產品只以自訂欄位送出
    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        let mut custom = Map::new();
        for (field, source) in &self.options.custom {
            let value = record
                .remove(field)
                .or_else(|| record.get(source).cloned())
                .filter(|value| !is_blank(value));
            if let Some(value) = value {
                custom.insert(field.clone(), value);
            }
            record.remove(source);
        }
        record.remove("notes");
        record.remove("product");
        record.insert("customField", Value::Object(custom));

        let source = match record.non_empty("source") {
            Some(source) if !source.starts_with(SOURCE_PREFIX) => format!("{} ({})", SOURCE_PREFIX, source),
            Some(source) => source,
            None => SOURCE_PREFIX.to_string(),
        };
        record.insert("source", source);
        record
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
            ClassifyRule::path(STATUS_OK_ACCEPTED, &["contact", "id"]),
        ))
    }
}
