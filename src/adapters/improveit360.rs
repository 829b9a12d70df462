use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::Transform;
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

/// eLead 標準欄位
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Improveit360Config {
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for Improveit360Config {
    fn name(&self) -> &'static str {
        "i360"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "i360 URL", &self.url).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        let phone = |name: &str| FieldSpec::new(name).transform(Transform::FormattedPhone);

        Schema::new(vec![
            FieldSpec::new("firstname")
                .aliases(&["first_name"])
                .from(Standard::FirstName)
                .keep_empty(),
            FieldSpec::new("lastname")
                .aliases(&["last_name"])
                .from(Standard::LastName)
                .keep_empty(),
            FieldSpec::new("email1")
                .aliases(&["email"])
                .from(Standard::Email)
                .keep_empty(),
            phone("phone1").aliases(&["phone"]).from(Standard::Phone).keep_empty(),
            FieldSpec::new("phone1type")
                .aliases(&["phonetype", "phonetype1"])
                .literal("Home"),
            phone("phone2").keep_empty(),
            FieldSpec::new("phone2type").aliases(&["phonetype2"]).keep_empty(),
            phone("phone3").keep_empty(),
            FieldSpec::new("phone3type").aliases(&["phonetype3"]).keep_empty(),
            FieldSpec::new("streetaddress")
                .aliases(&["address"])
                .from(Standard::Address)
                .keep_empty(),
            FieldSpec::new("city").from(Standard::City).keep_empty(),
            FieldSpec::new("state").from(Standard::State).keep_empty(),
            FieldSpec::new("zip")
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5))
                .keep_empty(),
            FieldSpec::new("comments")
                .aliases(&["notes"])
                .joined()
                .from(Standard::FormInfo)
                .keep_empty(),
            FieldSpec::new("apptday").keep_empty(),
            FieldSpec::new("appttime").keep_empty(),
            FieldSpec::new("sourcetype").literal("Website"),
            FieldSpec::new("source").keep_empty(),
            FieldSpec::new("retURL").aliases(&["returnurl"]).keep_empty(),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "firstname",
            "lastname",
            "phone1",
            "phone2",
            "phone3",
            "email1",
            "streetaddress",
        ])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let url = require(self.name(), "i360 URL", &self.url)?;
        let request = form_post(url, record, false, &Auth::None, context.timeout).follow_redirects();
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapper::map;
    use crate::core::normalizer::normalize;
    use crate::domain::model::FormContext;

    #[test]
    fn test_phones_are_formatted() -> anyhow::Result<()> {
        let config = Improveit360Config::default();
        let schema = config.schema()?;
        let input = LeadRecord::from_pairs([
            ("first_name", "Jane"),
            ("phone", "+1 555.123.4567"),
            ("phone2", "555-987-6543"),
            ("zip_code", "30301-1234"),
        ]);
        let record = map(&input, &FormContext::default(), &schema, &config.custom_fields(), ", ");
        let record = normalize(record, &schema);

        assert_eq!(record.text("phone1"), "(555) 123-4567");
        assert_eq!(record.text("phone2"), "(555) 987-6543");
        assert_eq!(record.text("phone3"), "");
        assert_eq!(record.text("zip"), "30301");
        assert_eq!(record.text("phone1type"), "Home");
        Ok(())
    }

    #[test]
    fn test_url_is_required() {
        let error = Improveit360Config::default().check_config().unwrap_err();
        assert!(error.to_string().contains("i360 URL is missing"));
    }
}
