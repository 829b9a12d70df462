use serde::Deserialize;
use serde_json::{json, Value};

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_NO_CONTENT};
use crate::core::dispatcher::{json_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{single_line, DigitKeep, Transform};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const LEAD_STATUS: &str = "Lead received";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BuilderPrimeConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl BuilderPrimeConfig {
    fn url(&self) -> Result<String> {
        match &self.options.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(endpoint.clone()),
            _ => require(self.name(), "API URL", &self.api_url).map(str::to_string),
        }
    }

    /// 留言、來源、推薦網址與表單標記合併成單行備註
    fn notes(record: &LeadRecord) -> String {
        let mut parts = Vec::new();
        if let Some(comments) = record.non_empty("comments") {
            parts.push(format!("Question/Comment: {}", comments));
        }
        if let Some(source) = record.non_empty("source") {
            parts.push(format!("Source: {}", source));
        }
        if let Some(referrer) = record.non_empty("referrer") {
            parts.push(format!("Referrer: {}", referrer));
        }
        if let Some(form) = record.non_empty("form") {
            parts.push(form);
        }
        single_line(parts.join(" ").trim())
    }

    fn body(&self, record: &LeadRecord) -> Value {
        let mut body = json!({
            "userAccount": {
                "firstName": record.text("firstname"),
                "lastName": record.text("lastname"),
                "emailAddress": record.text("email"),
            },
            "phoneNumber": format!("+1{}", record.text("phone")),
        });

        if let Some(zip) = record.non_empty("zip") {
            body["zip"] = Value::String(zip);
        }
        let notes = Self::notes(record);
        if !notes.is_empty() {
            body["notes"] = Value::String(notes);
        }

        let custom: Vec<Value> = self
            .options
            .custom
            .iter()
            .map(|(target, source)| {
                json!({
                    "customFieldName": source,
                    "customFieldValue": record.text(target),
                })
            })
            .collect();
        if !custom.is_empty() {
            body["customFields"] = Value::Array(custom);
        }

        body["leadStatus"] = json!({ "name": LEAD_STATUS });
        body["clientLeadSource"] = json!({ "description": record.text("source") });
        body
    }
}

impl LeadAdapter for BuilderPrimeConfig {
    fn name(&self) -> &'static str {
        "Builder Prime"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key)?;
        self.url().map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("firstname")
                .aliases(&["first_name"])
                .from(Standard::FirstName)
                .max_length(40),
            FieldSpec::new("lastname")
                .aliases(&["last_name"])
                .from(Standard::LastName)
                .max_length(80),
            FieldSpec::new("email").from(Standard::Email),
            FieldSpec::new("phone")
                .from(Standard::Phone)
                .transform(Transform::Digits(DigitKeep::Last(10))),
            FieldSpec::new("address")
                .aliases(&["streetaddress"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state").from(Standard::State),
            FieldSpec::new("zip")
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("comments")
                .aliases(&["notes"])
                .joined()
                .from(Standard::Comments),
            FieldSpec::new("source").from(Standard::Source("Website")),
            FieldSpec::new("referrer").from(Standard::Referrer),
            FieldSpec::new("form").from(Standard::FormLabel),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["firstname", "lastname", "phone", "email"])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let request = json_post(
            &self.url()?,
            &self.body(record),
            &Auth::Header("X-API-KEY", api_key.to_string()),
            context.timeout,
        )?;
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK_NO_CONTENT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_shape() {
        let mut config = BuilderPrimeConfig::default();
        config.options.custom.insert("referral_url".to_string(), "Referral URL".to_string());

        let record = LeadRecord::from_pairs([
            ("firstname", "Jane"),
            ("lastname", "Doe"),
            ("email", "jane@example.com"),
            ("phone", "5551234567"),
            ("comments", "Need a quote\nsoon"),
            ("source", "Website"),
            ("form", "Form: Quote (#3)"),
            ("referral_url", "https://ref.example.com"),
        ]);
        let body = config.body(&record);

        assert_eq!(body["userAccount"]["firstName"], "Jane");
        assert_eq!(body["phoneNumber"], "+15551234567");
        assert!(body.get("zip").is_none());
        assert_eq!(
            body["notes"],
            "Question/Comment: Need a quote soon Source: Website Form: Quote (#3)"
        );
        assert_eq!(body["customFields"][0]["customFieldName"], "Referral URL");
        assert_eq!(body["customFields"][0]["customFieldValue"], "https://ref.example.com");
        assert_eq!(body["leadStatus"]["name"], LEAD_STATUS);
        assert_eq!(body["clientLeadSource"]["description"], "Website");
    }

    #[test]
    fn test_missing_url_fails_closed() {
        let config = BuilderPrimeConfig {
            api_key: Some("k".to_string()),
            ..BuilderPrimeConfig::default()
        };
        assert!(config.check_config().is_err());
    }
}
