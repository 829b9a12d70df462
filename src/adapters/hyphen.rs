use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{field_list, lenient_string, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, PayloadCheck, STATUS_OK_ACCEPTED};
use crate::core::dispatcher::{json_post, json_post_as, Auth, DispatchPlan, CONTENT_TYPE_TEXT};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::session::{required_text, Session, SessionProtocol, SessionStep};
use crate::domain::model::LeadRecord;
use crate::domain::ports::HttpRequest;
use crate::utils::error::{RelayError, Result};

pub const TOKEN_ENDPOINT: &str =
    "https://api-crm-external.hyphensolutions.com/prod/api/auth/external/token/get";

pub const CREATE_PATH: &str = "/api/auth/external/customers/create";

/// 送出的客戶欄位
const CUSTOMER_FIELDS: [&str; 7] = ["fname", "lname", "email", "phone", "psrc", "grade", "cntm"];

/// `endpoint` 是帳號專屬的 API 位址，建立客戶時必須使用
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HyphenConfig {
    pub username: Option<String>,
    pub api_key: Option<String>,
    #[serde(default, alias = "homeBuilderID", deserialize_with = "lenient_string")]
    pub home_builder_id: Option<String>,
    /// 覆寫取得 token 的位址
    pub token_url: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for HyphenConfig {
    fn name(&self) -> &'static str {
        "Hyphen"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key)?;
        require(self.name(), "Username", &self.username)?;
        require(self.name(), "Endpoint", &self.options.endpoint)?;
        require(self.name(), "Home builder ID", &self.home_builder_id).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("fname")
                .aliases(&["first_name", "firstname"])
                .from(Standard::FirstName),
            FieldSpec::new("lname")
                .aliases(&["last_name", "lastname"])
                .from(Standard::LastName),
            FieldSpec::new("email")
                .aliases(&["email_address"])
                .from(Standard::Email),
            FieldSpec::new("phone")
                .aliases(&["phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("stage").literal("Lead"),
            FieldSpec::new("psrc"),
            FieldSpec::new("grade"),
            FieldSpec::new("cntm"),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("fname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["lname", "phone", "email"])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let exchange = TokenExchange {
            username: require(self.name(), "Username", &self.username)?.to_string(),
            api_key: require(self.name(), "API key", &self.api_key)?.to_string(),
            token_url: self
                .token_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| TOKEN_ENDPOINT.to_string()),
            create_url: format!(
                "{}{}",
                require(self.name(), "Endpoint", &self.options.endpoint)?.trim_end_matches('/'),
                CREATE_PATH
            ),
            home_builder_id: require(self.name(), "Home builder ID", &self.home_builder_id)?.to_string(),
            record: record.clone(),
            timeout: context.timeout,
        };
        Ok(DispatchPlan::Session(Box::new(exchange)))
    }
}

/// 先以帳號與金鑰換取 access token，再以 Bearer 建立客戶；沒有登入與登出步驟
#[derive(Debug, Clone)]
pub struct TokenExchange {
    username: String,
    api_key: String,
    token_url: String,
    create_url: String,
    home_builder_id: String,
    record: LeadRecord,
    timeout: Duration,
}

impl TokenExchange {
    fn body(&self) -> Value {
        let mut customer = serde_json::Map::new();
        for field in CUSTOMER_FIELDS {
            customer.insert(field.to_string(), Value::String(self.record.text(field)));
        }
        customer.insert("stage".to_string(), json!("Lead"));
        customer.insert("noteSub".to_string(), json!("Webhook"));
        customer.insert("hb_id".to_string(), json!(self.home_builder_id));

        json!({
            "customers": [Value::Object(customer)],
            "hb_id": self.home_builder_id,
        })
    }
}

impl SessionProtocol for TokenExchange {
    fn rule(&self, step: SessionStep) -> ClassifyRule {
        match step {
            SessionStep::Create => ClassifyRule::errors_falsy(STATUS_OK_ACCEPTED),
            _ => ClassifyRule::status(STATUS_OK_ACCEPTED).with(PayloadCheck::JsonObject),
        }
    }

    fn challenge(&self) -> Result<HttpRequest> {
        json_post_as(
            &self.token_url,
            &json!({"username": self.username, "key": self.api_key}),
            &Auth::None,
            CONTENT_TYPE_TEXT,
            self.timeout,
        )
        .map(HttpRequest::follow_redirects)
    }

    fn read_challenge(&self, payload: &Value) -> Result<String> {
        required_text(payload, &["code", "access_token"])
    }

    fn login(&self, _token: &str) -> Result<Option<HttpRequest>> {
        Ok(None)
    }

    fn read_login(&self, _token: &str, _payload: &Value) -> Result<Session> {
        Err(RelayError::rejected("token exchange has no login step"))
    }

    fn create(&self, session: &Session) -> Result<HttpRequest> {
        json_post(
            &self.create_url,
            &self.body(),
            &Auth::Bearer(session.token.clone()),
            self.timeout,
        )
        .map(HttpRequest::follow_redirects)
    }

    fn read_create(&self, _payload: &Value) -> Result<Option<String>> {
        Ok(None)
    }

    fn logout(&self, _session: &Session) -> Option<HttpRequest> {
        None
    }
}
