use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, PayloadCheck, STATUS_OK_ACCEPTED};
use crate::core::dispatcher::{form_post, query_get, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::session::{require_success, required_text, Session, SessionProtocol, SessionStep};
use crate::domain::model::LeadRecord;
use crate::domain::ports::HttpRequest;
use crate::utils::error::Result;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MetricWiseConfig {
    pub username: Option<String>,
    /// 例如 `https://api-centralpa.metricwise.net/1.0/webservice.php`
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub access_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

/// 登入用的金鑰：challenge token 與 access key 串接後的 MD5（小寫十六進位）
pub fn access_hash(token: &str, access_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(token.as_bytes());
    hasher.update(access_key.as_bytes());
    hex::encode(hasher.finalize())
}

impl LeadAdapter for MetricWiseConfig {
    fn name(&self) -> &'static str {
        "MetricWise"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "Username", &self.username)?;
        require(self.name(), "API URL", &self.api_url)?;
        require(self.name(), "API key", &self.api_key)?;
        require(self.name(), "Access key", &self.access_key).map(|_| ())
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
                .aliases(&["email_address"])
                .from(Standard::Email),
            FieldSpec::new("phone")
                .aliases(&["phone1", "phone_number"])
                .from(Standard::Phone),
            FieldSpec::new("lane")
                .aliases(&["address", "address1", "streetaddress", "street"])
                .from(Standard::Address),
            FieldSpec::new("city").from(Standard::City),
            FieldSpec::new("state").from(Standard::State),
            FieldSpec::new("code")
                .aliases(&["zip", "zip_code", "postal_code"])
                .from(Standard::Zip),
            FieldSpec::new("description")
                .aliases(&["notes", "comments"])
                .joined()
                .from(Standard::FormInfo),
            FieldSpec::new("leadsource")
                .aliases(&["source"])
                .literal("Internet"),
            FieldSpec::new("leadstatus")
                .aliases(&["status"])
                .literal("Hot"),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["lastname", "phone", "email", "lane"])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let url = match self.options.endpoint.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(endpoint) => endpoint,
            None => require(self.name(), "API URL", &self.api_url)?,
        };
        let session = WebService {
            url: url.to_string(),
            username: require(self.name(), "Username", &self.username)?.to_string(),
            api_key: require(self.name(), "API key", &self.api_key)?.to_string(),
            access_key: require(self.name(), "Access key", &self.access_key)?.to_string(),
            record: record.clone(),
            timeout: context.timeout,
        };
        Ok(DispatchPlan::Session(Box::new(session)))
    }
}

/// challenge → login → create → logout 的 web service 會話
#[derive(Debug, Clone)]
pub struct WebService {
    url: String,
    username: String,
    api_key: String,
    access_key: String,
    record: LeadRecord,
    timeout: Duration,
}

impl WebService {
    fn auth(&self) -> Auth {
        Auth::Header("X-Api-Key", self.api_key.clone())
    }

    fn operation(&self, fields: Vec<(&str, String)>) -> HttpRequest {
        form_post(
            &self.url,
            &LeadRecord::from_pairs(fields),
            false,
            &self.auth(),
            self.timeout,
        )
    }

    /// 建立時的元素：名單加上登入取得的負責人
    fn element(&self, session: &Session) -> Result<String> {
        let mut element = self.record.clone();
        if let Some(user_id) = &session.user_id {
            element.insert("assigned_user_id", user_id.as_str());
        }
        Ok(serde_json::to_string(&element)?)
    }
}

impl SessionProtocol for WebService {
    fn rule(&self, _step: SessionStep) -> ClassifyRule {
        ClassifyRule::status(STATUS_OK_ACCEPTED).with(PayloadCheck::JsonObject)
    }

    fn challenge(&self) -> Result<HttpRequest> {
        query_get(
            &self.url,
            &[
                ("operation", "getchallenge".to_string()),
                ("username", self.username.clone()),
            ],
            &self.auth(),
            self.timeout,
        )
    }

    fn read_challenge(&self, payload: &Value) -> Result<String> {
        require_success(payload)?;
        required_text(payload, &["result", "token"])
    }

    fn login(&self, token: &str) -> Result<Option<HttpRequest>> {
        Ok(Some(self.operation(vec![
            ("operation", "login".to_string()),
            ("username", self.username.clone()),
            ("accessKey", access_hash(token, &self.access_key)),
        ])))
    }

    fn read_login(&self, token: &str, payload: &Value) -> Result<Session> {
        require_success(payload)?;
        Ok(Session {
            token: token.to_string(),
            name: Some(required_text(payload, &["result", "sessionName"])?),
            user_id: Some(required_text(payload, &["result", "userId"])?),
        })
    }

    fn create(&self, session: &Session) -> Result<HttpRequest> {
        Ok(self.operation(vec![
            ("operation", "create".to_string()),
            ("sessionName", session.name.clone().unwrap_or_default()),
            ("elementType", "Leads".to_string()),
            ("element", self.element(session)?),
        ]))
    }

    fn read_create(&self, payload: &Value) -> Result<Option<String>> {
        require_success(payload)?;
        Ok(payload
            .get("result")
            .and_then(|result| result.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn logout(&self, session: &Session) -> Option<HttpRequest> {
        let name = session.name.clone()?;
        Some(self.operation(vec![
            ("operation", "logout".to_string()),
            ("sessionName", name),
        ]))
    }
}
