use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK_ACCEPTED};
use crate::core::dispatcher::{json_post_as, Auth, DispatchPlan, CONTENT_TYPE_TEXT};
use crate::core::mapper::Schema;
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

/// API key 直接接在路徑後面
pub const ENDPOINT: &str = "https://mygiddyup.com/api/public/integration/zapier/create/";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GiddyUpConfig {
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for GiddyUpConfig {
    fn name(&self) -> &'static str {
        "GiddyUp"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    /// 呼叫端已經使用 GiddyUp 的欄位名稱
    fn schema(&self) -> Result<Schema> {
        Ok(Schema::passthrough())
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("FirstName")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "LastName",
            "HomePhone",
            "CellPhone",
            "WorkPhone",
            "Email",
            "JobSiteAddressLine1",
        ])
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let url = format!("{}{}", self.options.endpoint_or(ENDPOINT), api_key);
        let request = json_post_as(
            &url,
            &record.to_json(),
            &Auth::None,
            CONTENT_TYPE_TEXT,
            context.timeout,
        )?;
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::errors_falsy(STATUS_OK_ACCEPTED),
        ))
    }
}
