use serde::Deserialize;
use serde_json::Value;

use super::{require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::ClassifyRule;
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::Schema;
use crate::core::normalizer::html_escape;
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

/// 表單提交成功時會以 302 轉址
pub const STATUS_OK_REDIRECT: &[u16] = &[200, 302];

/// 轉送到 Wufoo 表單；欄位名稱由呼叫端決定
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WufooConfig {
    pub url: Option<String>,
    /// 需要遮蔽的欄位
    #[serde(default)]
    pub protect: Vec<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for WufooConfig {
    fn name(&self) -> &'static str {
        "Wufoo"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "Wufoo form url", &self.url).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Ok(Schema::passthrough())
    }

    fn identity_field(&self) -> Option<&'static str> {
        None
    }

    fn protected_fields(&self) -> Vec<String> {
        self.protect.clone()
    }

    fn prepare(&self, record: LeadRecord) -> LeadRecord {
        record
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => Value::String(html_escape(text)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let url = require(self.name(), "Wufoo form url", &self.url)?;
        let request = form_post(url, record, false, &Auth::None, context.timeout);
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::status(STATUS_OK_REDIRECT),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_are_escaped() {
        let record = WufooConfig::default().prepare(LeadRecord::from_pairs([
            ("Field1", json!("Tom & Jerry <3")),
            ("Field2", json!(5)),
        ]));
        assert_eq!(record.text("Field1"), "Tom &amp; Jerry &lt;3");
        assert_eq!(record.get("Field2"), Some(&json!(5)));
    }

    #[test]
    fn test_url_missing() {
        let error = WufooConfig::default().check_config().unwrap_err();
        assert!(error.to_string().contains("Wufoo form url is missing"));
    }
}
