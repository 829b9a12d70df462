use serde::Deserialize;

use super::{field_list, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, STATUS_OK};
use crate::core::dispatcher::{query_get, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::domain::model::{scalar_text, LeadRecord};
use crate::utils::error::{RelayError, Result};

pub const ENDPOINT: &str = "https://ha.marketsharpm.com/LeadCapture/MarketSharp/LeadCapture.ashx";

/// `info` 參數內每組 `key=value` 之後的分隔
const INFO_SEPARATOR: &str = "&|&";

/// 公司、來源等識別值都在名單欄位裡（MSM_coy / MSM_source / MSM_formId），
/// 部署設定只需要 custom 與連接字串
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MarketSharpConfig {
    #[serde(flatten)]
    pub options: LeadOptions,
}

/// 整筆記錄編成 `info` 參數
pub fn info_param(record: &LeadRecord) -> String {
    record
        .iter()
        .map(|(key, value)| format!("{}={}{}", key, scalar_text(value), INFO_SEPARATOR))
        .collect()
}

impl LeadAdapter for MarketSharpConfig {
    fn name(&self) -> &'static str {
        "MarketSharp"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        Ok(())
    }

    fn schema(&self) -> Result<Schema> {
        let field = |name: &str, aliases: &[&str]| FieldSpec::new(name).aliases(aliases).keep_empty();
        let phone = |name: &str, aliases: &[&str]| {
            field(name, aliases).transform(Transform::Digits(DigitKeep::First(10)))
        };

        Schema::new(vec![
            field("MSM_firstname", &["firstname", "first_name"]).from(Standard::FirstName),
            field("MSM_lastname", &["lastname", "last_name"]).from(Standard::LastName),
            field("MSM_email", &["email1", "email"]).from(Standard::Email),
            phone("MSM_homephone", &["phone1", "phone"]).from(Standard::Phone),
            phone("MSM_cellphone", &["cell", "cellphone", "cell_phone"]),
            phone("MSM_workphone", &["workphone", "work_phone"]),
            field("MSM_address1", &["address1", "address"]).from(Standard::Address),
            field("MSM_address2", &["address2"]),
            field("MSM_city", &["city"]).from(Standard::City),
            field("MSM_state", &["state"]).from(Standard::State),
            field("MSM_zip", &["zip", "zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(Transform::PostalCode(5)),
            field("MSM_custom_Interests", &["notes"])
                .joined()
                .from(Standard::FormInfo),
            field("MSM_custom_Best_Time_To_Reach", &["best_time"]),
            field("MSM_coy", &["coy"]),
            field("MSM_source", &["formsource"]),
            field("MSM_formId", &["formid"]),
            field("MSM_leadCaptureName", &["capturename", "type"]),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("MSM_firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&[
            "MSM_lastname",
            "MSM_homephone",
            "MSM_cellphone",
            "MSM_workphone",
            "MSM_email",
            "MSM_address1",
            "MSM_address2",
        ])
    }

    /// 來源與表單編號缺一時互相補上
    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        let source = record.non_empty("MSM_source");
        let form_id = record.non_empty("MSM_formId");
        match (source, form_id) {
            (None, Some(form_id)) => {
                record.insert("MSM_source", form_id);
            }
            (Some(source), None) => {
                record.insert("MSM_formId", source);
            }
            _ => {}
        }
        record
    }

    fn validate(&self, record: &LeadRecord, _schema: &Schema) -> Result<()> {
        for field in ["MSM_coy", "MSM_source", "MSM_formId"] {
            if !record.is_filled(field) {
                return Err(RelayError::validation(self.name(), format!("{} is missing", field)));
            }
        }
        if record.text("MSM_source") != record.text("MSM_formId") {
            return Err(RelayError::validation(
                self.name(),
                "MSM_source must match MSM_formId",
            ));
        }
        Ok(())
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let request = query_get(
            &self.options.endpoint_or(ENDPOINT),
            &[
                ("callback", "jsonp".to_string()),
                ("info", info_param(record)),
                ("version", "2".to_string()),
            ],
            &Auth::None,
            context.timeout,
        )?
        .follow_redirects();
        Ok(DispatchPlan::single(request, ClassifyRule::status(STATUS_OK)))
    }
}
