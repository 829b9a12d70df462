//! 各目標 CRM 的轉接器與 reqwest 傳輸實作。
//!
//! 每個目標是一個設定結構，實作 [`LeadAdapter`]：欄位表、必要設定檢查、
//! 目標專屬的調整、驗證與調度計畫。設定以 `kind` 標記的 [`AdapterConfig`] 表示。

use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::core::dispatcher::DispatchPlan;
use crate::core::mapper::{CustomFieldMap, Schema, DEFAULT_JOIN_DELIMITER};
use crate::domain::model::{DispatchResult, LeadRecord};
use crate::utils::error::{RelayError, Result};

pub mod http;

pub mod acculynx;
pub mod bath_fitter;
pub mod builder_prime;
pub mod builder_trend;
pub mod enabled_plus;
pub mod giddy_up;
pub mod go_high_level;
pub mod hatch;
pub mod hubspot;
pub mod hyphen;
pub mod improveit360;
pub mod job_nimbus;
pub mod lead_perfection;
pub mod malimar;
pub mod market_sharp;
pub mod metric_wise;
pub mod nutshell;
pub mod salesforce;
pub mod wufoo;
pub mod zoho;

/// 所有目標共用的部署選項
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LeadOptions {
    /// 目標欄位 → 呼叫端欄位
    #[serde(default)]
    pub custom: CustomFieldMap,
    /// 對應完成後移除的欄位
    #[serde(default)]
    pub ignore: Vec<String>,
    /// 多來源文字欄位的連接字串
    #[serde(default, alias = "notes")]
    pub delimiter: Option<String>,
    /// 覆寫目標預設的端點
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl LeadOptions {
    pub fn delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or(DEFAULT_JOIN_DELIMITER)
    }

    /// 設定的端點優先，否則使用目標預設值
    pub fn endpoint_or(&self, default: &str) -> String {
        self.endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    }
}

/// 調度時的執行參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanContext {
    pub timeout: Duration,
}

impl Default for PlanContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// 允許數字形式的識別碼（例如 `portal_id = 123`）
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Int(number) => number.to_string(),
        Raw::Float(number) => number.to_string(),
    }))
}

pub fn field_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// 必要設定值：缺少或空白時回傳 ConfigError
pub fn require<'a>(target: &str, field: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RelayError::config(target, format!("{} is missing", field)))
}

/// 目標轉接器
pub trait LeadAdapter: Send + Sync {
    /// 顯示用名稱，出現在成功/失敗訊息中
    fn name(&self) -> &'static str;

    fn options(&self) -> &LeadOptions;

    /// 任何必要設定缺漏都必須拒絕送出
    fn check_config(&self) -> Result<()>;

    fn schema(&self) -> Result<Schema>;

    /// 實際套用的 custom 對應；部分目標會改寫欄位名稱
    fn custom_fields(&self) -> CustomFieldMap {
        self.options().custom.clone()
    }

    /// 用來識別名單的欄位（通常是名字）；None 時使用表單上的名字
    fn identity_field(&self) -> Option<&'static str>;

    /// 記錄輸出時需要遮蔽的欄位
    fn protected_fields(&self) -> Vec<String>;

    /// 正規化之後、驗證之前的目標專屬調整
    fn prepare(&self, record: LeadRecord) -> LeadRecord {
        record
    }

    fn validate(&self, record: &LeadRecord, schema: &Schema) -> Result<()> {
        for field in schema.required_fields() {
            if !record.is_filled(&field.name) {
                return Err(RelayError::validation(
                    self.name(),
                    format!("{} is missing", field.name),
                ));
            }
        }
        Ok(())
    }

    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan>;

    /// 成功時額外記錄的回應摘要
    fn success_note(&self, _result: &DispatchResult) -> Option<String> {
        None
    }
}

/// 以 `kind` 標記的目標設定
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterConfig {
    Acculynx(acculynx::AcculynxConfig),
    BathFitter(bath_fitter::BathFitterConfig),
    BuilderPrime(builder_prime::BuilderPrimeConfig),
    BuilderTrend(builder_trend::BuilderTrendConfig),
    EnabledPlus(enabled_plus::EnabledPlusConfig),
    GiddyUp(giddy_up::GiddyUpConfig),
    GoHighLevel(go_high_level::GoHighLevelConfig),
    Hatch(hatch::HatchConfig),
    Hubspot(hubspot::HubspotConfig),
    Hyphen(hyphen::HyphenConfig),
    Improveit360(improveit360::Improveit360Config),
    JobNimbus(job_nimbus::JobNimbusConfig),
    LeadPerfection(lead_perfection::LeadPerfectionConfig),
    Malimar(malimar::MalimarConfig),
    MarketSharp(market_sharp::MarketSharpConfig),
    MetricWise(metric_wise::MetricWiseConfig),
    Nutshell(nutshell::NutshellConfig),
    Salesforce(salesforce::SalesforceConfig),
    Wufoo(wufoo::WufooConfig),
    Zoho(zoho::ZohoConfig),
}

impl AdapterConfig {
    pub fn adapter(&self) -> &dyn LeadAdapter {
        match self {
            AdapterConfig::Acculynx(config) => config,
            AdapterConfig::BathFitter(config) => config,
            AdapterConfig::BuilderPrime(config) => config,
            AdapterConfig::BuilderTrend(config) => config,
            AdapterConfig::EnabledPlus(config) => config,
            AdapterConfig::GiddyUp(config) => config,
            AdapterConfig::GoHighLevel(config) => config,
            AdapterConfig::Hatch(config) => config,
            AdapterConfig::Hubspot(config) => config,
            AdapterConfig::Hyphen(config) => config,
            AdapterConfig::Improveit360(config) => config,
            AdapterConfig::JobNimbus(config) => config,
            AdapterConfig::LeadPerfection(config) => config,
            AdapterConfig::Malimar(config) => config,
            AdapterConfig::MarketSharp(config) => config,
            AdapterConfig::MetricWise(config) => config,
            AdapterConfig::Nutshell(config) => config,
            AdapterConfig::Salesforce(config) => config,
            AdapterConfig::Wufoo(config) => config,
            AdapterConfig::Zoho(config) => config,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AdapterConfig::Acculynx(_) => "acculynx",
            AdapterConfig::BathFitter(_) => "bath_fitter",
            AdapterConfig::BuilderPrime(_) => "builder_prime",
            AdapterConfig::BuilderTrend(_) => "builder_trend",
            AdapterConfig::EnabledPlus(_) => "enabled_plus",
            AdapterConfig::GiddyUp(_) => "giddy_up",
            AdapterConfig::GoHighLevel(_) => "go_high_level",
            AdapterConfig::Hatch(_) => "hatch",
            AdapterConfig::Hubspot(_) => "hubspot",
            AdapterConfig::Hyphen(_) => "hyphen",
            AdapterConfig::Improveit360(_) => "improveit360",
            AdapterConfig::JobNimbus(_) => "job_nimbus",
            AdapterConfig::LeadPerfection(_) => "lead_perfection",
            AdapterConfig::Malimar(_) => "malimar",
            AdapterConfig::MarketSharp(_) => "market_sharp",
            AdapterConfig::MetricWise(_) => "metric_wise",
            AdapterConfig::Nutshell(_) => "nutshell",
            AdapterConfig::Salesforce(_) => "salesforce",
            AdapterConfig::Wufoo(_) => "wufoo",
            AdapterConfig::Zoho(_) => "zoho",
        }
    }
}
