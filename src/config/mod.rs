//! 部署設定：`[relay]` 執行選項與 `[[targets]]` 目標清單。
//!
//! ```toml
//! [relay]
//! test = false
//! send = true
//! die_on_error = true
//!
//! [[targets]]
//! name = "main-crm"
//! kind = "hubspot"
//! portal_id = "3668872"
//! form_id = "${HUBSPOT_FORM_ID}"
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod input;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::AdapterConfig;
use crate::core::relay::RunFlags;
use crate::utils::error::{RelayError, Result};
use crate::utils::redact::DEFAULT_VISIBLE_CHARS;
use crate::utils::validation::{validate_non_empty_string, validate_optional_url, validate_range, Validate};

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default)]
    pub relay: RelaySettings,
    #[serde(default)]
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelaySettings {
    pub test: bool,
    pub send: bool,
    /// 失敗時回傳舊式的 500 回應
    pub die_on_error: bool,
    pub connect_timeout_seconds: u64,
    pub timeout_seconds: u64,
    pub visible_chars: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            test: false,
            send: true,
            die_on_error: true,
            connect_timeout_seconds: 30,
            timeout_seconds: 60,
            visible_chars: DEFAULT_VISIBLE_CHARS,
        }
    }
}

impl RelaySettings {
    pub fn flags(&self) -> RunFlags {
        RunFlags {
            test: self.test,
            send: self.send,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TargetEntry {
    pub name: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub adapter: AdapterConfig,
}

fn enabled_by_default() -> bool {
    true
}

impl TargetEntry {
    /// 未命名時使用目標種類
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.adapter.kind().to_string())
    }
}

impl RelayConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 啟用中的目標；`filter` 可指定名稱或種類
    pub fn enabled_targets(&self, filter: Option<&str>) -> Vec<(String, Arc<AdapterConfig>)> {
        self.targets
            .iter()
            .filter(|entry| entry.enabled)
            .filter(|entry| match filter {
                Some(wanted) => entry.display_name() == wanted || entry.adapter.kind() == wanted,
                None => true,
            })
            .map(|entry| (entry.display_name(), Arc::new(entry.adapter.clone())))
            .collect()
    }
}

/// 替換 `${VAR}`；未設定的變數保持原樣
pub fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        validate_range("relay.connect_timeout_seconds", self.relay.connect_timeout_seconds, 1, 300)?;
        validate_range("relay.timeout_seconds", self.relay.timeout_seconds, 1, 600)?;
        validate_range("relay.visible_chars", self.relay.visible_chars, 0, 64)?;

        if self.targets.is_empty() {
            return Err(RelayError::InvalidConfigValueError {
                field: "targets".to_string(),
                value: "[]".to_string(),
                reason: "At least one target is required".to_string(),
            });
        }

        let mut names = HashSet::new();
        for entry in &self.targets {
            let name = entry.display_name();
            validate_non_empty_string("targets.name", &name)?;
            if !names.insert(name.clone()) {
                return Err(RelayError::InvalidConfigValueError {
                    field: "targets.name".to_string(),
                    value: name,
                    reason: "Target names must be unique".to_string(),
                });
            }
            validate_optional_url(
                &format!("targets.{}.endpoint", name),
                entry.adapter.adapter().options().endpoint.as_deref(),
            )?;
        }
        Ok(())
    }
}
