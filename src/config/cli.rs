use clap::Parser;
use std::path::PathBuf;

use crate::config::RelayConfig;
use crate::core::relay::RunFlags;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::Validate;

#[derive(Debug, Clone, Parser)]
#[command(name = "lead-relay")]
#[command(about = "Forward web-form leads to the configured CRM targets")]
pub struct CliArgs {
    #[arg(long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// JSON 物件或陣列，或 CSV 檔（依副檔名判斷）
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// 只送往指定名稱或種類的目標
    #[arg(long)]
    pub target: Option<String>,

    #[arg(long, help = "Validate and log without sending")]
    pub dry_run: bool,

    #[arg(long, help = "Log the redacted outgoing record")]
    pub test: bool,

    #[arg(long, help = "Report failures without the legacy 500 response")]
    pub no_die: bool,

    #[arg(long, help = "Only load and validate the config file")]
    pub check: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliArgs {
    /// 讀取設定檔並套用命令列覆寫
    pub fn load_config(&self) -> Result<RelayConfig> {
        let mut config = RelayConfig::from_file(&self.config)?;
        if self.dry_run {
            config.relay.send = false;
        }
        if self.test {
            config.relay.test = true;
        }
        if self.no_die {
            config.relay.die_on_error = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn flags(&self, config: &RelayConfig) -> RunFlags {
        config.relay.flags()
    }
}

impl Validate for CliArgs {
    fn validate(&self) -> Result<()> {
        if !self.check && self.input.is_none() {
            return Err(RelayError::InvalidConfigValueError {
                field: "input".to_string(),
                value: String::new(),
                reason: "--input is required unless --check is given".to_string(),
            });
        }
        if let Some(target) = &self.target {
            crate::utils::validation::validate_non_empty_string("target", target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_required_without_check() {
        let args = CliArgs::parse_from(["lead-relay"]);
        assert!(args.validate().is_err());

        let args = CliArgs::parse_from(["lead-relay", "--check"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_overrides_apply_to_loaded_config() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[[targets]]\nkind = \"wufoo\"\nurl = \"https://example.wufoo.com/forms/x\"\n")?;

        let args = CliArgs::parse_from([
            "lead-relay",
            "--config",
            path.to_str().unwrap_or_default(),
            "--dry-run",
            "--no-die",
        ]);
        let config = args.load_config()?;
        assert!(!config.relay.send);
        assert!(!config.relay.die_on_error);
        assert!(!args.flags(&config).send);
        Ok(())
    }
}
