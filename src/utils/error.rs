use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error ({target}): {message}")]
    ConfigError { target: String, message: String },

    #[error("Validation error ({target}): {message}")]
    ValidationError { target: String, message: String },

    #[error("Transport error: {message}")]
    TransportError {
        message: String,
        status: Option<u16>,
    },

    #[error("Response rejected: {message}")]
    ResponseError { message: String },

    #[error("Session step {step} failed: {source}")]
    PartialSequenceError {
        step: u8,
        #[source]
        source: Box<RelayError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，對應轉送流程中的各個階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Transport,
    Response,
    Sequence,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RelayError {
    pub fn config(target: impl Into<String>, message: impl Into<String>) -> Self {
        RelayError::ConfigError {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn validation(target: impl Into<String>, message: impl Into<String>) -> Self {
        RelayError::ValidationError {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        RelayError::TransportError {
            message: message.into(),
            status,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        RelayError::ResponseError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::ConfigError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::TomlError(_) => ErrorCategory::Configuration,
            RelayError::ValidationError { .. } => ErrorCategory::Validation,
            RelayError::TransportError { .. } => ErrorCategory::Transport,
            RelayError::ResponseError { .. } => ErrorCategory::Response,
            RelayError::PartialSequenceError { .. } => ErrorCategory::Sequence,
            RelayError::IoError(_) | RelayError::SerializationError(_) | RelayError::CsvError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Transport | ErrorCategory::Response | ErrorCategory::Sequence => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否在發出任何網路請求之前就被偵測到
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Validation
        )
    }

    /// 會話流程中失敗的步驟（非會話錯誤為 None）
    pub fn failed_step(&self) -> Option<u8> {
        match self {
            RelayError::PartialSequenceError { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RelayError::TransportError { status, .. } => *status,
            RelayError::PartialSequenceError { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RelayError::ConfigError { target, message } => {
                format!("{} is not configured correctly: {}", target, message)
            }
            RelayError::ValidationError { target, message } => {
                format!("Lead cannot be sent to {}: {}", target, message)
            }
            RelayError::TransportError { message, .. } => {
                format!("The CRM endpoint could not be reached: {}", message)
            }
            RelayError::ResponseError { message } => {
                format!("The CRM refused the lead: {}", message)
            }
            RelayError::PartialSequenceError { step, source } => {
                format!("Session step {} failed: {}", step, source.user_friendly_message())
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "檢查 relay.toml 中該目標的憑證與端點設定",
            ErrorCategory::Validation => "確認表單有送出目標要求的欄位，或調整 custom 欄位對應",
            ErrorCategory::Transport => "確認網路連線與端點是否可用，稍後由呼叫端重試",
            ErrorCategory::Response => "檢查 CRM 回應內容，通常是欄位值不被接受",
            ErrorCategory::Sequence => "檢查登入憑證（username / access_key）是否仍然有效",
            ErrorCategory::System => "檢查輸入檔案格式與檔案權限",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
