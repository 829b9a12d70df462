//! 預存程序參數綁定：型別與長度都明確指定，只綁定記錄中存在的欄位。

use crate::domain::model::{is_blank, scalar_text, DispatchResult, LeadRecord};
use crate::domain::ports::{BoundParam, ConnectionSpec, ParamValue, ProcedureExecutor};
use crate::utils::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Int,
    Bit,
}

/// 記錄欄位與程序參數的對應
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub field: &'static str,
    pub name: &'static str,
    pub kind: ParamKind,
    pub max_length: Option<usize>,
    /// 非必要參數在值為空時直接省略
    pub optional: bool,
}

impl ParamSpec {
    pub const fn text(field: &'static str, name: &'static str, max_length: usize) -> Self {
        Self {
            field,
            name,
            kind: ParamKind::Text,
            max_length: Some(max_length),
            optional: false,
        }
    }

    pub const fn int(field: &'static str, name: &'static str) -> Self {
        Self {
            field,
            name,
            kind: ParamKind::Int,
            max_length: None,
            optional: false,
        }
    }

    pub const fn bit(field: &'static str, name: &'static str) -> Self {
        Self {
            field,
            name,
            kind: ParamKind::Bit,
            max_length: None,
            optional: false,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub connection: ConnectionSpec,
    pub procedure: String,
    pub params: Vec<BoundParam>,
}

fn parse_bit(text: &str) -> bool {
    !matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

/// 依參數表綁定記錄；不存在的欄位不綁定，也不會綁成 null
pub fn bind(record: &LeadRecord, specs: &[ParamSpec]) -> Result<Vec<BoundParam>> {
    let mut params = Vec::new();

    for spec in specs {
        let Some(value) = record.get(spec.field) else {
            continue;
        };
        if spec.optional && is_blank(value) {
            continue;
        }

        let text = scalar_text(value);
        let bound = match spec.kind {
            ParamKind::Text => {
                let text = match spec.max_length {
                    Some(max_length) => text.chars().take(max_length).collect(),
                    None => text,
                };
                ParamValue::Text(text)
            }
            ParamKind::Bit => ParamValue::Bit(parse_bit(&text)),
            ParamKind::Int => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let number = trimmed.parse::<i64>().map_err(|_| {
                    RelayError::validation(
                        spec.name,
                        format!("'{}' is not an integer (field {})", trimmed, spec.field),
                    )
                })?;
                ParamValue::Int(number)
            }
        };

        params.push(BoundParam {
            name: spec.name.to_string(),
            value: bound,
            max_length: spec.max_length,
        });
    }

    Ok(params)
}

/// 執行程序呼叫並轉成一般的調度結果
pub async fn execute_call(
    executor: &dyn ProcedureExecutor,
    call: &ProcedureCall,
) -> (DispatchResult, Result<()>) {
    tracing::debug!(
        "🗄️ Executing {} on {} with {} params",
        call.procedure,
        call.connection.server,
        call.params.len()
    );

    match executor
        .execute(&call.connection, &call.procedure, &call.params)
        .await
    {
        Ok(()) => (
            DispatchResult {
                success: true,
                ..DispatchResult::default()
            },
            Ok(()),
        ),
        Err(message) => (
            DispatchResult {
                error: Some(message.clone()),
                ..DispatchResult::default()
            },
            Err(RelayError::transport(message, None)),
        ),
    }
}
