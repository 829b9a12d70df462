//! 轉送引擎：把一筆呼叫端記錄送到單一目標，或同時送到多個目標。
//!
//! 流程：對應 → 移除忽略欄位 → 正規化 → 目標調整 → 測試模式輸出 →
//! 設定檢查 → 驗證 →（僅演練時停止）→ 調度 → 判定 → 回報。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::adapters::{AdapterConfig, LeadAdapter, PlanContext};
use crate::core::dispatcher::dispatch;
use crate::core::mapper::{map, suppress};
use crate::core::normalizer::normalize;
use crate::core::reporter::Reporter;
use crate::domain::model::{Delivery, DispatchResult, FailureDetail, FormContext, LeadRecord};
use crate::domain::ports::{HttpTransport, ProcedureExecutor};
use crate::utils::error::RelayError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// 執行旗標：`test` 印出遮蔽後的記錄，`send` 為 false 時只演練不送出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFlags {
    pub test: bool,
    pub send: bool,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            test: false,
            send: true,
        }
    }
}

/// 多目標轉送時單一目標的結果
#[derive(Debug)]
pub struct TargetOutcome {
    pub name: String,
    pub outcome: Result<Delivery, FailureDetail>,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Clone)]
pub struct LeadRelay {
    transport: Arc<dyn HttpTransport>,
    executor: Option<Arc<dyn ProcedureExecutor>>,
    reporter: Reporter,
    flags: RunFlags,
    timeout: Duration,
}

impl LeadRelay {
    pub fn new(transport: Arc<dyn HttpTransport>, reporter: Reporter) -> Self {
        Self {
            transport,
            executor: None,
            reporter,
            flags: RunFlags::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ProcedureExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_flags(mut self, flags: RunFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn flags(&self) -> RunFlags {
        self.flags
    }

    /// 送出一筆名單；`form` 為 None 時由輸入記錄推導表單資訊
    pub async fn send(
        &self,
        adapter: &dyn LeadAdapter,
        input: &LeadRecord,
        form: Option<&FormContext>,
    ) -> Result<Delivery, FailureDetail> {
        let form = form.cloned().unwrap_or_else(|| FormContext::from_record(input));
        let target = adapter.name();
        let protected = adapter.protected_fields();

        let schema = match adapter.schema() {
            Ok(schema) => schema,
            Err(error) => {
                let lead = form.first_name.clone().unwrap_or_default();
                return Err(self.fail(target, lead, error, self.reporter.redact(input, &protected), None));
            }
        };

        let options = adapter.options();
        let mut record = map(input, &form, &schema, &adapter.custom_fields(), options.delimiter());
        suppress(&mut record, &options.ignore);
        let record = adapter.prepare(normalize(record, &schema));

        let lead = adapter
            .identity_field()
            .and_then(|field| record.non_empty(field))
            .or_else(|| form.first_name.clone())
            .unwrap_or_default();

        if self.flags.test {
            self.reporter.preview(&record, &protected);
        }

        let checked = adapter
            .check_config()
            .and_then(|_| adapter.validate(&record, &schema));
        if let Err(error) = checked {
            return Err(self.fail(target, lead, error, self.reporter.redact(&record, &protected), None));
        }

        if !self.flags.send {
            let delivery = Delivery {
                target: target.to_string(),
                lead,
                reference: None,
                dry_run: true,
            };
            self.reporter.success(&delivery);
            return Ok(delivery);
        }

        let context = PlanContext {
            timeout: options
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(self.timeout),
        };
        let plan = match adapter.plan(&record, &context) {
            Ok(plan) => plan,
            Err(error) => {
                return Err(self.fail(target, lead, error, self.reporter.redact(&record, &protected), None));
            }
        };

        tracing::debug!("🚀 Dispatching to {} via {}", target, plan.variant());
        let outcome = dispatch(plan, self.transport.as_ref(), self.executor.as_deref()).await;

        match outcome.result {
            Ok(reference) => {
                let delivery = Delivery {
                    target: target.to_string(),
                    lead,
                    reference,
                    dry_run: false,
                };
                if let Some(note) = outcome.last.as_ref().and_then(|result| adapter.success_note(result)) {
                    self.reporter.note(&format!("Result: {}", note));
                }
                self.reporter.success(&delivery);
                Ok(delivery)
            }
            Err(error) => Err(self.fail(
                target,
                lead,
                error,
                self.reporter.redact(&record, &protected),
                outcome.last,
            )),
        }
    }

    /// 只回傳是否成功
    pub async fn send_flag(
        &self,
        adapter: &dyn LeadAdapter,
        input: &LeadRecord,
        form: Option<&FormContext>,
    ) -> bool {
        self.send(adapter, input, form).await.is_ok()
    }

    /// 同時送往多個目標，每個目標使用自己的記錄複本；結果依傳入順序排列
    pub async fn fan_out(
        &self,
        targets: Vec<(String, Arc<AdapterConfig>)>,
        input: &LeadRecord,
        form: Option<&FormContext>,
    ) -> Vec<TargetOutcome> {
        let mut tasks = JoinSet::new();
        for (index, (name, config)) in targets.into_iter().enumerate() {
            let relay = self.clone();
            let input = input.clone();
            let form = form.cloned();
            tasks.spawn(async move {
                let outcome = relay.send(config.adapter(), &input, form.as_ref()).await;
                (index, TargetOutcome { name, outcome })
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => outcomes.push(entry),
                Err(e) => tracing::error!("💥 Relay task aborted: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    fn fail(
        &self,
        target: &str,
        lead: String,
        error: RelayError,
        record: LeadRecord,
        dispatch: Option<DispatchResult>,
    ) -> FailureDetail {
        let failure = FailureDetail {
            target: target.to_string(),
            lead,
            error,
            record,
            dispatch,
        };
        self.reporter.failure(&failure);
        failure
    }
}
