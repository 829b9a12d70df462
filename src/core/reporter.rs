//! 結果回報：成功一行、失敗一筆完整脈絡，測試模式下先印出遮蔽後的記錄。

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::core::classifier::sanitize_body;
use crate::domain::model::{Delivery, FailureDetail, LeadRecord};
use crate::domain::ports::EventSink;
use crate::utils::redact::protect;

/// 透過 tracing 輸出的預設實作
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn info(&self, text: &str) {
        tracing::info!("📋 {}", text);
    }

    fn success(&self, text: &str) {
        tracing::info!("✅ {}", text);
    }

    fn error(&self, text: &str, context: Option<&Value>) {
        match context {
            Some(context) => tracing::error!(context = %context, "❌ {}", text),
            None => tracing::error!("❌ {}", text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Success,
    Error,
}

/// 把事件留在記憶體中，方便檢查輸出內容
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(EventLevel, String, Option<Value>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(EventLevel, String, Option<Value>)> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: EventLevel) -> usize {
        self.events()
            .iter()
            .filter(|(event_level, _, _)| *event_level == level)
            .count()
    }

    fn push(&self, level: EventLevel, text: &str, context: Option<&Value>) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, text.to_string(), context.cloned()));
        }
    }
}

impl EventSink for MemorySink {
    fn info(&self, text: &str) {
        self.push(EventLevel::Info, text, None);
    }

    fn success(&self, text: &str) {
        self.push(EventLevel::Success, text, None);
    }

    fn error(&self, text: &str, context: Option<&Value>) {
        self.push(EventLevel::Error, text, context);
    }
}

#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn EventSink>,
    visible_chars: usize,
}

impl Reporter {
    pub fn new(sink: Arc<dyn EventSink>, visible_chars: usize) -> Self {
        Self {
            sink,
            visible_chars,
        }
    }

    pub fn success_line(delivery: &Delivery) -> String {
        let mut line = format!(
            "Lead: \"{}\" | Lead successfully submitted to {}",
            delivery.lead, delivery.target
        );
        if let Some(reference) = &delivery.reference {
            line.push_str(&format!(" (#{})", reference));
        }
        line
    }

    pub fn success(&self, delivery: &Delivery) {
        if delivery.dry_run {
            self.sink.info(&format!(
                "Lead: \"{}\" | Dry run, nothing was sent to {}",
                delivery.lead, delivery.target
            ));
        } else {
            self.sink.success(&Self::success_line(delivery));
        }
    }

    pub fn note(&self, text: &str) {
        self.sink.info(text);
    }

    pub fn redact<S: AsRef<str>>(&self, record: &LeadRecord, protected_fields: &[S]) -> LeadRecord {
        protect(record, self.visible_chars, protected_fields)
    }

    /// 測試模式：送出前以易讀 JSON 印出遮蔽後的記錄
    pub fn preview<S: AsRef<str>>(&self, record: &LeadRecord, protected_fields: &[S]) {
        let protected = self.redact(record, protected_fields);
        match serde_json::to_string_pretty(&protected) {
            Ok(text) => self.sink.info(&text),
            Err(e) => tracing::warn!("⚠️ Could not render test preview: {}", e),
        }
    }

    /// 失敗只產生一筆事件，所有診斷資訊放在 context；記錄在建立失敗細節時已遮蔽
    pub fn failure(&self, failure: &FailureDetail) {
        let dispatch = failure.dispatch.as_ref();
        let context = json!({
            "target": failure.target,
            "lead": failure.lead,
            "record": failure.record.to_json(),
            "result": dispatch.map(|result| sanitize_body(&result.body)),
            "status": failure.status(),
            "error": failure.error.to_string(),
            "transport_error": dispatch.and_then(|result| result.error.clone()),
            "step": failure.step(),
        });
        self.sink.error(
            &format!(
                "Lead: \"{}\" | Unable to submit lead to {}",
                failure.lead, failure.target
            ),
            Some(&context),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DispatchResult;
    use crate::utils::error::RelayError;

    #[test]
    fn test_success_line_with_reference() {
        let delivery = Delivery {
            target: "Bath Fitter".to_string(),
            lead: "Jane".to_string(),
            reference: Some("98765".to_string()),
            dry_run: false,
        };
        assert_eq!(
            Reporter::success_line(&delivery),
            "Lead: \"Jane\" | Lead successfully submitted to Bath Fitter (#98765)"
        );
    }

    #[test]
    fn test_failure_is_one_redacted_event() {
        let sink = Arc::new(MemorySink::new());
        let reporter = Reporter::new(sink.clone(), 4);
        let failure = FailureDetail {
            target: "Acculynx".to_string(),
            lead: "Jane".to_string(),
            error: RelayError::rejected("errors: true"),
            record: reporter.redact(
                &LeadRecord::from_pairs([("firstName", "Jane"), ("phoneNumber1", "5551234567")]),
                &["phoneNumber1"],
            ),
            dispatch: Some(DispatchResult {
                status: Some(200),
                body: "<?php echo 1 ?>".to_string(),
                ..DispatchResult::default()
            }),
        };
        reporter.failure(&failure);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let (level, text, context) = &events[0];
        assert_eq!(*level, EventLevel::Error);
        assert_eq!(text, "Lead: \"Jane\" | Unable to submit lead to Acculynx");
        let context = context.as_ref().unwrap();
        assert_eq!(context["record"]["phoneNumber1"], "******4567");
        assert_eq!(context["status"], 200);
        assert_eq!(context["result"], "<xmp><php echo 1 ></xmp>");
    }
}
