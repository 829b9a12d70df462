//! 舊式同步呼叫端：把轉送結果轉成 HTTP 500 回應。

use crate::domain::model::{Delivery, FailureDetail};

pub const LEGACY_STATUS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyResponse {
    pub status: u16,
    pub body: String,
}

impl LegacyResponse {
    pub fn from_failure(failure: &FailureDetail) -> Self {
        let status = failure.status().map(|s| s.to_string()).unwrap_or_default();
        let error = failure
            .dispatch
            .as_ref()
            .and_then(|result| result.error.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| failure.error.to_string());

        Self {
            status: LEGACY_STATUS,
            body: format!(
                "Error: Unable to submit lead to {}\n\n{}\n\n{}\n\n",
                failure.target, status, error
            ),
        }
    }
}

/// 回傳布林結果；`die_on_error` 時失敗另外附上 500 回應
pub fn respond(
    result: &Result<Delivery, FailureDetail>,
    die_on_error: bool,
) -> (bool, Option<LegacyResponse>) {
    match result {
        Ok(_) => (true, None),
        Err(failure) if die_on_error => (false, Some(LegacyResponse::from_failure(failure))),
        Err(_) => (false, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DispatchResult, LeadRecord};
    use crate::utils::error::RelayError;

    fn failure(dispatch: Option<DispatchResult>) -> FailureDetail {
        FailureDetail {
            target: "Zoho".to_string(),
            lead: "Jane".to_string(),
            error: RelayError::rejected("status 400"),
            record: LeadRecord::new(),
            dispatch,
        }
    }

    #[test]
    fn test_body_lists_status_and_error() {
        let response = LegacyResponse::from_failure(&failure(Some(DispatchResult {
            status: Some(400),
            ..DispatchResult::default()
        })));
        assert_eq!(response.status, 500);
        assert_eq!(
            response.body,
            "Error: Unable to submit lead to Zoho\n\n400\n\nResponse rejected: status 400\n\n"
        );
    }

    #[test]
    fn test_transport_error_wins_over_classification() {
        let response = LegacyResponse::from_failure(&failure(Some(DispatchResult {
            error: Some("connection refused".to_string()),
            ..DispatchResult::default()
        })));
        assert!(response.body.ends_with("\n\n\n\nconnection refused\n\n"));
    }

    #[test]
    fn test_respond_only_dies_when_asked() {
        let failed: Result<Delivery, FailureDetail> = Err(failure(None));
        assert_eq!(respond(&failed, false), (false, None));
        let (ok, response) = respond(&failed, true);
        assert!(!ok);
        assert!(response.is_some());

        let delivered: Result<Delivery, FailureDetail> = Ok(Delivery {
            target: "Zoho".to_string(),
            lead: "Jane".to_string(),
            reference: None,
            dry_run: false,
        });
        assert_eq!(respond(&delivered, true), (true, None));
    }
}
