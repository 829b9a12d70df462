//! 多步驟會話 RPC 的有限狀態機。
//!
//! 狀態依序為 Unauthenticated → Authenticated(session) → Completed，
//! 任何一步失敗即進入 Failed(step)，之後的步驟都不會送出。
//! 登出在成功路徑上嘗試一次，失敗不影響結果。

use serde_json::Value;

use crate::core::classifier::{evaluate, payload_message, ClassifyRule};
use crate::domain::model::{is_blank, scalar_text, DispatchResult};
use crate::domain::ports::{HttpRequest, HttpTransport};
use crate::utils::error::{RelayError, Result};

/// 登入後取得的會話資訊
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// 第一步取得的 challenge 或 access token
    pub token: String,
    pub name: Option<String>,
    pub user_id: Option<String>,
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Challenge,
    Login,
    Create,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Session),
    Completed(Option<String>),
    Failed(u8),
}

/// 會話協定：描述每一步的請求與如何解讀其回應
///
/// `login` 與 `logout` 回傳 None 表示該協定沒有這一步（例如單純的 token 交換）。
pub trait SessionProtocol: Send + Sync {
    fn rule(&self, step: SessionStep) -> ClassifyRule;

    fn challenge(&self) -> Result<HttpRequest>;

    fn read_challenge(&self, payload: &Value) -> Result<String>;

    fn login(&self, token: &str) -> Result<Option<HttpRequest>>;

    fn read_login(&self, token: &str, payload: &Value) -> Result<Session>;

    fn create(&self, session: &Session) -> Result<HttpRequest>;

    /// 回傳擷取到的結果編號（若有）
    fn read_create(&self, payload: &Value) -> Result<Option<String>>;

    fn logout(&self, session: &Session) -> Option<HttpRequest>;
}

/// 依 `a.b.c` 路徑取出非空字串值
pub fn required_text(payload: &Value, path: &[&str]) -> Result<String> {
    path.iter()
        .try_fold(payload, |current, segment| current.get(*segment))
        .filter(|value| !is_blank(value))
        .map(scalar_text)
        .ok_or_else(|| {
            RelayError::rejected(
                payload_message(payload).unwrap_or_else(|| format!("missing '{}'", path.join("."))),
            )
        })
}

/// 要求 `success` 欄位為真
pub fn require_success(payload: &Value) -> Result<()> {
    match payload.get("success") {
        Some(flag) if !is_blank(flag) => Ok(()),
        _ => Err(RelayError::rejected(
            payload_message(payload).unwrap_or_else(|| "success flag not set".to_string()),
        )),
    }
}

/// 會話執行結果
#[derive(Debug)]
pub struct SessionReport {
    pub state: SessionState,
    pub last: Option<DispatchResult>,
    pub result: Result<Option<String>>,
    /// 實際送出的請求數（不含登出）
    pub steps_sent: u8,
}

struct Machine<'a> {
    protocol: &'a dyn SessionProtocol,
    transport: &'a dyn HttpTransport,
    step: u8,
    last: Option<DispatchResult>,
    error: Option<RelayError>,
}

impl<'a> Machine<'a> {
    /// 送出一步並判定；回應內容交給協定解讀
    async fn exchange(&mut self, step: SessionStep, request: HttpRequest) -> Result<Value> {
        self.step += 1;
        tracing::debug!("🔐 Session step {} ({:?}): {}", self.step, step, request.url);

        let response = self.transport.send(request).await;
        let (result, verdict) = evaluate(response, &self.protocol.rule(step));
        let payload = result.payload.clone().unwrap_or(Value::Null);
        self.last = Some(result);

        match verdict.error {
            Some(error) => Err(error),
            None if verdict.success => Ok(payload),
            None => Err(RelayError::rejected("step did not satisfy the success rule")),
        }
    }

    /// 記下失敗原因並轉入 Failed(step)
    fn fail(&mut self, error: RelayError) -> SessionState {
        let step = self.step.max(1);
        tracing::debug!("❌ Session failed at step {}: {}", step, error);
        self.error = Some(error);
        SessionState::Failed(step)
    }

    fn completed(self, reference: Option<String>) -> SessionReport {
        SessionReport {
            state: SessionState::Completed(reference.clone()),
            last: self.last,
            result: Ok(reference),
            steps_sent: self.step,
        }
    }

    fn failed(self, step: u8) -> SessionReport {
        let error = self
            .error
            .unwrap_or_else(|| RelayError::rejected("session failed"));
        SessionReport {
            state: SessionState::Failed(step),
            last: self.last,
            result: Err(RelayError::PartialSequenceError {
                step,
                source: Box::new(error),
            }),
            steps_sent: self.step,
        }
    }

    async fn authenticate(&mut self) -> Result<Session> {
        let request = self.protocol.challenge()?;
        let payload = self.exchange(SessionStep::Challenge, request).await?;
        let token = self.protocol.read_challenge(&payload)?;

        match self.protocol.login(&token)? {
            Some(request) => {
                let payload = self.exchange(SessionStep::Login, request).await?;
                self.protocol.read_login(&token, &payload)
            }
            None => Ok(Session::from_token(token)),
        }
    }

    async fn create(&mut self, session: &Session) -> Result<Option<String>> {
        let request = self.protocol.create(session)?;
        let payload = self.exchange(SessionStep::Create, request).await?;
        self.protocol.read_create(&payload)
    }
}

/// 依序執行會話流程；每一步都在前一步判定完成後才建立
pub async fn run_session(
    protocol: &dyn SessionProtocol,
    transport: &dyn HttpTransport,
) -> SessionReport {
    let mut machine = Machine {
        protocol,
        transport,
        step: 0,
        last: None,
        error: None,
    };

    let mut state = SessionState::Unauthenticated;
    loop {
        state = match state {
            SessionState::Unauthenticated => match machine.authenticate().await {
                Ok(session) => SessionState::Authenticated(session),
                Err(error) => machine.fail(error),
            },
            SessionState::Authenticated(session) => match machine.create(&session).await {
                Ok(reference) => {
                    if let Some(request) = protocol.logout(&session) {
                        let response = transport.send(request).await;
                        tracing::debug!("👋 Logout status: {:?}", response.status);
                    }
                    SessionState::Completed(reference)
                }
                Err(error) => machine.fail(error),
            },
            SessionState::Completed(reference) => return machine.completed(reference),
            SessionState::Failed(step) => return machine.failed(step),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{PayloadCheck, STATUS_OK_ACCEPTED};
    use crate::domain::ports::TransportResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<Vec<TransportResponse>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(bodies: Vec<(u16, Value)>) -> Self {
            let responses = bodies
                .into_iter()
                .rev()
                .map(|(status, body)| TransportResponse {
                    status: Some(status),
                    body: body.to_string(),
                    ..TransportResponse::default()
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> TransportResponse {
            self.seen.lock().unwrap().push(request.url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| TransportResponse::failed("no scripted response"))
        }
    }

    struct FourStep;

    impl SessionProtocol for FourStep {
        fn rule(&self, _step: SessionStep) -> ClassifyRule {
            ClassifyRule::status(STATUS_OK_ACCEPTED).with(PayloadCheck::JsonObject)
        }

        fn challenge(&self) -> Result<HttpRequest> {
            Ok(HttpRequest::get("http://crm/challenge"))
        }

        fn read_challenge(&self, payload: &Value) -> Result<String> {
            require_success(payload)?;
            required_text(payload, &["result", "token"])
        }

        fn login(&self, token: &str) -> Result<Option<HttpRequest>> {
            Ok(Some(HttpRequest::post("http://crm/login", token)))
        }

        fn read_login(&self, token: &str, payload: &Value) -> Result<Session> {
            require_success(payload)?;
            Ok(Session {
                token: token.to_string(),
                name: Some(required_text(payload, &["result", "sessionName"])?),
                user_id: None,
            })
        }

        fn create(&self, session: &Session) -> Result<HttpRequest> {
            Ok(HttpRequest::post("http://crm/create", session.name.clone().unwrap_or_default()))
        }

        fn read_create(&self, payload: &Value) -> Result<Option<String>> {
            require_success(payload)?;
            Ok(payload.pointer("/result/id").map(scalar_text))
        }

        fn logout(&self, _session: &Session) -> Option<HttpRequest> {
            Some(HttpRequest::post("http://crm/logout", ""))
        }
    }

    #[tokio::test]
    async fn test_full_sequence_completes_and_logs_out() {
        let transport = ScriptedTransport::new(vec![
            (200, json!({"success": true, "result": {"token": "t1"}})),
            (200, json!({"success": true, "result": {"sessionName": "s1"}})),
            (200, json!({"success": true, "result": {"id": "10x55"}})),
            (500, json!({})),
        ]);
        let report = run_session(&FourStep, &transport).await;

        assert_eq!(report.state, SessionState::Completed(Some("10x55".to_string())));
        assert_eq!(report.result.unwrap(), Some("10x55".to_string()));
        assert_eq!(report.steps_sent, 3);
        assert_eq!(transport.seen().len(), 4);
    }

    #[tokio::test]
    async fn test_step_one_failure_stops_everything() {
        let transport = ScriptedTransport::new(vec![(
            200,
            json!({"success": false, "error": {"message": "Invalid username"}}),
        )]);
        let report = run_session(&FourStep, &transport).await;

        assert_eq!(report.state, SessionState::Failed(1));
        let error = report.result.unwrap_err();
        assert_eq!(error.failed_step(), Some(1));
        assert!(error.to_string().contains("Invalid username"));
        assert_eq!(transport.seen(), vec!["http://crm/challenge".to_string()]);
    }

    #[tokio::test]
    async fn test_create_failure_reports_step_three_without_logout() {
        let transport = ScriptedTransport::new(vec![
            (200, json!({"success": true, "result": {"token": "t1"}})),
            (200, json!({"success": true, "result": {"sessionName": "s1"}})),
            (200, json!({"success": false, "error": {"message": "Mandatory fields not present"}})),
        ]);
        let report = run_session(&FourStep, &transport).await;

        assert_eq!(report.state, SessionState::Failed(3));
        assert_eq!(transport.seen().len(), 3);
        assert!(report.last.is_some());
    }

    #[tokio::test]
    async fn test_transport_error_on_login_is_step_two() {
        let transport = ScriptedTransport::new(vec![(
            200,
            json!({"success": true, "result": {"token": "t1"}}),
        )]);
        let report = run_session(&FourStep, &transport).await;
        assert_eq!(report.state, SessionState::Failed(2));
        assert_eq!(report.result.unwrap_err().failed_step(), Some(2));
    }
}
