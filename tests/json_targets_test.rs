use anyhow::Result;
use httpmock::prelude::*;
use lead_relay::adapters::acculynx::AcculynxConfig;
use lead_relay::adapters::go_high_level::GoHighLevelConfig;
use lead_relay::adapters::hatch::HatchConfig;
use lead_relay::adapters::LeadOptions;
use lead_relay::core::reporter::{EventLevel, MemorySink};
use lead_relay::{LeadRecord, LeadRelay, Reporter, ReqwestTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn relay(sink: Arc<MemorySink>) -> Result<LeadRelay> {
    let transport = ReqwestTransport::new(Duration::from_secs(5))?;
    Ok(LeadRelay::new(Arc::new(transport), Reporter::new(sink, 4)).with_timeout(Duration::from_secs(5)))
}

fn options(endpoint: String) -> LeadOptions {
    LeadOptions {
        endpoint: Some(endpoint),
        ..LeadOptions::default()
    }
}

fn lead() -> LeadRecord {
    LeadRecord::from_pairs([
        ("first_name", json!("Jane")),
        ("last_name", json!("Doe")),
        ("email", json!("jane@example.com")),
        ("phone", json!("(555) 123-4567")),
        ("comments", json!("Kitchen remodel")),
        ("zip", json!("")),
    ])
}

/// Acculynx：Bearer 授權、JSON 內容，預設值補上電話類型與國家
#[tokio::test]
async fn test_acculynx_json_post() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/leads")
            .header("Authorization", "Bearer acc-key")
            .header("Content-Type", "application/json")
            .json_body_partial(
                r#"{"firstName": "Jane", "emailAddress": "jane@example.com", "phoneType1": "Home", "country": "US"}"#,
            );
        then.status(200).json_body(json!({"id": "L-1", "errors": false}));
    });

    let sink = Arc::new(MemorySink::new());
    let config = AcculynxConfig {
        api_key: Some("acc-key".to_string()),
        options: options(server.url("/api/v1/leads")),
    };

    let delivery = relay(sink.clone())?.send(&config, &lead(), None).await;

    mock.assert();
    let delivery = delivery.map_err(|failure| anyhow::anyhow!("{}", failure))?;
    assert_eq!(delivery.target, "Acculynx");
    assert_eq!(delivery.lead, "Jane");
    assert_eq!(sink.count(EventLevel::Success), 1);
    Ok(())
}

/// 回應 200 但 `errors` 為真值時仍視為失敗，且記錄中的敏感欄位被遮蔽
#[tokio::test]
async fn test_acculynx_error_payload_is_failure() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/leads");
        then.status(200).json_body(json!({"errors": ["email is invalid"]}));
    });

    let sink = Arc::new(MemorySink::new());
    let config = AcculynxConfig {
        api_key: Some("acc-key".to_string()),
        options: options(server.url("/leads")),
    };

    let failure = match relay(sink.clone())?.send(&config, &lead(), None).await {
        Ok(_) => anyhow::bail!("expected a failure"),
        Err(failure) => failure,
    };

    mock.assert();
    assert_eq!(failure.status(), Some(200));
    assert_ne!(failure.record.text("emailAddress"), "jane@example.com");
    assert_eq!(failure.record.text("firstName"), "Jane");
    assert_eq!(sink.count(EventLevel::Error), 1);
    Ok(())
}

/// GoHighLevel：自訂欄位放進 `customField` 並移除來源欄位，以 `contact.id` 作為成功依據
#[tokio::test]
async fn test_go_high_level_contact_id() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/contacts/")
            .header("Authorization", "Bearer ghl-key")
            .json_body_partial(
                r#"{"customField": {"roof_age": "12", "site_url": "roofs.example"}, "source": "Public API"}"#,
            )
            .matches(|request| {
                let body: serde_json::Value =
                    serde_json::from_slice(request.body.as_deref().unwrap_or_default()).unwrap_or_default();
                body.get("website").is_none() && body.get("age").is_none()
            });
        then.status(200).json_body(json!({"contact": {"id": "c-99"}}));
    });

    let mut config = GoHighLevelConfig {
        api_key: Some("ghl-key".to_string()),
        options: options(server.url("/v1/contacts/")),
    };
    config.options.custom.insert("roof_age".to_string(), "age".to_string());
    config.options.custom.insert("site_url".to_string(), "website".to_string());

    let mut input = lead();
    input.insert("age", "12");
    input.insert("website", "roofs.example");

    let delivery = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    let delivery = delivery.map_err(|failure| anyhow::anyhow!("{}", failure))?;
    assert_eq!(delivery.reference.as_deref(), Some("c-99"));
    Ok(())
}

#[tokio::test]
async fn test_go_high_level_without_contact_id_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/contacts/");
        then.status(200).json_body(json!({"contact": {}}));
    });

    let config = GoHighLevelConfig {
        api_key: Some("ghl-key".to_string()),
        options: options(server.url("/contacts/")),
    };

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &lead(), None).await;
    assert!(outcome.is_err());
    Ok(())
}

/// Hatch：部門編號代入網址，空值欄位不送出
#[tokio::test]
async fn test_hatch_drops_empty_fields() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/webhooks/D-77/newlead")
            .header("X-API-KEY", "hatch-key")
            .json_body_partial(r#"{"firstName": "Jane", "phoneNumber": "5551234567"}"#)
            .matches(|request| {
                let body = String::from_utf8_lossy(request.body.as_deref().unwrap_or_default());
                !body.contains("\"zip\"")
            });
        then.status(204);
    });

    let config = HatchConfig {
        api_key: Some("hatch-key".to_string()),
        dept_id: Some("D-77".to_string()),
        api_url: Some(server.url("/api/webhooks/{dept_id}/newlead")),
        options: LeadOptions::default(),
    };

    let delivery = relay(Arc::new(MemorySink::new()))?.send(&config, &lead(), None).await;

    mock.assert();
    assert!(delivery.is_ok());
    Ok(())
}
