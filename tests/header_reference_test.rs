use anyhow::Result;
use httpmock::prelude::*;
use lead_relay::adapters::bath_fitter::BathFitterConfig;
use lead_relay::adapters::LeadOptions;
use lead_relay::core::reporter::MemorySink;
use lead_relay::{LeadRecord, LeadRelay, Reporter, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;

fn config(endpoint: String) -> BathFitterConfig {
    BathFitterConfig {
        api_key: Some("bf-key".to_string()),
        options: LeadOptions {
            endpoint: Some(endpoint),
            ..LeadOptions::default()
        },
    }
}

fn relay() -> Result<LeadRelay> {
    let transport = ReqwestTransport::new(Duration::from_secs(5))?;
    Ok(LeadRelay::new(Arc::new(transport), Reporter::new(Arc::new(MemorySink::new()), 4)))
}

fn lead() -> LeadRecord {
    LeadRecord::from_pairs([
        ("first_name", "Jane"),
        ("last_name", "Doe"),
        ("email", "jane@example.com"),
        ("zip", "30301"),
    ])
}

/// 201 且帶有 ResultID 標頭才算成功，標頭值即為參考編號
#[tokio::test]
async fn test_created_with_result_id() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/leads")
            .header("Authorization", "bf-key")
            .json_body_partial(r#"{"Lead": {"FirstName": "Jane", "Country": "US"}}"#);
        then.status(201).header("ResultID", "BF-1234");
    });

    let delivery = relay()?.send(&config(server.url("/leads")), &lead(), None).await;

    mock.assert();
    let delivery = delivery.map_err(|failure| anyhow::anyhow!("{}", failure))?;
    assert_eq!(delivery.reference.as_deref(), Some("BF-1234"));
    Ok(())
}

#[tokio::test]
async fn test_created_without_result_id_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/leads");
        then.status(201).body("{}");
    });

    let outcome = relay()?.send(&config(server.url("/leads")), &lead(), None).await;
    let failure = match outcome {
        Ok(_) => anyhow::bail!("expected a failure"),
        Err(failure) => failure,
    };
    assert_eq!(failure.status(), Some(201));
    Ok(())
}

#[tokio::test]
async fn test_result_id_with_wrong_status_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/leads");
        then.status(200).header("ResultID", "BF-1234");
    });

    let outcome = relay()?.send(&config(server.url("/leads")), &lead(), None).await;
    assert!(outcome.is_err());
    Ok(())
}

/// 連線失敗也只回報失敗，不會往外拋出
#[tokio::test]
async fn test_unreachable_endpoint_is_reported() -> Result<()> {
    let outcome = relay()?
        .send(&config("http://127.0.0.1:1/leads".to_string()), &lead(), None)
        .await;
    let failure = match outcome {
        Ok(_) => anyhow::bail!("expected a failure"),
        Err(failure) => failure,
    };
    assert!(failure.status().is_none());
    assert!(failure.dispatch.is_some_and(|result| result.transport_failed()));
    Ok(())
}
