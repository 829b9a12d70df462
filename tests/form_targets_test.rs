use anyhow::Result;
use httpmock::prelude::*;
use lead_relay::adapters::builder_trend::BuilderTrendConfig;
use lead_relay::adapters::hubspot::HubspotConfig;
use lead_relay::adapters::wufoo::WufooConfig;
use lead_relay::adapters::zoho::ZohoConfig;
use lead_relay::adapters::LeadOptions;
use lead_relay::core::reporter::{EventLevel, MemorySink};
use lead_relay::{respond, LeadRecord, LeadRelay, Reporter, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;

fn relay(sink: Arc<MemorySink>) -> Result<LeadRelay> {
    let transport = ReqwestTransport::new(Duration::from_secs(5))?;
    Ok(LeadRelay::new(Arc::new(transport), Reporter::new(sink, 4)))
}

fn options(endpoint: String) -> LeadOptions {
    LeadOptions {
        endpoint: Some(endpoint),
        ..LeadOptions::default()
    }
}

/// HubSpot：網址帶入 portal 與 form，空值欄位不送出，電話只留數字
#[tokio::test]
async fn test_hubspot_form_post() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/forms/3668872/4ef91f1a")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body_contains("firstname=Jane")
            .body_contains("phone=5551234567")
            .body_contains("zip_code=02139")
            .body_contains("source_type=Website")
            .matches(|request| {
                let body = String::from_utf8_lossy(request.body.as_deref().unwrap_or_default());
                !body.contains("address=")
            });
        then.status(204);
    });

    let config = HubspotConfig {
        portal_id: Some("3668872".to_string()),
        form_id: Some("4ef91f1a".to_string()),
        options: options(server.url("/forms")),
    };
    let input = LeadRecord::from_pairs([
        ("first_name", "Jane"),
        ("phone", "555.123.4567"),
        ("zip", "02139-4307"),
        ("address", ""),
    ]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    assert!(outcome.is_ok());
    Ok(())
}

/// Zoho：缺少隱藏欄位時在送出前就失敗，也不會連線
#[tokio::test]
async fn test_zoho_missing_hidden_fields_never_posts() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/crm/WebToLeadForm");
        then.status(200);
    });

    let sink = Arc::new(MemorySink::new());
    let config = ZohoConfig {
        options: options(server.url("/crm/WebToLeadForm")),
    };
    let input = LeadRecord::from_pairs([("first_name", "Jane"), ("xn", "abc")]);

    let outcome = relay(sink.clone())?.send(&config, &input, None).await;

    assert_eq!(mock.hits(), 0);
    let (ok, response) = respond(&outcome, true);
    assert!(!ok);
    let response = response.ok_or_else(|| anyhow::anyhow!("expected a legacy response"))?;
    assert_eq!(response.status, 500);
    assert!(response.body.starts_with("Error: Unable to submit lead to Zoho\n\n"));
    assert!(response.body.contains("xmIwtLD is missing"));
    assert_eq!(sink.count(EventLevel::Error), 1);
    Ok(())
}

/// Zoho：欄位名稱含空白，空值欄位照樣送出
#[tokio::test]
async fn test_zoho_posts_keep_empty_fields() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/crm/WebToLeadForm")
            .body_contains("First+Name=Jane")
            .body_contains("Company=&")
            .body_contains("xnQsjsdp=abc")
            .body_contains("xmIwtLD=def");
        then.status(200).body("<html>Thank you</html>");
    });

    let config = ZohoConfig {
        options: options(server.url("/crm/WebToLeadForm")),
    };
    let input = LeadRecord::from_pairs([("first_name", "Jane"), ("xn", "abc"), ("xm", "def")]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    assert_eq!(respond(&outcome, true), (true, None));
    Ok(())
}

/// Wufoo：記錄原樣轉送，字串值做 HTML 跳脫
#[tokio::test]
async fn test_wufoo_passthrough_escapes_values() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/forms/contact")
            .body_contains("Field1=Jane")
            .body_contains("Field9=Tom+%26amp%3B+Jerry");
        then.status(200);
    });

    let config = WufooConfig {
        url: Some(server.url("/forms/contact")),
        protect: vec!["Field2".to_string()],
        options: LeadOptions::default(),
    };
    let input = LeadRecord::from_pairs([("Field1", "Jane"), ("Field2", "Doe"), ("Field9", "Tom & Jerry")]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    assert!(outcome.is_ok());
    Ok(())
}

/// Wufoo：302 也算成功，且不會跟著轉址
#[tokio::test]
async fn test_wufoo_redirect_counts_as_success() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/forms/contact");
        then.status(302).header("Location", "/confirm");
    });
    let confirm = server.mock(|when, then| {
        when.path("/confirm");
        then.status(200);
    });

    let config = WufooConfig {
        url: Some(server.url("/forms/contact")),
        protect: Vec::new(),
        options: LeadOptions::default(),
    };
    let input = LeadRecord::from_pairs([("Field1", "Jane")]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    assert_eq!(confirm.hits(), 0);
    let delivery = outcome.map_err(|failure| anyhow::anyhow!("{}", failure))?;
    assert_eq!(delivery.target, "Wufoo");
    Ok(())
}

/// HubSpot 只接受 204，轉址回應不跟隨並判為失敗
#[tokio::test]
async fn test_hubspot_redirect_is_failure() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/forms/3668872/4ef91f1a");
        then.status(302).header("Location", "/thanks");
    });
    let thanks = server.mock(|when, then| {
        when.path("/thanks");
        then.status(204);
    });

    let config = HubspotConfig {
        portal_id: Some("3668872".to_string()),
        form_id: Some("4ef91f1a".to_string()),
        options: options(server.url("/forms")),
    };
    let input = LeadRecord::from_pairs([("first_name", "Jane")]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    mock.assert();
    assert_eq!(thanks.hits(), 0);
    let failure = match outcome {
        Ok(_) => anyhow::bail!("expected a failure"),
        Err(failure) => failure,
    };
    assert_eq!(failure.status(), Some(302));
    Ok(())
}

/// Zoho 的表單會轉址到感謝頁，跟隨後以最終狀態判定
#[tokio::test]
async fn test_zoho_follows_redirect() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/crm/WebToLeadForm");
        then.status(302).header("Location", "/crm/thanks");
    });
    let thanks = server.mock(|when, then| {
        when.method(GET).path("/crm/thanks");
        then.status(200).body("<html>Thank you</html>");
    });

    let config = ZohoConfig {
        options: options(server.url("/crm/WebToLeadForm")),
    };
    let input = LeadRecord::from_pairs([("first_name", "Jane"), ("xn", "abc"), ("xm", "def")]);

    let outcome = relay(Arc::new(MemorySink::new()))?.send(&config, &input, None).await;

    thanks.assert();
    assert!(outcome.is_ok());
    Ok(())
}

/// BuilderTrend：成功後把回應頁面的內文記成一筆 Result 訊息
#[tokio::test]
async fn test_builder_trend_logs_page_text() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/ContactFormFrame.aspx")
            .query_param("builderID", "991");
        then.status(200)
            .body("<html><head><title>x</title></head><body><p>Thanks, <b>Jane</b>!</p></body></html>");
    });

    let sink = Arc::new(MemorySink::new());
    let config = BuilderTrendConfig {
        client_id: Some("991".to_string()),
        options: options(server.url("/ContactFormFrame.aspx")),
        ..BuilderTrendConfig::default()
    };
    let input = LeadRecord::from_pairs([("first_name", "Jane"), ("last_name", "Doe")]);

    let outcome = relay(sink.clone())?.send(&config, &input, None).await;

    mock.assert();
    assert!(outcome.is_ok());
    let notes: Vec<String> = sink
        .events()
        .into_iter()
        .filter(|(level, _, _)| *level == EventLevel::Info)
        .map(|(_, text, _)| text)
        .collect();
    assert_eq!(notes, vec!["Result: Thanks, Jane!".to_string()]);
    assert_eq!(sink.count(EventLevel::Success), 1);
    Ok(())
}
