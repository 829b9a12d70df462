use clap::Parser;
use std::sync::Arc;

use lead_relay::config::input::read_leads;
use lead_relay::core::reporter::TracingSink;
use lead_relay::utils::error::ErrorSeverity;
use lead_relay::utils::{logger, validation::Validate};
use lead_relay::{respond, CliArgs, LeadRelay, RelayError, Reporter, ReqwestTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting lead-relay CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = args.validate() {
        exit_with(&e);
    }

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let targets = config.enabled_targets(args.target.as_deref());
    if args.check {
        println!("✅ Configuration is valid ({} enabled targets)", targets.len());
        return Ok(());
    }
    if targets.is_empty() {
        eprintln!("❌ No enabled target matches the selection");
        std::process::exit(1);
    }

    let leads = match args.input.as_ref().map(read_leads) {
        Some(Ok(leads)) => leads,
        Some(Err(e)) => exit_with(&e),
        None => Vec::new(),
    };

    let transport = match ReqwestTransport::new(config.relay.connect_timeout()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => exit_with(&e),
    };
    let relay = LeadRelay::new(transport, Reporter::new(Arc::new(TracingSink), config.relay.visible_chars))
        .with_flags(args.flags(&config))
        .with_timeout(config.relay.timeout());

    tracing::info!("📥 {} leads → {} targets", leads.len(), targets.len());

    let mut worst: Option<ErrorSeverity> = None;
    for lead in &leads {
        for outcome in relay.fan_out(targets.clone(), lead, None).await {
            let (_, response) = respond(&outcome.outcome, config.relay.die_on_error);
            match &outcome.outcome {
                Ok(delivery) => println!("✅ {} → {}", delivery.lead, outcome.name),
                Err(failure) => {
                    eprintln!("❌ {}", failure.error.user_friendly_message());
                    eprintln!("💡 建議: {}", failure.error.recovery_suggestion());
                    worst = worst.max(Some(failure.error.severity()));
                }
            }
            if let Some(response) = response {
                println!("HTTP {}\n{}", response.status, response.body);
            }
        }
    }

    // 根據錯誤嚴重程度決定退出碼
    if let Some(severity) = worst {
        let exit_code = exit_code(severity);
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 驗證未過，名單本身的問題
        ErrorSeverity::Medium => 2,   // 可由呼叫端重試
        ErrorSeverity::High => 1,     // 設定錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn exit_with(e: &RelayError) -> ! {
    tracing::error!(
        "❌ lead-relay failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()).max(1));
}
