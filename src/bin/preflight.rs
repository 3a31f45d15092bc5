//! Checks a deployment's configuration and database before starting the relay.

use anon_relay::app::{HttpStatusProbe, MessageService, StatusProbe};
use anon_relay::infra::Settings;
use anon_relay::storage;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--probe]\n\
         \n\
         Reads the same env vars as the relay:\n\
           DATABASE_URL, API_KEY, MAX_MESSAGES, WEBAPP_URL, PORT\n\
         --probe additionally calls GET {{WEBAPP_URL}}/health on a running relay.\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let probe_running_service = args.iter().any(|a| a == "--probe");

    // Force-read config (nice error messages if something is malformed)
    let settings = Settings::load()?;

    println!("> Preflight:");
    println!("  DATABASE_URL={}", settings.database_url);
    println!("  MAX_MESSAGES={}", settings.max_messages);
    println!("  public URL={}", settings.public_base_url());
    if settings.api_key.is_none() {
        eprintln!("  Warning: API_KEY is not set; /bot/messages and /stats will reject every request.");
    } else {
        println!("  API_KEY is set.");
    }

    // Database connectivity and schema
    let store = storage::connect(&settings.database_url)?;
    store
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("Database is not reachable: {}", e))?;
    println!("  Database reachable.");

    let messages = MessageService::new(store, settings.max_messages);
    messages.initialize(false).await?;
    let count = messages.count().await?;
    println!("  Schema ok, {} message(s) stored.", count);
    if count > i64::from(settings.max_messages) {
        eprintln!(
            "  Warning: {} rows exceed MAX_MESSAGES={}; the next submission will trim them.",
            count, settings.max_messages
        );
    }

    if probe_running_service {
        let probe = HttpStatusProbe::new(&settings.public_base_url())?;
        let status = probe
            .probe()
            .await
            .map_err(|e| anyhow::anyhow!("GET {} failed: {}", probe.url(), e))?;
        if status != 200 {
            return Err(anyhow::anyhow!("GET {} returned {}", probe.url(), status));
        }
        println!("  {} answered 200.", probe.url());
    }

    println!("> Preflight OK.");
    Ok(())
}
