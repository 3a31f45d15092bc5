//! Bot front end against a fake Telegram Bot API and a real relay server.

use anon_relay::app::MessageService;
use anon_relay::bot::runner::{GREETING, READ_PROMPT};
use anon_relay::bot::telegram::SendMessage;
use anon_relay::bot::{BotRunner, RelayClient, RelayOutcome, TelegramClient};
use anon_relay::storage::SqliteMessageStore;
use anon_relay::transport::http::{create_router, AppState, SharedSecret};
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

const API_KEY: &str = "AKe5Df9cB7zX";
const BOT_TOKEN: &str = "123:fake";
const WEBAPP_URL: &str = "https://relay.example.com";

#[derive(Default)]
struct FakeTelegram {
    updates: Mutex<Vec<Value>>,
    sent: Mutex<Vec<SendMessage>>,
    offsets: Mutex<Vec<i64>>,
}

async fn telegram_method(
    State(fake): State<Arc<FakeTelegram>>,
    Path((bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    if bot != format!("bot{}", BOT_TOKEN) {
        return Json(json!({ "ok": false, "description": "Unauthorized" }));
    }
    match method.as_str() {
        "getUpdates" => {
            let offset = body["offset"].as_i64().unwrap_or(0);
            fake.offsets.lock().await.push(offset);
            let pending: Vec<Value> = fake
                .updates
                .lock()
                .await
                .iter()
                .filter(|u| u["update_id"].as_i64().unwrap_or(0) >= offset)
                .cloned()
                .collect();
            Json(json!({ "ok": true, "result": pending }))
        }
        "sendMessage" => {
            let message: SendMessage = serde_json::from_value(body).unwrap();
            fake.sent.lock().await.push(message);
            Json(json!({ "ok": true, "result": { "message_id": 1 } }))
        }
        _ => Json(json!({ "ok": false, "description": "Not Found" })),
    }
}

async fn serve(router: Router) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Wait for the server to be ready
    for _ in 0..30 {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => break,
            Err(_) => tokio::time::sleep(tokio::time::Duration::from_millis(100)).await,
        }
    }
    Ok(addr)
}

async fn spawn_fake_telegram() -> Result<(Arc<FakeTelegram>, String), Box<dyn std::error::Error>> {
    let fake = Arc::new(FakeTelegram::default());
    let router = Router::new()
        .route("/:bot/:method", post(telegram_method))
        .with_state(fake.clone());
    let addr = serve(router).await?;
    Ok((fake, format!("http://{}", addr)))
}

async fn spawn_relay() -> Result<(Arc<MessageService>, String), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteMessageStore::connect_lazy("sqlite::memory:")?);
    let messages = Arc::new(MessageService::new(store, 50));
    messages.initialize(false).await?;
    let secret = SharedSecret::new(Some(SecretString::from(API_KEY.to_string())));
    let addr = serve(create_router(AppState::new(messages.clone(), secret))).await?;
    Ok((messages, format!("http://{}", addr)))
}

fn text_update(update_id: i64, user_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": { "id": 500, "type": "private" },
            "from": { "id": user_id, "is_bot": false, "first_name": "Anon" },
            "text": text
        }
    })
}

fn relay_client(base_url: &str, key: &str) -> RelayClient {
    RelayClient::new(base_url, SecretString::from(key.to_string())).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_poll_handles_commands_and_relays_text() -> Result<(), Box<dyn std::error::Error>> {
    let (fake, telegram_url) = spawn_fake_telegram().await?;
    let (messages, relay_url) = spawn_relay().await?;

    {
        let mut updates = fake.updates.lock().await;
        updates.push(text_update(100, 77, "/start"));
        updates.push(text_update(101, 77, "/read@relay_bot"));
        updates.push(text_update(102, 77, "please remember me"));
        updates.push(json!({
            "update_id": 103,
            "message": { "message_id": 103, "chat": { "id": 500, "type": "private" }, "photo": [] }
        }));
    }

    let telegram = TelegramClient::new(&telegram_url, SecretString::from(BOT_TOKEN.to_string()), 1)?;
    let runner = BotRunner::new(telegram, relay_client(&relay_url, API_KEY), WEBAPP_URL.to_string());

    let mut offset = 0;
    assert_eq!(runner.poll_once(&mut offset).await?, 4);
    assert_eq!(offset, 104);

    let sent = fake.sent.lock().await.clone();
    assert_eq!(sent.len(), 3, "photo update must be ignored");
    assert!(sent.iter().all(|m| m.chat_id == 500));

    assert_eq!(sent[0].text, GREETING);
    assert!(sent[0].reply_markup.is_none());

    assert_eq!(sent[1].text, READ_PROMPT);
    let markup = sent[1].reply_markup.as_ref().expect("web app button");
    let button = &markup.inline_keyboard[0][0];
    assert_eq!(button.web_app.as_ref().unwrap().url, WEBAPP_URL);

    assert_eq!(
        sent[2].text,
        RelayOutcome::Stored { message_id: None }.reply_text()
    );

    let stored = messages.list_recent(10).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "please remember me");
    assert_eq!(stored[0].submitter_id.as_deref(), Some("77"));

    // Nothing new: the offset moved past everything handled.
    assert_eq!(runner.poll_once(&mut offset).await?, 0);
    assert_eq!(fake.offsets.lock().await.last().copied(), Some(104));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_relay_outcomes() -> Result<(), Box<dyn std::error::Error>> {
    let (messages, relay_url) = spawn_relay().await?;

    let good = relay_client(&relay_url, API_KEY);
    assert!(matches!(
        good.submit("hello", "1").await,
        RelayOutcome::Stored { message_id: Some(_) }
    ));
    assert_eq!(
        good.submit("", "1").await,
        RelayOutcome::Rejected("Empty message".to_string())
    );

    let wrong_key = relay_client(&relay_url, "wrong");
    assert_eq!(wrong_key.submit("hello", "1").await, RelayOutcome::HttpStatus(401));

    // A port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let dead_addr = listener.local_addr()?;
    drop(listener);
    let unreachable = relay_client(&format!("http://{}", dead_addr), API_KEY);
    assert!(matches!(
        unreachable.submit("hello", "1").await,
        RelayOutcome::Failed(_)
    ));

    assert_eq!(messages.count().await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_stops_on_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    let (fake, telegram_url) = spawn_fake_telegram().await?;
    let (_messages, relay_url) = spawn_relay().await?;
    fake.updates.lock().await.push(text_update(1, 9, "/start"));

    let telegram = TelegramClient::new(&telegram_url, SecretString::from(BOT_TOKEN.to_string()), 1)?;
    let runner = BotRunner::new(telegram, relay_client(&relay_url, API_KEY), WEBAPP_URL.to_string());

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let _ = stop_tx.send(());
    });

    tokio::time::timeout(
        std::time::Duration::from_secs(10),
        runner.run(async {
            let _ = stop_rx.await;
        }),
    )
    .await?;
    stopper.await?;

    // The single update was answered once, not on every poll.
    assert_eq!(fake.sent.lock().await.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_telegram_errors_surface() -> Result<(), Box<dyn std::error::Error>> {
    let (_fake, telegram_url) = spawn_fake_telegram().await?;
    let telegram = TelegramClient::new(&telegram_url, SecretString::from("0:bad".to_string()), 1)?;

    let err = telegram.get_updates(0).await.unwrap_err();
    assert!(err.to_string().contains("Unauthorized"));
    assert!(!err.to_string().contains("0:bad"));
    Ok(())
}
