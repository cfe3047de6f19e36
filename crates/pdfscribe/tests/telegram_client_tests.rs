//! Bot API client tests against an in-process fake Telegram server.

mod common;

use common::FakeServer;
use pdfscribe::ScribeError;
use pdfscribe::core::config::TelegramConfig;
use pdfscribe::telegram::{BotApi, OutgoingDocument, TelegramClient};
use serde_json::json;

const TOKEN: &str = "123456-TESTTOKEN";

async fn client_for(server: &FakeServer) -> TelegramClient {
    client_with_limit(server, 20 * 1024 * 1024).await
}

async fn client_with_limit(server: &FakeServer, max_download_bytes: u64) -> TelegramClient {
    let config = TelegramConfig {
        bot_token: Some(TOKEN.to_string()),
        api_base_url: server.start().await,
        request_timeout_secs: 5,
        max_download_bytes,
        ..Default::default()
    };
    TelegramClient::new(&config).unwrap()
}

fn method_path(method: &str) -> String {
    format!("/bot{}/{}", TOKEN, method)
}

fn message_json(message_id: i64) -> serde_json::Value {
    json!({
        "message_id": message_id,
        "date": 1718000000,
        "chat": {"id": 777, "type": "private"}
    })
}

#[tokio::test]
async fn test_get_file() {
    let server = FakeServer::new();
    server.respond_json(
        &method_path("getFile"),
        200,
        json!({"ok": true, "result": {
            "file_id": "abc",
            "file_unique_id": "u-abc",
            "file_size": 1234,
            "file_path": "documents/file_7.pdf"
        }}),
    );
    let client = client_for(&server).await;

    let file = client.get_file("abc").await.unwrap();

    assert_eq!(file.file_path.as_deref(), Some("documents/file_7.pdf"));
    assert_eq!(file.file_size, Some(1234));
    let requests = server.requests_to(&method_path("getFile"));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].json(), json!({"file_id": "abc"}));
}

#[tokio::test]
async fn test_api_error_is_reported_without_token() {
    let server = FakeServer::new();
    server.respond_json(
        &method_path("getFile"),
        400,
        json!({"ok": false, "error_code": 400, "description": "Bad Request: invalid file_id"}),
    );
    let client = client_for(&server).await;

    let err = client.get_file("nope").await.unwrap_err();

    assert!(matches!(err, ScribeError::Telegram { .. }));
    let message = err.to_string();
    assert!(message.contains("getFile failed (400)"));
    assert!(message.contains("invalid file_id"));
    assert!(!message.contains(TOKEN));
}

#[tokio::test]
async fn test_rate_limit_mentions_retry_after() {
    let server = FakeServer::new();
    server.respond_json(
        &method_path("sendMessage"),
        429,
        json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 3",
            "parameters": {"retry_after": 3}
        }),
    );
    let client = client_for(&server).await;

    let err = client.send_message(777, "hi", None).await.unwrap_err();
    assert!(err.to_string().contains("retry after 3s"));
}

#[tokio::test]
async fn test_transport_error_hides_token() {
    let config = TelegramConfig {
        bot_token: Some(TOKEN.to_string()),
        api_base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let client = TelegramClient::new(&config).unwrap();

    let err = client.get_file("abc").await.unwrap_err();

    let mut chain = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(inner) = source {
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    assert!(!chain.contains(TOKEN), "token leaked: {}", chain);
}

#[tokio::test]
async fn test_download_file() {
    let server = FakeServer::new();
    let path = format!("/file/bot{}/documents/file_7.pdf", TOKEN);
    server.respond_bytes(&path, 200, b"%PDF-1.5 fake".to_vec());
    let client = client_for(&server).await;

    let bytes = client.download_file("documents/file_7.pdf").await.unwrap();
    assert_eq!(bytes, b"%PDF-1.5 fake");
}

#[tokio::test]
async fn test_download_file_over_limit() {
    let server = FakeServer::new();
    let path = format!("/file/bot{}/documents/big.pdf", TOKEN);
    server.respond_bytes(&path, 200, vec![b'x'; 2048]);
    let client = client_with_limit(&server, 1024).await;

    let err = client.download_file("documents/big.pdf").await.unwrap_err();
    assert!(matches!(err, ScribeError::Validation { .. }));
}

#[tokio::test]
async fn test_download_without_content_length() {
    let server = FakeServer::new();
    let path = format!("/file/bot{}/documents/chunked.pdf", TOKEN);
    let body: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    server.respond_streamed(&path, 200, body.clone());
    let client = client_with_limit(&server, 1024).await;

    let bytes = client.download_file("documents/chunked.pdf").await.unwrap();
    assert_eq!(bytes, body);
}

#[tokio::test]
async fn test_download_without_content_length_over_limit() {
    let server = FakeServer::new();
    let path = format!("/file/bot{}/documents/endless.pdf", TOKEN);
    server.respond_streamed(&path, 200, vec![b'x'; 4096]);
    let client = client_with_limit(&server, 1024).await;

    let err = client.download_file("documents/endless.pdf").await.unwrap_err();
    assert!(matches!(err, ScribeError::Validation { .. }));
    assert!(err.to_string().contains("1024"));
}

#[tokio::test]
async fn test_download_file_not_found() {
    let server = FakeServer::new();
    let client = client_for(&server).await;

    let err = client.download_file("documents/missing.pdf").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
}

#[tokio::test]
async fn test_send_document_multipart() {
    let server = FakeServer::new();
    server.respond_json(&method_path("sendDocument"), 200, json!({"ok": true, "result": message_json(43)}));
    let client = client_for(&server).await;

    let message = client
        .send_document(
            777,
            OutgoingDocument {
                file_name: "contract.txt".to_string(),
                content: "Договор поставки".as_bytes().to_vec(),
                caption: Some("done".to_string()),
                reply_to_message_id: Some(42),
            },
        )
        .await
        .unwrap();
    assert_eq!(message.message_id, 43);

    let request = &server.requests_to(&method_path("sendDocument"))[0];
    assert!(
        request
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data")
    );
    let body = request.body_text();
    assert!(body.contains("name=\"chat_id\""));
    assert!(body.contains("777"));
    assert!(body.contains("filename=\"contract.txt\""));
    assert!(body.contains("text/plain; charset=utf-8"));
    assert!(body.contains("Договор поставки"));
    assert!(body.contains("name=\"reply_parameters\""));
    assert!(body.contains(r#"{"message_id":42,"allow_sending_without_reply":true}"#));
    assert!(body.contains("name=\"caption\""));
}

#[tokio::test]
async fn test_send_message_with_reply() {
    let server = FakeServer::new();
    server.respond_json(&method_path("sendMessage"), 200, json!({"ok": true, "result": message_json(44)}));
    let client = client_for(&server).await;

    client.send_message(777, "Привет", Some(42)).await.unwrap();

    let body = server.requests_to(&method_path("sendMessage"))[0].json();
    assert_eq!(body["chat_id"], 777);
    assert_eq!(body["text"], "Привет");
    assert_eq!(body["reply_parameters"]["message_id"], 42);
    assert_eq!(body["reply_parameters"]["allow_sending_without_reply"], true);
}

#[tokio::test]
async fn test_set_webhook() {
    let server = FakeServer::new();
    server.respond_json(&method_path("setWebhook"), 200, json!({"ok": true, "result": true}));
    let client = client_for(&server).await;

    let ok = client
        .set_webhook("https://bot.example.com/webhook", Some("s3cret"), true)
        .await
        .unwrap();
    assert!(ok);

    let body = server.requests_to(&method_path("setWebhook"))[0].json();
    assert_eq!(body["url"], "https://bot.example.com/webhook");
    assert_eq!(body["secret_token"], "s3cret");
    assert_eq!(body["drop_pending_updates"], true);
    assert_eq!(body["allowed_updates"], json!(["message"]));
}

#[tokio::test]
async fn test_set_webhook_without_secret() {
    let server = FakeServer::new();
    server.respond_json(&method_path("setWebhook"), 200, json!({"ok": true, "result": true}));
    let client = client_for(&server).await;

    client
        .set_webhook("https://bot.example.com/webhook", None, false)
        .await
        .unwrap();

    let body = server.requests_to(&method_path("setWebhook"))[0].json();
    assert!(body.get("secret_token").is_none());
}

#[tokio::test]
async fn test_delete_webhook_and_info() {
    let server = FakeServer::new();
    server.respond_json(&method_path("deleteWebhook"), 200, json!({"ok": true, "result": true}));
    server.respond_json(
        &method_path("getWebhookInfo"),
        200,
        json!({"ok": true, "result": {
            "url": "https://bot.example.com/webhook",
            "has_custom_certificate": false,
            "pending_update_count": 3,
            "last_error_message": "Connection refused"
        }}),
    );
    let client = client_for(&server).await;

    assert!(client.delete_webhook(false).await.unwrap());
    let info = client.get_webhook_info().await.unwrap();
    assert_eq!(info.url, "https://bot.example.com/webhook");
    assert_eq!(info.pending_update_count, 3);
    assert_eq!(info.last_error_message.as_deref(), Some("Connection refused"));
}

#[tokio::test]
async fn test_unreadable_response() {
    let server = FakeServer::new();
    server.respond_bytes(&method_path("getWebhookInfo"), 502, b"<html>Bad Gateway</html>".to_vec());
    let client = client_for(&server).await;

    let err = client.get_webhook_info().await.unwrap_err();
    assert!(err.to_string().contains("HTTP 502"));
}
