//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream, dictionary};
use pdfscribe::telegram::{BotApi, Chat, File, Message, OutgoingDocument};
use pdfscribe::{Result, ScribeError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Build a PDF with one page per entry; empty strings give pages without text.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    save(build_document(pages))
}

/// Build an RC4-encrypted PDF. An empty `user_password` gives a document any
/// reader can open, restricted only by its permissions.
pub fn build_encrypted_pdf(pages: &[&str], owner_password: &str, user_password: &str) -> Vec<u8> {
    let mut doc = build_document(pages);
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(b"pdfscribe-id-0001".to_vec()),
            Object::string_literal(b"pdfscribe-id-0002".to_vec()),
        ]),
    );
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password,
        key_length: 128,
        permissions: Permissions::PRINTABLE,
    })
    .unwrap();
    doc.encrypt(&state).unwrap();
    save(doc)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn build_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Text long enough to be kept without OCR.
pub const REPORT_TEXT: &str = "The quarterly report describes revenue growth across every region";

/// Whether `tesseract` and `pdftoppm` can be executed on this host.
pub fn ocr_tools_available() -> bool {
    let runs = |program: &str, flag: &str| {
        std::process::Command::new(program)
            .arg(flag)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok()
    };
    runs("tesseract", "--version") && runs("pdftoppm", "-v")
}

/// A request captured by [`FakeServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
    }
}

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
    streamed: bool,
}

/// In-process HTTP server answering canned responses by path.
///
/// Used in place of the Telegram and OpenRouter APIs.
#[derive(Clone, Default)]
pub struct FakeServer {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<HashMap<String, Vec<CannedResponse>>>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response for `path`. The last queued response repeats.
    pub fn respond_json(&self, path: &str, status: u16, body: serde_json::Value) {
        self.push(path, status, "application/json", Bytes::from(body.to_string()), false);
    }

    pub fn respond_bytes(&self, path: &str, status: u16, body: Vec<u8>) {
        self.push(path, status, "application/octet-stream", Bytes::from(body), false);
    }

    /// Like `respond_bytes`, but sent chunked without a `Content-Length`.
    pub fn respond_streamed(&self, path: &str, status: u16, body: Vec<u8>) {
        self.push(path, status, "application/octet-stream", Bytes::from(body), true);
    }

    fn push(&self, path: &str, status: u16, content_type: &'static str, body: Bytes, streamed: bool) {
        let response = CannedResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body,
            streamed,
        };
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    /// Bind to an ephemeral port and return the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new().fallback(fake_handler).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn fake_handler(
    State(server): State<FakeServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    server.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: path.clone(),
        headers,
        body,
    });

    let canned = {
        let mut responses = server.responses.lock().unwrap();
        match responses.get_mut(&path) {
            Some(queue) if queue.len() > 1 => Some(queue.remove(0)),
            Some(queue) => queue.first().cloned(),
            None => None,
        }
    };

    match canned {
        Some(response) if response.streamed => {
            let pieces: Vec<std::result::Result<Bytes, std::io::Error>> = response
                .body
                .chunks(256)
                .map(|piece| Ok(Bytes::copy_from_slice(piece)))
                .collect();
            (
                response.status,
                [(header::CONTENT_TYPE, response.content_type)],
                Body::from_stream(futures_util::stream::iter(pieces)),
            )
                .into_response()
        }
        Some(response) => (
            response.status,
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, format!("no canned response for {}", path)).into_response(),
    }
}

/// Message sent through [`FakeBotApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message {
        chat_id: i64,
        text: String,
        reply_to: Option<i64>,
    },
    Document {
        chat_id: i64,
        document: OutgoingDocument,
    },
}

/// In-memory Bot API serving files by `file_id`.
#[derive(Default)]
pub struct FakeBotApi {
    files: Mutex<HashMap<String, Vec<u8>>>,
    sent: Mutex<Vec<Sent>>,
    fail_send_document: bool,
}

impl FakeBotApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, file_id: &str, bytes: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(file_id.to_string(), bytes);
        self
    }

    pub fn failing_send_document(mut self) -> Self {
        self.fail_send_document = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<OutgoingDocument> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Document { document, .. } => Some(document),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn reply(chat_id: i64) -> Message {
        Message {
            message_id: 9000,
            date: 0,
            chat: Chat {
                id: chat_id,
                kind: "private".to_string(),
            },
            from: None,
            text: None,
            caption: None,
            document: None,
        }
    }
}

#[async_trait]
impl BotApi for FakeBotApi {
    async fn get_file(&self, file_id: &str) -> Result<File> {
        if !self.files.lock().unwrap().contains_key(file_id) {
            return Err(ScribeError::telegram("getFile failed (400): Bad Request: invalid file_id"));
        }
        Ok(File {
            file_id: file_id.to_string(),
            file_unique_id: format!("u-{}", file_id),
            file_size: None,
            file_path: Some(format!("documents/{}.pdf", file_id)),
        })
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let file_id = file_path
            .trim_start_matches("documents/")
            .trim_end_matches(".pdf");
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ScribeError::telegram("File download failed with HTTP 404"))
    }

    async fn send_document(&self, chat_id: i64, document: OutgoingDocument) -> Result<Message> {
        if self.fail_send_document {
            return Err(ScribeError::telegram("sendDocument failed (403): Forbidden"));
        }
        self.sent.lock().unwrap().push(Sent::Document { chat_id, document });
        Ok(Self::reply(chat_id))
    }

    async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<Message> {
        self.sent.lock().unwrap().push(Sent::Message {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(Self::reply(chat_id))
    }
}

/// JSON for a private-chat message carrying a document.
pub fn document_update(update_id: i64, file_id: &str, file_name: &str, mime_type: &str, file_size: u64) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": 42,
            "date": 1718000000,
            "chat": {"id": 777, "type": "private"},
            "from": {"id": 777, "is_bot": false, "first_name": "Ann"},
            "document": {
                "file_id": file_id,
                "file_unique_id": format!("u-{}", file_id),
                "file_name": file_name,
                "mime_type": mime_type,
                "file_size": file_size
            }
        }
    })
}

/// JSON for a private-chat text message.
pub fn text_update(update_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": 41,
            "date": 1718000000,
            "chat": {"id": 777, "type": "private"},
            "text": text
        }
    })
}
