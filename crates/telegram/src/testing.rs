//! In-process stand-in for the Telegram Bot API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        response::{IntoResponse, Response},
        routing::post,
    },
    serde::Deserialize,
    serde_json::json,
    tokio::{sync::oneshot, task::JoinHandle},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TelegramApiMethod {
    SendMessage,
    SendChatAction,
    Other(String),
}

impl TelegramApiMethod {
    fn from_path(path: &str) -> Self {
        let method = path.rsplit('/').next().unwrap_or_default();
        match method {
            "SendMessage" => Self::SendMessage,
            "SendChatAction" => Self::SendChatAction,
            _ => Self::Other(method.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub reply_markup: Option<serde_json::Value>,
}

#[derive(Clone, Default)]
struct MockState {
    messages: Arc<Mutex<Vec<SendMessageRequest>>>,
    methods: Arc<Mutex<Vec<TelegramApiMethod>>>,
    send_attempts: Arc<AtomicUsize>,
    rate_limited: Arc<AtomicUsize>,
}

async fn telegram_api_handler(State(state): State<MockState>, uri: Uri, body: Bytes) -> Response {
    let method = TelegramApiMethod::from_path(uri.path());
    state.methods.lock().unwrap().push(method.clone());

    match method {
        TelegramApiMethod::SendMessage => {
            state.send_attempts.fetch_add(1, Ordering::SeqCst);
            let limited = state
                .rate_limited
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if limited {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "ok": false,
                        "error_code": 429,
                        "description": "Too Many Requests: retry after 1",
                        "parameters": { "retry_after": 1 }
                    })),
                )
                    .into_response();
            }

            let req: SendMessageRequest =
                serde_json::from_slice(&body).expect("decode sendMessage body");
            let reply = json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 0,
                    "chat": { "id": req.chat_id, "type": "private", "first_name": "Test" },
                    "text": req.text,
                }
            });
            state.messages.lock().unwrap().push(req);
            Json(reply).into_response()
        },
        TelegramApiMethod::SendChatAction | TelegramApiMethod::Other(_) => {
            Json(json!({ "ok": true, "result": true })).into_response()
        },
    }
}

/// Records every Bot API call made against it and answers with canned
/// successes.
pub(crate) struct MockTelegramApi {
    state: MockState,
    base_url: String,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

impl MockTelegramApi {
    pub(crate) async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            state,
            base_url: format!("http://{addr}/"),
            shutdown_tx,
            server,
        }
    }

    pub(crate) fn bot(&self) -> teloxide::Bot {
        let api_url = reqwest::Url::parse(&self.base_url).expect("parse api url");
        teloxide::Bot::new("test-token").set_api_url(api_url)
    }

    /// Fail the next `n` sendMessage calls with a 429 asking for a one-second wait.
    pub(crate) fn rate_limit_next(&self, n: usize) {
        self.state.rate_limited.store(n, Ordering::SeqCst);
    }

    pub(crate) fn send_message_attempts(&self) -> usize {
        self.state.send_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn messages(&self) -> Vec<SendMessageRequest> {
        self.state.messages.lock().unwrap().clone()
    }

    pub(crate) fn sent_texts(&self, chat_id: i64) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text)
            .collect()
    }

    pub(crate) fn methods(&self) -> Vec<TelegramApiMethod> {
        self.state.methods.lock().unwrap().clone()
    }

    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.server.await.expect("server join");
    }
}
