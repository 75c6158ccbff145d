//! Integration Tests for HttpBackend + ChatController
//!
//! Runs the real HTTP backend against a throwaway TCP server that speaks just
//! enough HTTP/1.1 to replay canned responses.
//!
//! # Test Coverage
//!
//! 1. **Streaming**: frames split across socket writes arrive in order
//! 2. **Thinking**: markers and multibyte text split across writes
//! 3. **Failures**: status errors, empty bodies and truncated streams roll
//!    the assistant placeholder back
//! 4. **Models / Health**: model selection and liveness

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_test::assert_ok;

use chatbot_core::{
    strip_thinking, BackendError, ChatBackend, ChatController, ChatEvent, ChatRequest, HttpBackend,
    MessageRole, SubmitOutcome, TurnPhase,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Fake Server
// =============================================================================

/// A canned response for one path
#[derive(Clone)]
struct Route {
    status: &'static str,
    headers: Vec<&'static str>,
    /// Written one piece per socket write
    body: Vec<Vec<u8>>,
}

impl Route {
    fn ok(body: Vec<Vec<u8>>) -> Self {
        Self {
            status: "200 OK",
            headers: vec!["Content-Type: text/event-stream"],
            body,
        }
    }

    fn json(body: &str) -> Self {
        Self {
            status: "200 OK",
            headers: vec!["Content-Type: application/json"],
            body: vec![body.as_bytes().to_vec()],
        }
    }

    fn status(status: &'static str) -> Self {
        Self {
            status,
            headers: vec!["Content-Length: 0"],
            body: Vec::new(),
        }
    }
}

/// Request seen by the fake server
#[derive(Clone, Debug)]
struct Recorded {
    method: String,
    path: String,
    body: String,
}

struct FakeServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
    async fn start(routes: Vec<(&'static str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<&'static str, Route>> = Arc::new(routes.into_iter().collect());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = handle(socket, &routes, &recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            requests,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn handle(
    socket: tokio::net::TcpStream,
    routes: &HashMap<&'static str, Route>,
    recorded: &Mutex<Vec<Recorded>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    recorded.lock().push(Recorded {
        method,
        path: path.clone(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let route = path
        .strip_prefix("/api/v1")
        .and_then(|p| routes.get(p))
        .cloned()
        .unwrap_or_else(|| Route::status("404 Not Found"));

    let mut socket = reader.into_inner();
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", route.status);
    for header in &route.headers {
        head.push_str(header);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    socket.write_all(head.as_bytes()).await?;
    socket.flush().await?;

    for piece in route.body {
        socket.write_all(&piece).await?;
        socket.flush().await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    socket.shutdown().await
}

// =============================================================================
// Helpers
// =============================================================================

fn frame(content: &str, is_complete: bool) -> String {
    let payload = serde_json::json!({
        "content": content,
        "is_complete": is_complete,
        "model": "qwen3:1.7b",
    });
    format!("data: {payload}\n\n")
}

/// Split a body into pieces of `size` bytes, ignoring char boundaries
fn pieces(body: &str, size: usize) -> Vec<Vec<u8>> {
    body.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

fn controller_for(
    server: &FakeServer,
) -> (ChatController<HttpBackend>, mpsc::Receiver<ChatEvent>) {
    let backend = assert_ok!(HttpBackend::new(server.base_url.clone()));
    let (controller, events) = ChatController::new(backend, 64);
    controller.select_model("qwen3:1.7b");
    (controller, events)
}

fn drain(rx: &mut mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn render_contents(events: &[ChatEvent]) -> Vec<(String, TurnPhase)> {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Render(update) => Some((update.content.clone(), update.phase)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_stream_renders_each_chunk() {
    let body = format!(
        "{}{}{}",
        frame("Hel", false),
        frame("lo", false),
        frame(" world", true)
    );
    let server = FakeServer::start(vec![("/chat/stream", Route::ok(pieces(&body, 11)))]).await;
    let (controller, mut events) = controller_for(&server);

    let outcome = timeout(TEST_TIMEOUT, controller.submit("hi")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "Hello world");

    assert_eq!(
        render_contents(&drain(&mut events)),
        vec![
            ("Hel".to_string(), TurnPhase::StreamingResponse),
            ("Hello".to_string(), TurnPhase::StreamingResponse),
            ("Hello world".to_string(), TurnPhase::Settled),
        ]
    );
}

#[tokio::test]
async fn test_request_body_carries_history_and_model() {
    let server = FakeServer::start(vec![(
        "/chat/stream",
        Route::ok(vec![frame("ok", true).into_bytes()]),
    )])
    .await;
    let (controller, _events) = controller_for(&server);

    timeout(TEST_TIMEOUT, controller.submit("first")).await.unwrap();
    timeout(TEST_TIMEOUT, controller.submit("second")).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/api/v1/chat/stream");

    let body: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(body["message"], "second");
    assert_eq!(body["model"], "qwen3:1.7b");
    assert_eq!(body["stream"], true);
    let history = body["conversation_history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "first");
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["content"], "ok");
}

#[tokio::test]
async fn test_thinking_split_across_writes() {
    let body = format!(
        "{}{}{}data: [DONE]\n\n",
        frame("<thi", false),
        frame("nk>réflexion</think>", false),
        frame("réponse", false)
    );
    let server = FakeServer::start(vec![("/chat/stream", Route::ok(pieces(&body, 3)))]).await;
    let (controller, mut events) = controller_for(&server);

    timeout(TEST_TIMEOUT, controller.submit("pourquoi ?")).await.unwrap();

    let events = drain(&mut events);
    let last = events
        .iter()
        .rev()
        .find_map(|e| match e {
            ChatEvent::Render(update) => Some(update.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last.phase, TurnPhase::Settled);
    assert_eq!(last.view.thinking.as_deref(), Some("réflexion"));
    assert_eq!(last.view.response, "réponse");
}

#[tokio::test]
async fn test_done_ignores_buffered_frames() {
    let body = format!(
        "{}data: [DONE]\n\n{}",
        frame("kept", false),
        frame(" dropped", false)
    );
    let server = FakeServer::start(vec![("/chat/stream", Route::ok(vec![body.into_bytes()]))]).await;
    let (controller, _events) = controller_for(&server);

    timeout(TEST_TIMEOUT, controller.submit("x")).await.unwrap();
    assert_eq!(controller.messages()[1].content, "kept");
}

#[tokio::test]
async fn test_malformed_and_foreign_lines_skipped() {
    let body = format!(
        ": keep-alive\nevent: message\ndata: {{not json\n{}data: [DONE]\n",
        frame("fine", false)
    );
    let server = FakeServer::start(vec![("/chat/stream", Route::ok(vec![body.into_bytes()]))]).await;
    let (controller, _events) = controller_for(&server);

    let outcome = timeout(TEST_TIMEOUT, controller.submit("x")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    assert_eq!(controller.messages()[1].content, "fine");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_status_500_rolls_back_placeholder() {
    let server =
        FakeServer::start(vec![("/chat/stream", Route::status("500 Internal Server Error"))]).await;
    let (controller, mut events) = controller_for(&server);

    let outcome = timeout(TEST_TIMEOUT, controller.submit("hello")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed { .. }));

    let messages = controller.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);

    let error = controller.error().unwrap();
    assert!(error.contains("500"), "{error}");
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, ChatEvent::TurnFailed { .. })));
}

#[tokio::test]
async fn test_empty_body_is_no_stream() {
    let server = FakeServer::start(vec![("/chat/stream", Route::status("200 OK"))]).await;
    let backend = HttpBackend::new(server.base_url.clone()).unwrap();

    let request = ChatRequest::new("hello").with_model("qwen3:1.7b");
    let result = timeout(TEST_TIMEOUT, backend.stream_chat(&request)).await.unwrap();
    assert!(matches!(result, Err(BackendError::NoStream)));
}

#[tokio::test]
async fn test_truncated_stream_rolls_back_partial_answer() {
    let server = FakeServer::start(vec![(
        "/chat/stream",
        Route::ok(vec![frame("half an ans", false).into_bytes()]),
    )])
    .await;
    let (controller, _events) = controller_for(&server);

    let outcome = timeout(TEST_TIMEOUT, controller.submit("hello")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
    assert_eq!(controller.messages().len(), 1);
    assert!(controller.error().is_some());
}

#[tokio::test]
async fn test_send_chat_non_streaming() {
    let server = FakeServer::start(vec![(
        "/chat",
        Route::json(r#"{"message":"<think>hm</think>Paris","model":"qwen3:1.7b","conversation_id":"c1"}"#),
    )])
    .await;
    let backend = HttpBackend::new(server.base_url.clone()).unwrap();

    let request = ChatRequest::new("capital of France?").with_model("qwen3:1.7b");
    let response = timeout(TEST_TIMEOUT, backend.send_chat(&request))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(strip_thinking(&response.message), "Paris");
    assert_eq!(response.role, "assistant");
    assert_eq!(response.conversation_id.as_deref(), Some("c1"));

    let body: serde_json::Value = serde_json::from_str(&server.requests()[0].body).unwrap();
    assert_eq!(body["stream"], false);
}

// =============================================================================
// Models / Health
// =============================================================================

#[tokio::test]
async fn test_load_models_selects_default() {
    let server = FakeServer::start(vec![(
        "/models",
        Route::json(r#"{"models":["qwen3:1.7b","deepseek-r1:8b"],"default_model":"deepseek-r1:8b"}"#),
    )])
    .await;
    let backend = HttpBackend::new(server.base_url.clone()).unwrap();
    let (controller, _events) = ChatController::new(backend, 8);

    let models = timeout(TEST_TIMEOUT, controller.load_models())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(models, vec!["qwen3:1.7b", "deepseek-r1:8b"]);
    assert_eq!(controller.selected_model().as_deref(), Some("deepseek-r1:8b"));
    assert_eq!(server.requests()[0].method, "GET");
}

#[tokio::test]
async fn test_models_error_carries_status() {
    let server = FakeServer::start(vec![("/models", Route::status("503 Service Unavailable"))]).await;
    let backend = HttpBackend::new(server.base_url.clone()).unwrap();

    let err = timeout(TEST_TIMEOUT, backend.list_models())
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(err.to_string().contains("Service Unavailable"));
}

#[tokio::test]
async fn test_health_check() {
    let server = FakeServer::start(vec![(
        "/health",
        Route::json(r#"{"status":"healthy","version":"1.0.0","model":"qwen3:1.7b","timestamp":"now"}"#),
    )])
    .await;
    let backend = HttpBackend::new(server.base_url.clone()).unwrap();
    assert!(timeout(TEST_TIMEOUT, backend.health_check()).await.unwrap());

    let missing = FakeServer::start(vec![]).await;
    let backend = HttpBackend::new(missing.base_url.clone()).unwrap();
    assert!(!timeout(TEST_TIMEOUT, backend.health_check()).await.unwrap());
}
