use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use ollama_api::{GenerateRequest, OllamaApiConfig, OllamaApiError, OllamaClient};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn allow_local_integration() -> bool {
    std::env::var("OLLAMA_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    body: String,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
) {
    let mut buffer = vec![0u8; 16 * 1024];
    let mut read = 0usize;
    loop {
        let n = match socket.read(&mut buffer[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        read += n;
        if request_is_complete(&buffer[..read]) || read == buffer.len() {
            break;
        }
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let script = scripts
        .get(index)
        .or_else(|| scripts.last())
        .cloned()
        .expect("at least one scripted response");

    let response = format!(
        "HTTP/1.1 {} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        script.status,
        script.body.len(),
        script.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn request_is_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn completed(text: &str) -> ScriptedResponse {
    ScriptedResponse {
        status: 200,
        body: json!({"model": "llama3.2:latest", "response": text, "done": true}).to_string(),
    }
}

fn failure(status: u16, error: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        body: json!({ "error": error }).to_string(),
    }
}

#[tokio::test]
async fn generate_returns_completed_response() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![completed("## Improved")]).await;
    let client = OllamaClient::new(OllamaApiConfig::new(&server.base_url)).expect("client");

    let response = client
        .generate(&GenerateRequest::new("llama3.2:latest", "explain", None))
        .await
        .expect("generate succeeds");

    assert_eq!(response.response, "## Improved");
    assert_eq!(server.request_count(), 1);
    server.shutdown();
}

#[tokio::test]
async fn generate_retries_transient_status_then_succeeds() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        failure(503, "server busy"),
        completed("after retry"),
    ])
    .await;
    let client = OllamaClient::new(OllamaApiConfig::new(&server.base_url).with_max_retries(1))
        .expect("client");

    let response = client
        .generate(&GenerateRequest::new("llama3.2:latest", "explain", None))
        .await
        .expect("second attempt succeeds");

    assert_eq!(response.response, "after retry");
    assert_eq!(server.request_count(), 2);
    server.shutdown();
}

#[tokio::test]
async fn generate_surfaces_missing_model_without_retry() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![failure(404, "model 'nope' not found")]).await;
    let client = OllamaClient::new(OllamaApiConfig::new(&server.base_url)).expect("client");

    let error = client
        .generate(&GenerateRequest::new("nope", "explain", None))
        .await
        .expect_err("missing model fails");

    assert!(matches!(
        error,
        OllamaApiError::Status(status, ref message)
            if status.as_u16() == 404 && message == "model 'nope' not found"
    ));
    assert_eq!(server.request_count(), 1);
    server.shutdown();
}
