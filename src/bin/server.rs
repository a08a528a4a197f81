//! HTTP server for the review dashboard
//! Plain tokio listener with hand-rolled request parsing

use plan_review::catalog::FieldCatalog;
use plan_review::config::AppConfig;
use plan_review::learning_store::LearningStore;
use plan_review::types::FieldValue;
use plan_review::validation::validate_all;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BYTES: usize = 1 << 20;

struct AppState {
    catalog: FieldCatalog,
    store: LearningStore,
}

type SharedState = Arc<Mutex<AppState>>;

#[derive(Deserialize)]
struct ValidateRequest {
    /// Object keys stay in request order
    fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct SynonymRequest {
    term: String,
    synonym: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Deserialize)]
struct CorrectionRequest {
    incorrect: String,
    correct: String,
    #[serde(default)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let store = LearningStore::open(&config.mappings_path)?;
    let state = Arc::new(Mutex::new(AppState {
        catalog: FieldCatalog::standard(),
        store,
    }));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Review dashboard listening on http://{}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, state.clone()));
    }
}

async fn handle_connection(mut stream: TcpStream, state: SharedState) {
    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
    };
    let response = handle_request(&request, &state).await;
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

/// Read the head, then keep reading until Content-Length bytes of body arrived.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];
    loop {
        let size = stream.read(&mut buffer).await?;
        if size == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..size]);
        if data.len() >= MAX_REQUEST_BYTES {
            warn!("Request exceeds {} bytes, truncating", MAX_REQUEST_BYTES);
            break;
        }
        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            if data.len() >= expected_len(&text[..head_end]) {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Bytes a complete request takes: head, blank line, declared body.
fn expected_len(head: &str) -> usize {
    head.len().saturating_add(4).saturating_add(content_length(head))
}

fn request_body(request: &str) -> &str {
    request
        .find("\r\n\r\n")
        .map(|start| request[start + 4..].trim())
        .unwrap_or("")
}

async fn handle_request(request: &str, state: &SharedState) -> String {
    let Some(request_line) = request.lines().next() else {
        return create_response(400, "Bad Request", r#"{"error":"Empty request"}"#);
    };
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", r#"{"error":"Malformed request line"}"#);
    }

    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or("/").trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    info!("Request: {} {}", method, path);

    let body = request_body(request);
    match (method, path) {
        ("OPTIONS", _) => create_response(204, "No Content", ""),
        ("GET", "/api/health") => {
            create_response(200, "OK", r#"{"status":"ok","service":"plan-review-dashboard"}"#)
        }
        ("GET", "/api/catalog") => {
            let state = state.lock().await;
            let fields: Vec<_> = state.catalog.fields().collect();
            json_response(200, "OK", &serde_json::json!({ "fields": fields }))
        }
        ("POST", "/api/validate") => {
            let parsed: ValidateRequest = match serde_json::from_str(body) {
                Ok(parsed) => parsed,
                Err(e) => return bad_request(&format!("Invalid validate body: {}", e)),
            };
            let fields: Vec<(String, FieldValue)> = parsed
                .fields
                .into_iter()
                .map(|(label, value)| {
                    let value = match value {
                        serde_json::Value::Null => FieldValue::Missing,
                        serde_json::Value::String(s) => FieldValue::parse(Some(s.as_str())),
                        other => FieldValue::parse(Some(other.to_string().as_str())),
                    };
                    (label, value)
                })
                .collect();
            let state = state.lock().await;
            let report = validate_all(&fields, &state.catalog, &state.store);
            json_response(200, "OK", &report)
        }
        ("POST", "/api/teach/synonym") => {
            let parsed: SynonymRequest = match serde_json::from_str(body) {
                Ok(parsed) => parsed,
                Err(e) => return bad_request(&format!("Invalid synonym body: {}", e)),
            };
            let user = parsed.user.as_deref().unwrap_or("user");
            let mut state = state.lock().await;
            match state.store.teach_synonym(&parsed.term, &parsed.synonym, user) {
                Ok(()) => json_response(
                    200,
                    "OK",
                    &serde_json::json!({
                        "success": true,
                        "synonyms": state.store.mappings().synonyms.get(parsed.term.trim()),
                    }),
                ),
                Err(e) => teach_error(e),
            }
        }
        ("POST", "/api/teach/correction") => {
            let parsed: CorrectionRequest = match serde_json::from_str(body) {
                Ok(parsed) => parsed,
                Err(e) => return bad_request(&format!("Invalid correction body: {}", e)),
            };
            let user = parsed.user.as_deref().unwrap_or("user");
            let mut state = state.lock().await;
            match state.store.teach_correction(&parsed.incorrect, &parsed.correct, user) {
                Ok(()) => json_response(200, "OK", &serde_json::json!({ "success": true })),
                Err(e) => teach_error(e),
            }
        }
        ("GET", "/api/history") => {
            let state = state.lock().await;
            json_response(
                200,
                "OK",
                &serde_json::json!({ "history": state.store.recent_history(10) }),
            )
        }
        _ => create_response(404, "Not Found", r#"{"error":"Not found"}"#),
    }
}

fn teach_error(e: plan_review::error::ReviewError) -> String {
    match e {
        plan_review::error::ReviewError::InvalidInput(_) => bad_request(&e.to_string()),
        other => {
            error!("Teaching failed: {}", other);
            json_response(
                500,
                "Internal Server Error",
                &serde_json::json!({ "error": other.to_string() }),
            )
        }
    }
}

fn bad_request(message: &str) -> String {
    json_response(400, "Bad Request", &serde_json::json!({ "error": message }))
}

fn json_response<T: serde::Serialize>(status: u16, status_text: &str, body: &T) -> String {
    match serde_json::to_string(body) {
        Ok(json) => create_response(status, status_text, &json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            create_response(500, "Internal Server Error", r#"{"error":"Failed to serialize response"}"#)
        }
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SharedState {
        Arc::new(Mutex::new(AppState {
            catalog: FieldCatalog::standard(),
            store: LearningStore::in_memory(),
        }))
    }

    fn post(path: &str, body: &str) -> String {
        format!(
            "POST {} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            path,
            body.len(),
            body
        )
    }

    fn body_json(response: &str) -> serde_json::Value {
        serde_json::from_str(request_body(response)).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let state = state();
        let health = handle_request("GET /api/health HTTP/1.1\r\n\r\n", &state).await;
        assert!(health.starts_with("HTTP/1.1 200 OK"));
        assert!(health.contains("Access-Control-Allow-Origin: *"));

        let missing = handle_request("GET /api/nope HTTP/1.1\r\n\r\n", &state).await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[tokio::test]
    async fn test_validate_route() {
        let state = state();
        let response = handle_request(
            &post(
                "/api/validate",
                r#"{"fields":{"COBRA":"18 MONTHS post-employment","Retirees":"Not eligible","Subrogation":null,"Vision Rider":"Covered"}}"#,
            ),
            &state,
        )
        .await;
        let report = body_json(&response);

        assert_eq!(report["fields_validated"], 3);
        assert_eq!(report["fields_found"], 1);
        assert_eq!(report["fields_missing"], 1);
        assert_eq!(report["field_results"]["Retirees"]["status"], "unidentifiable");
        assert_eq!(report["warnings"][2], "Unrecognized field 'Vision Rider' skipped");
    }

    #[tokio::test]
    async fn test_validate_keeps_request_order() {
        let state = state();
        let response = handle_request(
            &post("/api/validate", r#"{"fields":{"Subrogation":null,"COBRA":"N/F","Retirees":42}}"#),
            &state,
        )
        .await;
        let report = body_json(&response);

        assert_eq!(
            report["warnings"],
            serde_json::json!([
                "No information found for Subrogation",
                "No information found for COBRA",
                "Could not identify '42' for Retirees",
            ])
        );
    }

    #[tokio::test]
    async fn test_teach_then_history() {
        let state = state();
        let taught = handle_request(
            &post("/api/teach/synonym", r#"{"term":"COBRA","synonym":"continuation"}"#),
            &state,
        )
        .await;
        assert_eq!(body_json(&taught)["synonyms"][0], "continuation");

        let rejected =
            handle_request(&post("/api/teach/correction", r#"{"incorrect":" ","correct":"x"}"#), &state)
                .await;
        assert!(rejected.starts_with("HTTP/1.1 400"));

        let history = handle_request("GET /api/history HTTP/1.1\r\n\r\n", &state).await;
        let history = body_json(&history);
        assert_eq!(history["history"].as_array().unwrap().len(), 1);
        assert_eq!(history["history"][0]["user"], "user");
    }

    #[test]
    fn test_content_length_header() {
        assert_eq!(content_length("POST / HTTP/1.1\r\ncontent-length: 42"), 42);
        assert_eq!(content_length("GET / HTTP/1.1"), 0);
    }

    #[test]
    fn test_expected_len_saturates() {
        let head = "POST / HTTP/1.1\r\nContent-Length: 5";
        assert_eq!(expected_len(head), head.len() + 4 + 5);

        let huge = format!("POST / HTTP/1.1\r\nContent-Length: {}", usize::MAX);
        assert_eq!(expected_len(&huge), usize::MAX);
    }
}
