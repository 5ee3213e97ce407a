//! Request-by-path transport for topology JSON.
//!
//! Implementations must be `Send + Sync` for use across async tasks.
//! Methods return boxed futures for dyn-compatibility.

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use serde_json::Value;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Network, status or decoding failure of a single request.
#[derive(Debug)]
pub struct TransportError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub trait Transport: Send + Sync {
    /// Fetch `path` (relative, including its query string) and decode the body as JSON.
    fn get_json(&self, path: &str) -> BoxFuture<'_, Result<Value, TransportError>>;
}

/// HTTP transport rooted at a base URL such as `https://ops.example.com`.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, path: &str) -> BoxFuture<'_, Result<Value, TransportError>> {
        let url = self.url_for(path);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TransportError::with_source("HTTP request failed", e))?;

            if !resp.status().is_success() {
                return Err(TransportError::new(format!(
                    "HTTP error: {}",
                    resp.status()
                )));
            }

            resp.json::<Value>()
                .await
                .map_err(|e| TransportError::with_source("Failed to decode response", e))
        })
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Fail(String),
}

/// In-memory transport for tests and offline runs.
///
/// Replies are registered against path patterns: a plain pattern matches as a
/// prefix, `head*tail` matches paths that start with `head` and end with
/// `tail`. The longest matching pattern answers; unmatched paths fail. Every
/// requested path is recorded.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<Vec<(String, Reply)>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, pattern: impl Into<String>, body: Value) {
        self.routes.lock().push((pattern.into(), Reply::Json(body)));
    }

    pub fn fail(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.routes
            .lock()
            .push((pattern.into(), Reply::Fail(message.into())));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn answer(&self, path: &str) -> Result<Value, TransportError> {
        self.requests.lock().push(path.to_string());
        let routes = self.routes.lock();
        let best = routes
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, path))
            .max_by_key(|(pattern, _)| pattern.len());
        match best {
            Some((_, Reply::Json(v))) => Ok(v.clone()),
            Some((_, Reply::Fail(msg))) => Err(TransportError::new(msg.clone())),
            None => Err(TransportError::new(format!("no route for {path}"))),
        }
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.split_once('*') {
        Some((head, tail)) => {
            path.len() >= head.len() + tail.len() && path.starts_with(head) && path.ends_with(tail)
        }
        None => path.starts_with(pattern),
    }
}

impl Transport for MemoryTransport {
    fn get_json(&self, path: &str) -> BoxFuture<'_, Result<Value, TransportError>> {
        let result = self.answer(path);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpTransport, MemoryTransport, Transport, TransportError};
    use serde_json::json;

    #[tokio::test]
    async fn longest_prefix_answers() {
        let t = MemoryTransport::new();
        t.reply("/proxy_service/topology/resources", json!({"_items": []}));
        t.reply("/proxy_service/topology/resources/g1", json!({"_items": [{"_id": "x"}]}));

        let v = t
            .get_json("/proxy_service/topology/resources/g1/references/out/groups?_limit=1")
            .await
            .unwrap();
        assert_eq!(v["_items"][0]["_id"], "x");

        let v = t.get_json("/proxy_service/topology/resources?_type=host").await.unwrap();
        assert_eq!(v, json!({"_items": []}));
        assert_eq!(t.requests().len(), 2);
    }

    #[tokio::test]
    async fn wildcard_patterns_match_head_and_tail() {
        let t = MemoryTransport::new();
        t.reply("/proxy_service/topology/resources?*&_type=host", json!({"host": true}));
        t.reply("/proxy_service/topology/resources?*&_type=router", json!({"router": true}));

        let v = t
            .get_json("/proxy_service/topology/resources?_limit=5&_type=router")
            .await
            .unwrap();
        assert_eq!(v, json!({"router": true}));
        assert!(t.get_json("/proxy_service/topology/resources?_type=switch").await.is_err());
    }

    #[tokio::test]
    async fn failures_and_unknown_paths_error() {
        let t = MemoryTransport::new();
        t.fail("/down", "connection refused");
        let err = t.get_json("/down/here").await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert!(t.get_json("/elsewhere").await.is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let t = HttpTransport::new("http://localhost:8080/");
        assert_eq!(
            t.url_for("/proxy_service/topology/groups?_type=site"),
            "http://localhost:8080/proxy_service/topology/groups?_type=site"
        );
    }

    #[test]
    fn error_display_includes_source() {
        let io = std::io::Error::other("reset");
        let err = TransportError::with_source("HTTP request failed", io);
        assert_eq!(err.to_string(), "HTTP request failed: reset");
    }
}
