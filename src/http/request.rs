//! Normalized view of the inbound request.

use crate::error::ContextError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content-type prefixes whose bodies are handed out as raw bytes.
const BINARY_CONTENT_TYPES: [&str; 5] = ["application/", "audio/", "font/", "image/", "video/"];

/// Request body interpreted according to its `content-type` header.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Map<String, serde_json::Value>),
    Binary(Bytes),
    Text(String),
}

/// Request as seen by a function.
///
/// Header names are lowercase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextRequest {
    #[serde(skip)]
    body_binary: Bytes,
    pub headers: HashMap<String, String>,
    pub method: String,
    pub url: String,
    pub path: String,
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub query_string: String,
    pub query: HashMap<String, String>,
}

impl ContextRequest {
    /// Create a request for `method` and an absolute or path-only `url`.
    pub fn new(method: impl Into<String>, url: impl AsRef<str>) -> Self {
        let uri = url
            .as_ref()
            .parse::<hyper::Uri>()
            .unwrap_or_else(|_| hyper::Uri::from_static("/"));
        let mut request = Self::from_uri(&uri, None);
        request.method = method.into();
        request
    }

    /// Build the view from a hyper request and its collected body.
    pub fn from_hyper<B>(head: &hyper::Request<B>, body: Bytes) -> Self {
        let host_header = head
            .headers()
            .get(hyper::header::HOST)
            .and_then(|value| value.to_str().ok());

        let mut request = Self::from_uri(head.uri(), host_header);
        request.method = head.method().as_str().to_string();
        for (name, value) in head.headers() {
            if let Ok(value) = value.to_str() {
                request
                    .headers
                    .insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        request.body_binary = body;
        request
    }

    fn from_uri(uri: &hyper::Uri, host_header: Option<&str>) -> Self {
        let scheme = uri.scheme_str().unwrap_or("http").to_string();
        let default_port = if scheme == "https" { 443 } else { 80 };

        let (host, port) = match uri.authority() {
            Some(authority) => (
                authority.host().to_string(),
                authority.port_u16().unwrap_or(default_port),
            ),
            None => split_host_header(host_header.unwrap_or_default(), default_port),
        };

        let path = uri.path().to_string();
        let query_string = uri.query().unwrap_or_default().to_string();
        let query = parse_query(&query_string);

        let mut url = format!("{}://{}", scheme, host);
        if port != default_port {
            url.push_str(&format!(":{}", port));
        }
        url.push_str(&path);
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(&query_string);
        }

        Self {
            body_binary: Bytes::new(),
            headers: HashMap::new(),
            method: "GET".to_string(),
            url,
            path,
            port,
            scheme,
            host,
            query_string,
            query,
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body_binary = body.into();
        self
    }

    pub fn set_body_binary(&mut self, body: impl Into<Bytes>) {
        self.body_binary = body.into();
    }

    pub fn body_binary(&self) -> &Bytes {
        &self.body_binary
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body_binary).into_owned()
    }

    pub fn body_raw(&self) -> String {
        self.body_text()
    }

    /// Parse the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        serde_json::from_slice(&self.body_binary).map_err(ContextError::InvalidJsonBody)
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Body interpreted by content type.
    ///
    /// JSON bodies that are empty or fail to parse yield an empty object.
    pub fn body_value(&self) -> RequestBody {
        let content_type = self.content_type();

        if content_type == "application/json" {
            if self.body_binary.is_empty() {
                return RequestBody::Json(serde_json::Map::new());
            }
            return RequestBody::Json(self.body_json().unwrap_or_default());
        }

        if BINARY_CONTENT_TYPES
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
        {
            return RequestBody::Binary(self.body_binary.clone());
        }

        RequestBody::Text(self.body_text())
    }
}

fn split_host_header(value: &str, default_port: u16) -> (String, u16) {
    match value.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (value.to_string(), default_port),
        },
        None => (value.to_string(), default_port),
    }
}

fn parse_query(query_string: &str) -> HashMap<String, String> {
    query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_parses_url() {
        let request = ContextRequest::new("POST", "https://example.com:8443/api/items?limit=5&debug");

        assert_eq!(request.method, "POST");
        assert_eq!(request.scheme, "https");
        assert_eq!(request.host, "example.com");
        assert_eq!(request.port, 8443);
        assert_eq!(request.path, "/api/items");
        assert_eq!(request.query_string, "limit=5&debug");
        assert_eq!(request.query.get("limit"), Some(&"5".to_string()));
        assert_eq!(request.query.get("debug"), Some(&String::new()));
        assert_eq!(request.url, "https://example.com:8443/api/items?limit=5&debug");
    }

    #[test]
    fn test_from_hyper_uses_host_header() {
        let head = hyper::Request::builder()
            .method("PUT")
            .uri("/todos/1?done=true")
            .header("Host", "localhost:3000")
            .header("Content-Type", "text/plain")
            .body(())
            .unwrap();

        let request = ContextRequest::from_hyper(&head, Bytes::from_static(b"hi"));

        assert_eq!(request.method, "PUT");
        assert_eq!(request.host, "localhost");
        assert_eq!(request.port, 3000);
        assert_eq!(request.scheme, "http");
        assert_eq!(request.url, "http://localhost:3000/todos/1?done=true");
        assert_eq!(request.headers.get("content-type"), Some(&"text/plain".to_string()));
        assert_eq!(request.body_text(), "hi");
    }

    #[test]
    fn test_json_body() {
        let request = ContextRequest::new("POST", "/")
            .header("Content-Type", "application/json")
            .body(r#"{"name":"fezz"}"#);

        match request.body_value() {
            RequestBody::Json(map) => assert_eq!(map["name"], "fezz"),
            other => panic!("unexpected body: {:?}", other),
        }

        let value: serde_json::Value = request.body_json().unwrap();
        assert_eq!(value["name"], "fezz");
    }

    #[test]
    fn test_invalid_json_body() {
        let request = ContextRequest::new("POST", "/")
            .header("content-type", "application/json")
            .body("{not json");

        assert_eq!(request.body_value(), RequestBody::Json(serde_json::Map::new()));
        assert!(matches!(
            request.body_json::<serde_json::Value>(),
            Err(ContextError::InvalidJsonBody(_))
        ));
    }

    #[test]
    fn test_empty_json_body() {
        let request = ContextRequest::new("POST", "/").header("content-type", "application/json");
        assert_eq!(request.body_value(), RequestBody::Json(serde_json::Map::new()));
    }

    #[test]
    fn test_binary_and_text_bodies() {
        let image = ContextRequest::new("POST", "/")
            .header("content-type", "image/png")
            .body(vec![0u8, 159, 146, 150]);
        assert_eq!(
            image.body_value(),
            RequestBody::Binary(Bytes::from(vec![0u8, 159, 146, 150]))
        );

        let text = ContextRequest::new("POST", "/").body("plain");
        assert_eq!(text.body_value(), RequestBody::Text("plain".to_string()));
        assert_eq!(text.body_raw(), "plain");
    }
}
