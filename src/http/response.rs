//! Response builder and the frozen response handed back to the runtime.

use bytes::Bytes;
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Body returned by [`ContextResponse::json`] when the value cannot be encoded.
pub const JSON_ENCODING_ERROR: &str = "Error encoding JSON.";

const DEFAULT_STATUS: u16 = 200;

/// Final response of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOutput {
    pub body: Bytes,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
}

impl ResponseOutput {
    /// Get the body as text.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Convert into a hyper response. Unknown status codes become 500.
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = hyper::StatusCode::from_u16(self.status_code).unwrap_or_else(|_| {
            warn!(
                "Invalid status code {}, falling back to 500 Internal Server Error",
                self.status_code
            );
            hyper::StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = status;
        for (name, value) in self.headers {
            match (
                hyper::header::HeaderName::from_bytes(name.as_bytes()),
                hyper::header::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => warn!("Dropping invalid response header {:?}", name),
            }
        }
        response
    }
}

/// Optional status code and headers for a response.
#[derive(Debug, Clone, Default)]
pub struct ResponseOptions {
    status_code: Option<u16>,
    headers: Option<HashMap<String, String>>,
}

impl ResponseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code. `0` means the default.
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Replace the headers.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a single header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Builds [`ResponseOutput`] values for a function.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResponse;

impl ContextResponse {
    pub fn new() -> Self {
        Self
    }

    /// Response with a raw body. Status defaults to 200 and headers to empty.
    pub fn binary(&self, body: impl Into<Bytes>, options: ResponseOptions) -> ResponseOutput {
        let status_code = match options.status_code {
            Some(0) | None => DEFAULT_STATUS,
            Some(code) => code,
        };

        ResponseOutput {
            body: body.into(),
            status_code,
            headers: options.headers.unwrap_or_default(),
        }
    }

    pub fn send(&self, body: impl Into<String>, options: ResponseOptions) -> ResponseOutput {
        self.text(body, options)
    }

    pub fn text(&self, body: impl Into<String>, options: ResponseOptions) -> ResponseOutput {
        self.binary(body.into(), options)
    }

    /// JSON response. Encoding failures yield a 500 with [`JSON_ENCODING_ERROR`].
    pub fn json<T: Serialize + ?Sized>(&self, body: &T, options: ResponseOptions) -> ResponseOutput {
        let options = options.header("content-type", "application/json");

        match serde_json::to_vec(body) {
            Ok(json) => self.binary(json, options),
            Err(e) => {
                warn!("Failed to encode JSON response: {}", e);
                self.text(JSON_ENCODING_ERROR, options.status_code(500))
            }
        }
    }

    /// 204 with no body.
    pub fn empty(&self) -> ResponseOutput {
        self.text("", ResponseOptions::new().status_code(204))
    }

    /// Redirect to `url`. Status defaults to 301.
    pub fn redirect(&self, url: impl Into<String>, options: ResponseOptions) -> ResponseOutput {
        let mut options = options.header("location", url);
        if options.status_code.is_none() {
            options.status_code = Some(301);
        }
        self.text("", options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::ser::Error as _;

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("broken"))
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_text_defaults() {
        let response = ContextResponse::new().text("hello", ResponseOptions::new());
        assert_eq!(response.status_code, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.text_body(), "hello");
    }

    #[test]
    fn test_zero_status_means_default() {
        let response = ContextResponse::new().send("x", ResponseOptions::new().status_code(0));
        assert_eq!(response.status_code, 200);
    }

    #[test]
    fn test_options_apply() {
        let response = ContextResponse::new().binary(
            vec![1u8, 2, 3],
            ResponseOptions::new()
                .status_code(201)
                .headers(headers(&[("x-id", "7")])),
        );
        assert_eq!(response.status_code, 201);
        assert_eq!(response.headers, headers(&[("x-id", "7")]));
        assert_eq!(response.body, Bytes::from_static(&[1, 2, 3]));
    }

    #[test]
    fn test_json() {
        let response = ContextResponse::new().json(
            &serde_json::json!({"ok": true}),
            ResponseOptions::new().header("x-trace", "abc"),
        );
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.headers,
            headers(&[("x-trace", "abc"), ("content-type", "application/json")])
        );
        let body: serde_json::Value = response.json_body().unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_json_encoding_failure() {
        let response = ContextResponse::new().json(&Broken, ResponseOptions::new().status_code(201));
        assert_eq!(response.status_code, 500);
        assert_eq!(response.text_body(), "Error encoding JSON.");
        assert_eq!(response.headers, headers(&[("content-type", "application/json")]));
    }

    #[test]
    fn test_redirect() {
        let response = ContextResponse::new().redirect("https://x", ResponseOptions::new());
        assert_eq!(response.status_code, 301);
        assert_eq!(response.headers, headers(&[("location", "https://x")]));
        assert!(response.body.is_empty());

        let response = ContextResponse::new()
            .redirect("https://x", ResponseOptions::new().status_code(302));
        assert_eq!(response.status_code, 302);
    }

    #[test]
    fn test_empty() {
        let response = ContextResponse::new().empty();
        assert_eq!(response.status_code, 204);
        assert!(response.body.is_empty());
        assert!(response.headers.is_empty());
    }

    #[tokio::test]
    async fn test_into_hyper() {
        let response = ContextResponse::new()
            .text("created", ResponseOptions::new().status_code(201).header("x-id", "9"))
            .into_hyper();

        assert_eq!(response.status(), hyper::StatusCode::CREATED);
        assert_eq!(response.headers()["x-id"], "9");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"created"));
    }

    #[test]
    fn test_into_hyper_invalid_status() {
        let response = ContextResponse::new()
            .text("", ResponseOptions::new().status_code(42))
            .into_hyper();
        assert_eq!(response.status(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
