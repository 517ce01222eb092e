//! The request mechanism the synchronization engine talks through.
//!
//! The engine only depends on the [`Fetcher`] trait: something that takes a [`Request`] and
//! returns a [`Response`] with a status, headers and body. [`ReqwestFetcher`] is the blocking
//! `reqwest` implementation used by the CLI; tests and embedding applications can supply
//! their own.

use crate::config::Config;
use anyhow::Result;
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};

/// An outgoing request. Locations are always absolute.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Self {
        Request {
            method,
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: &str) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn put(url: &str) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: &str) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: &str) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the request body as text, for diagnostics.
    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

/// A completed exchange with the store.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final location of the response, after any redirects.
    pub url: String,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    /// Builds a response whose status text is the canonical reason phrase.
    pub fn new(url: &str, status: StatusCode) -> Self {
        Response {
            url: url.to_string(),
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the first value of the named header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|h| h.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one request/response exchange. Transport failures are returned as errors;
/// non-success statuses are not, the engine decides what they mean.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: Request) -> Result<Response>;
}

/// [`Fetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .redirect(Policy::limited(config.max_redirects));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    fn fetch(&self, request: Request) -> Result<Response> {
        debug!("{} {}", request.method, request.url);
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let resp = builder.send()?;
        let status = resp.status();
        let url = resp.url().to_string();
        let headers = resp.headers().clone();
        let body = resp.bytes()?.to_vec();
        debug!("{} -> {}", url, status);
        Ok(Response {
            url,
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::LINK;

    #[test]
    fn test_request_headers_accumulate() {
        let request = Request::post("https://x/c/")
            .header(LINK, HeaderValue::from_static("<a>; rel=\"type\""))
            .header(LINK, HeaderValue::from_static("<b>; rel=\"type\""))
            .body("data");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.get_all(LINK).iter().count(), 2);
        assert_eq!(request.body_text(), "data");
        assert_eq!(Request::delete("https://x/doc").body_text(), "");
    }

    #[test]
    fn test_response_helpers() {
        let response = Response::new("https://x/doc", StatusCode::FORBIDDEN)
            .with_header(CONTENT_TYPE, "text/turtle; charset=utf-8")
            .with_body("nope");
        assert!(!response.is_success());
        assert_eq!(response.status_text, "Forbidden");
        assert_eq!(response.content_type(), Some("text/turtle; charset=utf-8"));
        assert_eq!(response.text(), "nope");
    }
}
