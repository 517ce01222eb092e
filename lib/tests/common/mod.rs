#![allow(dead_code)]

use anyhow::{anyhow, Result};
use oxigraph::model::{Literal, NamedNode};
use podsync::http::{Fetcher, Request, Response};
use podsync::term::Statement;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DOC: &str = "https://x/doc";
pub const TITLE: &str = "http://purl.org/dc/terms/title";

/// Answers requests from a fixed script, in order, and records what was sent.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Response>) -> Self {
        ScriptedFetcher {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn push(&self, response: Response) {
        self.responses.lock().unwrap().push_back(response);
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, request: Request) -> Result<Response> {
        let next = self.responses.lock().unwrap().pop_front();
        let summary = format!("{} {}", request.method, request.url);
        self.requests.lock().unwrap().push(request);
        next.ok_or_else(|| anyhow!("unexpected request: {}", summary))
    }
}

pub fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

pub fn title(value: &str) -> Statement {
    Statement::new(iri(DOC), iri(TITLE), Literal::new_simple_literal(value))
}

pub fn status(url: &str, code: u16) -> Response {
    Response::new(url, StatusCode::from_u16(code).unwrap())
}

pub fn turtle(url: &str, body: &str) -> Response {
    status(url, 200)
        .with_header(CONTENT_TYPE, "text/turtle")
        .with_body(body)
}

pub fn created_at(container: &str, location: &str) -> Response {
    status(container, 201).with_header(LOCATION, location)
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}
