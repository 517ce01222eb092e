// Error types raised by the synchronization engine. They are returned wrapped in
// anyhow::Error; callers recover them with `downcast_ref`.

use crate::http::Response;
use reqwest::StatusCode;
use std::fmt;

/// The store answered with a non-success status.
#[derive(Debug)]
pub struct FetchError {
    pub message: String,
    pub response: Response,
}

impl FetchError {
    pub fn new(message: impl Into<String>, response: Response) -> Self {
        FetchError {
            message: message.into(),
            response,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.response.status
    }

    pub fn status_text(&self) -> &str {
        &self.response.status_text
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// A successful response lacked a header the operation cannot complete without.
#[derive(Debug)]
pub struct MissingHeaderError {
    pub header: String,
    pub url: String,
}

impl fmt::Display for MissingHeaderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "The response from {} did not include a {} header",
            self.url, self.header
        )
    }
}

impl std::error::Error for MissingHeaderError {}

/// A container operation was called with a location that is not container-shaped.
#[derive(Debug)]
pub struct NotAContainerError {
    pub url: String,
}

impl fmt::Display for NotAContainerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} is not a container: container locations end with a slash",
            self.url
        )
    }
}

impl std::error::Error for NotAContainerError {}

/// The graph has never been fetched or saved, so it has no location to act on.
#[derive(Debug)]
pub struct UnknownLocationError;

impl fmt::Display for UnknownLocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "The graph has no known location; save it before deleting it")
    }
}

impl std::error::Error for UnknownLocationError {}
