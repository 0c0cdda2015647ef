//! Response helpers shared by the dashboard endpoints.

use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
    pub const TEXT_HTML: &str = "text/html; charset=utf-8";
    pub const APPLICATION_JSON: &str = "application/json";
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build a response with the given status, body and content type
    pub fn with_body(status: StatusCode, body: Vec<u8>, content_type: &str) -> Response<Vec<u8>> {
        let mut builder = Response::builder().status(status);

        match HeaderValue::from_str(content_type) {
            Ok(header_value) => {
                builder = builder.header(header::CONTENT_TYPE, header_value);
            }
            Err(e) => {
                log::error!("Invalid content type '{}': {}", content_type, e);
            }
        }

        builder.body(body).unwrap_or_else(|e| {
            log::error!("Failed to build response: {}", e);
            Self::internal_error()
        })
    }

    pub fn html(body: String) -> Response<Vec<u8>> {
        Self::with_body(StatusCode::OK, body.into_bytes(), content_type::TEXT_HTML)
    }

    /// Build a JSON response, falling back to a 500 if serialization fails
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Response<Vec<u8>> {
        match serde_json::to_vec(data) {
            Ok(json_body) => Self::with_body(status, json_body, content_type::APPLICATION_JSON),
            Err(e) => {
                log::error!("Failed to serialize JSON response: {}", e);
                Self::internal_error()
            }
        }
    }

    /// Build a plain text error response
    pub fn error(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        Self::with_body(status, message.as_bytes().to_vec(), content_type::TEXT_PLAIN)
    }

    pub fn not_found() -> Response<Vec<u8>> {
        Self::error(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn internal_error() -> Response<Vec<u8>> {
        let mut response = Response::new(b"Internal Server Error".to_vec());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}
