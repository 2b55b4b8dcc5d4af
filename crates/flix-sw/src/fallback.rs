//! Synthesized responses for when neither cache nor network can answer.

use http::StatusCode;
use serde_json::json;

use crate::response::Response;

/// Generic offline response.
pub fn offline() -> Response {
    Response::new(StatusCode::SERVICE_UNAVAILABLE, "Offline")
        .with_status_text("Offline")
        .with_content_type("text/plain; charset=utf-8")
}

/// Media that is neither cached nor reachable.
pub fn video_unavailable() -> Response {
    Response::new(StatusCode::NOT_FOUND, "Video unavailable offline")
        .with_status_text("Video unavailable")
        .with_content_type("text/plain; charset=utf-8")
}

/// The catalog, empty, so the page can still render its shelves.
pub fn empty_catalog() -> Response {
    let body = json!({ "movies": [], "shows": [] }).to_string();
    Response::new(StatusCode::SERVICE_UNAVAILABLE, body)
        .with_status_text("Offline")
        .with_content_type("application/json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline() {
        let response = offline();
        assert_eq!(response.status, 503);
        assert_eq!(response.text().unwrap(), "Offline");
        assert!(response.content_type().unwrap().starts_with("text/plain"));
    }

    #[test]
    fn test_video_unavailable() {
        let response = video_unavailable();
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Video unavailable");
        assert!(response.text().unwrap().contains("unavailable"));
    }

    #[test]
    fn test_empty_catalog_shape() {
        let response = empty_catalog();
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));

        let value: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(value, json!({ "movies": [], "shows": [] }));
    }
}
