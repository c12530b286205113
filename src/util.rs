//! Shared helpers for the HTTP handlers.

use axum::http::StatusCode;

/// Map any displayable error to a 500 response carrying its message.
pub fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Link to the task page for a worker.
pub fn task_url(uid: &str) -> String {
    format!("/task?uid={}", urlencoding::encode(uid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_url_encodes_uid() {
        assert_eq!(task_url("bob"), "/task?uid=bob");
        assert_eq!(task_url("a b&c"), "/task?uid=a%20b%26c");
    }

    #[test]
    fn internal_error_is_500() {
        let (status, body) = internal_error("disk full");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "disk full");
    }
}
