use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Build the HTTP client shared by all adapters. Every outbound call carries
/// an explicit timeout; the default (40s) covers a 30s long-poll read window
/// plus a 10s buffer.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using default");
            Client::new()
        })
}

/// Find the largest byte index <= `max_bytes` that is a valid char boundary.
pub(crate) fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// A short body excerpt for protocol-error messages.
pub(crate) fn body_excerpt(body: &str) -> &str {
    &body[..truncate_at_char_boundary(body, 500)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        let s = "ab€cd"; // € is 3 bytes at index 2..5
        assert_eq!(truncate_at_char_boundary(s, 3), 2);
        assert_eq!(truncate_at_char_boundary(s, 5), 5);
        assert_eq!(truncate_at_char_boundary(s, 100), s.len());
    }

    #[test]
    fn test_body_excerpt_short_body_unchanged() {
        assert_eq!(body_excerpt("{\"ok\":true}"), "{\"ok\":true}");
    }
}
