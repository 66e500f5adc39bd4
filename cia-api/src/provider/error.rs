//! Provider client errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Provider API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider API key not configured")]
    NotConfigured,
}

impl ProviderError {
    /// Map a non-success HTTP status and body onto an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Unauthorized(status),
            429 => ProviderError::RateLimited,
            _ => ProviderError::Api(status, truncate(body, 512)),
        }
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(ProviderError::from_status(401, String::new()), ProviderError::Unauthorized(401)));
        assert!(matches!(ProviderError::from_status(403, String::new()), ProviderError::Unauthorized(403)));
        assert!(matches!(ProviderError::from_status(429, String::new()), ProviderError::RateLimited));
        assert!(matches!(ProviderError::from_status(500, "boom".into()), ProviderError::Api(500, ref b) if b == "boom"));
    }

    #[test]
    fn test_long_bodies_truncated() {
        let body = "é".repeat(600);
        match ProviderError::from_status(502, body) {
            ProviderError::Api(_, msg) => assert!(msg.len() <= 512 + '…'.len_utf8()),
            other => panic!("unexpected {:?}", other),
        }
    }
}
