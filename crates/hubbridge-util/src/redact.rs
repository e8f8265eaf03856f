//! Masking of credentials for display.

use std::collections::BTreeMap;

/// Header names whose values are always masked.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "proxy-authorization", "cookie", "x-api-key"];

/// Number of leading characters kept visible.
const VISIBLE_PREFIX: usize = 4;

/// Mask a secret, keeping a short prefix so operators can tell values apart.
pub fn redact_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= VISIBLE_PREFIX * 2 {
        return "****".to_string();
    }
    let prefix: String = chars[..VISIBLE_PREFIX].iter().collect();
    format!("{prefix}****")
}

/// Check if a header carries credentials.
pub fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_HEADERS.contains(&lower.as_str()) || lower.contains("token") || lower.contains("secret")
}

/// Copy a header map, masking every sensitive value.
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive_header(name) {
                redact_value(value)
            } else {
                value.clone()
            };
            (name.clone(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_short_value() {
        assert_eq!(redact_value("abc"), "****");
        assert_eq!(redact_value(""), "****");
    }

    #[test]
    fn test_redact_long_value_keeps_prefix() {
        assert_eq!(redact_value("Bearer secret-token"), "Bear****");
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer secret-token".to_string());
        headers.insert("X-Team".to_string(), "platform".to_string());
        headers.insert("X-Refresh-Token".to_string(), "0123456789".to_string());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted["Authorization"], "Bear****");
        assert_eq!(redacted["X-Team"], "platform");
        assert_eq!(redacted["X-Refresh-Token"], "0123****");
    }
}
