//! URL utilities for consistent endpoint construction
//!
//! The backend exposes endpoints at fixed paths off one base URL; these
//! helpers keep joins free of doubled or missing slashes regardless of how
//! the user wrote the base URL.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use chatbowl::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:5050"), "http://localhost:5050");
/// assert_eq!(normalize_base_url("http://localhost:5050/"), "http://localhost:5050");
/// assert_eq!(normalize_base_url("http://localhost:5050///"), "http://localhost:5050");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Prefix `http://` when the user omitted a scheme entirely
///
/// # Examples
///
/// ```
/// use chatbowl::utils::url::ensure_scheme;
///
/// assert_eq!(ensure_scheme("localhost:5050"), "http://localhost:5050");
/// assert_eq!(ensure_scheme("https://bowl.example.com"), "https://bowl.example.com");
/// ```
pub fn ensure_scheme(base_url: &str) -> String {
    if base_url.contains("://") {
        base_url.to_string()
    } else {
        format!("http://{base_url}")
    }
}

/// Construct a complete endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use chatbowl::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:5050", "send_message"),
///     "http://localhost:5050/send_message"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:5050/", "/api/personas"),
///     "http://localhost:5050/api/personas"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(
            normalize_base_url("http://localhost:5050/"),
            "http://localhost:5050"
        );
        assert_eq!(
            normalize_base_url("http://localhost:5050///"),
            "http://localhost:5050"
        );
        assert_eq!(
            normalize_base_url("http://localhost:5050"),
            "http://localhost:5050"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn joins_without_doubled_slashes() {
        assert_eq!(
            construct_api_url("http://localhost:5050", "send_message"),
            "http://localhost:5050/send_message"
        );
        assert_eq!(
            construct_api_url("http://localhost:5050/", "send_message"),
            "http://localhost:5050/send_message"
        );
        assert_eq!(
            construct_api_url("http://localhost:5050", "/api/generate-image"),
            "http://localhost:5050/api/generate-image"
        );
        assert_eq!(
            construct_api_url("http://localhost:5050///", "///health"),
            "http://localhost:5050/health"
        );
    }

    #[test]
    fn scheme_is_added_only_when_missing() {
        assert_eq!(ensure_scheme("bowl.example.com:8080"), "http://bowl.example.com:8080");
        assert_eq!(ensure_scheme("http://127.0.0.1:5050"), "http://127.0.0.1:5050");
        assert_eq!(ensure_scheme("https://bowl.example.com"), "https://bowl.example.com");
    }
}
