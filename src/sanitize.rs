//! URL allow-list applied before saved URLs are handed to window creation.
//!
//! Only web pages and the blank page are reopened; privileged or internal
//! pages (settings, debugging, `javascript:`, `file:`) are replaced with
//! `about:blank` so recreating a workspace never relaunches them.

/// The blank page substituted for rejected URLs.
pub const BLANK_PAGE: &str = "about:blank";

const ALLOWED_PREFIXES: &[&str] = &["http://", "https://"];

/// Whether `url` may be passed to window creation unchanged.
pub fn is_allowed(url: &str) -> bool {
    url == BLANK_PAGE || ALLOWED_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// Filter `urls` through the allow-list, preserving length and order.
pub fn sanitize<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    urls.iter()
        .map(|url| {
            let url = url.as_ref();
            if is_allowed(url) {
                url.to_string()
            } else {
                log::warn!("Replacing disallowed URL with {}: {}", BLANK_PAGE, url);
                BLANK_PAGE.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let urls = ["https://a", "about:blank", "javascript:alert(1)", "ftp://x"];
        assert_eq!(
            sanitize(&urls),
            vec!["https://a", "about:blank", "about:blank", "about:blank"]
        );
    }

    #[test]
    fn test_internal_pages_rejected() {
        assert!(!is_allowed("chrome://settings"));
        assert!(!is_allowed("about:debugging"));
        assert!(!is_allowed("file:///etc/passwd"));
        assert!(!is_allowed("about:blank#x"));
        assert!(!is_allowed("HTTP://upper.example"));
    }

    #[test]
    fn test_web_pages_pass_through() {
        assert!(is_allowed("http://example.com/path?q=1"));
        assert!(is_allowed("https://example.com"));
    }

    #[test]
    fn test_empty_input() {
        let urls: Vec<String> = Vec::new();
        assert!(sanitize(&urls).is_empty());
    }
}
