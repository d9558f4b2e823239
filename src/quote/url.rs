//! Page URL normalization
//!
//! Quotes are matched to pages by URL without query string or fragment, so
//! `https://x.com/a?x=1#frag` and `https://x.com/a` address the same page.

use url::Url;

/// Strip query and fragment from a page URL
///
/// The path is percent-decoded so that differently-encoded forms of the same
/// path compare equal. Inputs that do not parse as absolute URLs are cut at
/// the first `?` or `#`.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) if url.has_host() => {
            url.set_query(None);
            url.set_fragment(None);
            let path = urlencoding::decode(url.path())
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| url.path().to_string());
            let mut out = format!("{}://", url.scheme());
            if let Some(host) = url.host_str() {
                out.push_str(host);
            }
            if let Some(port) = url.port() {
                out.push_str(&format!(":{}", port));
            }
            out.push_str(&path);
            out
        }
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_and_fragment() {
        assert_eq!(normalize_url("https://x.com/a?x=1#frag"), "https://x.com/a");
        assert_eq!(normalize_url("https://x.com/a#frag"), "https://x.com/a");
        assert_eq!(normalize_url("https://x.com/a"), "https://x.com/a");
    }

    #[test]
    fn test_keeps_port_and_decodes_path() {
        assert_eq!(
            normalize_url("http://localhost:8080/docs/caf%C3%A9?lang=fr"),
            "http://localhost:8080/docs/café"
        );
    }

    #[test]
    fn test_root_path() {
        assert_eq!(normalize_url("https://x.com?q=1"), "https://x.com/");
        assert_eq!(normalize_url("https://x.com/#top"), "https://x.com/");
    }

    #[test]
    fn test_unparsable_falls_back_to_split() {
        assert_eq!(normalize_url("/relative/page?x=1"), "/relative/page");
        assert_eq!(normalize_url("page#section"), "page");
    }
}
