use thiserror::Error;
use url::Url;

/// Scheme prepended to inputs that carry neither `http://` nor `https://`.
pub const DEFAULT_SCHEME_PREFIX: &str = "http://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("url is required")]
    Empty,
    #[error("invalid url format: {0}")]
    Malformed(String),
}

/// Turns user input into the target string codes are derived from.
///
/// Surrounding whitespace is trimmed and `http://` is prepended when the
/// input has no `http://` or `https://` prefix (case-insensitive). The result
/// must then parse as a URL. The accepted string is returned as written, not
/// re-serialized, so `normalize_url(normalize_url(x)?)` equals
/// `normalize_url(x)`.
pub fn normalize_url(raw: &str) -> Result<String, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{trimmed}")
    };

    Url::parse(&candidate).map_err(|e| UrlError::Malformed(format!("{candidate}: {e}")))?;

    Ok(candidate)
}

fn has_http_scheme(s: &str) -> bool {
    let starts_with = |prefix: &[u8]| {
        s.as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with(b"http://") || starts_with(b"https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_default_scheme() {
        assert_eq!(
            normalize_url("example.com/page").unwrap(),
            "http://example.com/page"
        );
    }

    #[test]
    fn keeps_existing_scheme_case_insensitively() {
        assert_eq!(
            normalize_url("https://example.com").unwrap(),
            "https://example.com"
        );
        assert_eq!(
            normalize_url("HTTPS://Example.com/X").unwrap(),
            "HTTPS://Example.com/X"
        );
        assert_eq!(normalize_url("Http://a.test").unwrap(), "Http://a.test");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            normalize_url("  \thttps://example.com/a \n").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn empty_and_blank_are_rejected() {
        assert_eq!(normalize_url(""), Err(UrlError::Empty));
        assert_eq!(normalize_url("   "), Err(UrlError::Empty));
    }

    #[test]
    fn spaces_in_host_are_rejected() {
        let err = normalize_url("not a url with spaces and no scheme").unwrap_err();
        assert!(matches!(err, UrlError::Malformed(_)));
    }

    #[test]
    fn scheme_without_host_is_rejected() {
        assert!(matches!(
            normalize_url("http://"),
            Err(UrlError::Malformed(_))
        ));
    }

    #[test]
    fn is_idempotent() {
        for raw in ["example.com", " HTTP://a.test/x?y=1 ", "https://b.test/#frag"] {
            let once = normalize_url(raw).unwrap();
            assert_eq!(normalize_url(&once).unwrap(), once);
        }
    }

    #[test]
    fn non_ascii_prefix_does_not_panic() {
        let _ = normalize_url("λx.test");
    }
}
