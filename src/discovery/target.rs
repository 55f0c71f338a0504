//! Page target and candidate normalization.

use url::Url;

use super::result::{Candidate, ResultSet};

/// The page a discovery call runs against.
#[derive(Debug, Clone)]
pub struct PageTarget {
    page_url: String,
    parsed: Option<Url>,
}

impl PageTarget {
    /// Wrap a page URL. An unparseable URL is kept; relative candidates are
    /// then passed through unchanged.
    pub fn new(page_url: &str) -> Self {
        let page_url = page_url.trim().to_string();
        let parsed = Url::parse(&page_url).ok().filter(|u| u.has_host());
        Self { page_url, parsed }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Scheme, host and port of the page, e.g. `https://example.com`.
    pub fn origin(&self) -> Option<String> {
        self.parsed
            .as_ref()
            .map(|u| u.origin().ascii_serialization())
    }

    /// Make a raw candidate absolute.
    ///
    /// Returns `None` for blank input. Absolute URLs are returned as-is;
    /// root-relative paths are prefixed with the page origin; anything else
    /// relative is joined onto the page URL.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if is_absolute(raw) {
            return Some(raw.to_string());
        }

        let Some(base) = self.parsed.as_ref() else {
            return Some(raw.to_string());
        };

        if raw.starts_with("//") {
            return Some(
                base.join(raw)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| format!("{}:{}", base.scheme(), raw)),
            );
        }

        if raw.starts_with('/') {
            return Some(format!("{}{}", base.origin().ascii_serialization(), raw));
        }

        Some(
            base.join(raw)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
        )
    }

    /// Resolve and deduplicate a batch of candidates.
    pub fn normalize<'a, I>(&self, candidates: I) -> ResultSet
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut set = ResultSet::new();
        for candidate in candidates {
            if let Some(url) = self.resolve(&candidate.url) {
                set.insert(url);
            }
        }
        set
    }
}

/// True when the string carries its own scheme (`https:`, `blob:`, ...).
fn is_absolute(raw: &str) -> bool {
    if raw.starts_with('/') {
        return false;
    }
    match raw.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::result::CandidateSource;

    #[test]
    fn test_origin() {
        let target = PageTarget::new("https://h/watch/1?x=2");
        assert_eq!(target.origin().as_deref(), Some("https://h"));

        let target = PageTarget::new("http://example.com:8080/a");
        assert_eq!(target.origin().as_deref(), Some("http://example.com:8080"));
    }

    #[test]
    fn test_root_relative_rewrite() {
        let target = PageTarget::new("https://h/page");
        assert_eq!(target.resolve("/a.mp4").as_deref(), Some("https://h/a.mp4"));
    }

    #[test]
    fn test_absolute_kept_verbatim() {
        let target = PageTarget::new("https://h/page");
        assert_eq!(
            target.resolve("  https://cdn/x.MP4?a=1 ").as_deref(),
            Some("https://cdn/x.MP4?a=1")
        );
        assert_eq!(
            target.resolve("blob:https://h/123").as_deref(),
            Some("blob:https://h/123")
        );
    }

    #[test]
    fn test_protocol_relative() {
        let target = PageTarget::new("https://h/page");
        assert_eq!(
            target.resolve("//cdn.example.com/v.mp4").as_deref(),
            Some("https://cdn.example.com/v.mp4")
        );
    }

    #[test]
    fn test_page_relative() {
        let target = PageTarget::new("https://h/videos/index.html");
        assert_eq!(
            target.resolve("clips/a.webm").as_deref(),
            Some("https://h/videos/clips/a.webm")
        );
    }

    #[test]
    fn test_unparseable_page_keeps_candidate() {
        let target = PageTarget::new("not a url");
        assert!(target.origin().is_none());
        assert_eq!(target.resolve("/a.mp4").as_deref(), Some("/a.mp4"));
    }

    #[test]
    fn test_blank_dropped() {
        let target = PageTarget::new("https://h/");
        assert_eq!(target.resolve("   "), None);
        assert_eq!(target.resolve(""), None);
    }

    #[test]
    fn test_normalize_dedupes_after_rewrite() {
        let target = PageTarget::new("https://h/page");
        let candidates = vec![
            Candidate::new("/a.mp4", CandidateSource::SourceElement),
            Candidate::new("https://h/a.mp4", CandidateSource::RawPattern),
            Candidate::new(" ", CandidateSource::VideoElement),
        ];
        let set = target.normalize(&candidates);
        assert_eq!(set.into_vec(), vec!["https://h/a.mp4".to_string()]);
    }
}
