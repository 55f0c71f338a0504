//! Discovery result types.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Which extraction strategy proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// `src` attribute of a `<video>` element.
    VideoElement,
    /// `src` attribute of a `<source>` nested in a `<video>`.
    SourceElement,
    /// Media-extension regex over raw markup.
    RawPattern,
    /// Quoted URL inside an inline player script.
    Script,
    /// Outgoing request seen by the browser.
    NetworkRequest,
    /// Response seen by the browser.
    NetworkResponse,
    /// In-page DOM query after load.
    RenderedDom,
    /// `src` attribute of an `<iframe>` in the rendered page.
    Iframe,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::VideoElement => "video_element",
            CandidateSource::SourceElement => "source_element",
            CandidateSource::RawPattern => "raw_pattern",
            CandidateSource::Script => "script",
            CandidateSource::NetworkRequest => "network_request",
            CandidateSource::NetworkResponse => "network_response",
            CandidateSource::RenderedDom => "rendered_dom",
            CandidateSource::Iframe => "iframe",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string proposed by an extractor as possibly pointing to video content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Raw URL as found; may be relative or padded with whitespace.
    pub url: String,
    /// How the URL was found.
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(url: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }
}

/// Normalized, deduplicated set of absolute video URLs.
///
/// Never holds blank entries. Iteration order is stable but callers must
/// not attach meaning to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(BTreeSet<String>);

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a URL. Blank strings are ignored; returns true if newly added.
    pub fn insert(&mut self, url: String) -> bool {
        if url.trim().is_empty() {
            return false;
        }
        self.0.insert(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

/// Terminal result of a discovery call that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// At least one video URL was found.
    Found(ResultSet),
    /// Every method ran, none proposed anything usable.
    NotFound,
}

impl DiscoveryOutcome {
    /// Build an outcome from a set, mapping an empty set to `NotFound`.
    pub fn from_set(set: ResultSet) -> Self {
        if set.is_empty() {
            DiscoveryOutcome::NotFound
        } else {
            DiscoveryOutcome::Found(set)
        }
    }

    /// The found URLs, or an empty list.
    pub fn urls(&self) -> Vec<String> {
        match self {
            DiscoveryOutcome::Found(set) => set.iter().cloned().collect(),
            DiscoveryOutcome::NotFound => Vec::new(),
        }
    }
}
