//! Network activity bookkeeping for a single observed page.
//!
//! Owned by the observing task for the duration of one call. Events are fed
//! in as they arrive and the collected candidates are read once the page
//! has settled.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::discovery::{is_video_content_type, is_video_url, Candidate, CandidateSource};

/// Append-only record of video-looking traffic plus the in-flight set.
#[derive(Debug, Default)]
pub struct NetworkLog {
    in_flight: HashSet<String>,
    candidates: Vec<Candidate>,
    requests_seen: usize,
}

impl NetworkLog {
    /// An outgoing request (redirects reuse the request id).
    pub fn on_request(&mut self, request_id: &str, url: &str) {
        self.requests_seen += 1;
        self.in_flight.insert(request_id.to_string());
        if is_video_url(url) {
            self.candidates
                .push(Candidate::new(url, CandidateSource::NetworkRequest));
        }
    }

    /// A response header block arrived.
    pub fn on_response(&mut self, url: &str, mime_type: &str) {
        if is_video_content_type(mime_type) || is_video_url(url) {
            self.candidates
                .push(Candidate::new(url, CandidateSource::NetworkResponse));
        }
    }

    /// A request finished loading or failed.
    pub fn on_complete(&mut self, request_id: &str) {
        self.in_flight.remove(request_id);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn requests_seen(&self) -> usize {
        self.requests_seen
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Idle-network detector: settled once in-flight requests stay at or below
/// `threshold` for `window`.
#[derive(Debug)]
pub struct Quiescence {
    threshold: usize,
    window: Duration,
    idle_since: Option<Instant>,
}

impl Quiescence {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold,
            window,
            idle_since: None,
        }
    }

    /// Sample the in-flight count at `now`; true once the page has settled.
    pub fn sample(&mut self, in_flight: usize, now: Instant) -> bool {
        if in_flight > self.threshold {
            self.idle_since = None;
            return false;
        }
        let since = *self.idle_since.get_or_insert(now);
        now.duration_since(since) >= self.window
    }
}
