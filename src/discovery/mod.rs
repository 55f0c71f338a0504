//! Multi-strategy video URL discovery.
//!
//! A page is examined by independent strategies:
//! - static extraction over directly fetched markup (`static_html`)
//! - dynamic observation in a headless browser (`PageObserver`)
//!
//! The coordinator unions their candidates, resolves relative URLs against
//! the page origin and deduplicates the result.

pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod result;
pub mod static_html;
pub mod target;
pub mod traits;

pub use classifier::{is_video_content_type, is_video_url};
pub use config::DiscoveryOptions;
pub use coordinator::Discovery;
pub use error::{DiscoveryError, FetchError, ObserveError};
pub use result::{Candidate, CandidateSource, DiscoveryOutcome, ResultSet};
pub use static_html::extract_from_html;
pub use target::PageTarget;
pub use traits::{FetchedPage, PageFetcher, PageObserver};
