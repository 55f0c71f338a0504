//! Discovery coordinator: runs every extraction method against a page and
//! merges what they propose.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::DiscoveryOptions;
use super::error::{DiscoveryError, FetchError, ObserveError};
use super::result::{Candidate, CandidateSource, DiscoveryOutcome};
use super::static_html::extract_from_html;
use super::target::PageTarget;
use super::traits::{PageFetcher, PageObserver};

/// Upper bound on the share of the dynamic budget held back for browser
/// teardown. The observer is told to finish this much before its hard cap.
const OBSERVER_GRACE: Duration = Duration::from_secs(5);

/// Multi-strategy video URL discovery.
#[derive(Clone)]
pub struct Discovery {
    fetcher: Arc<dyn PageFetcher>,
    observer: Option<Arc<dyn PageObserver>>,
}

impl Discovery {
    /// Create a coordinator with only the direct-fetch path.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            observer: None,
        }
    }

    /// Attach a browser observer for dynamic discovery.
    pub fn with_observer(mut self, observer: Arc<dyn PageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Discover video URLs on `page_url`.
    ///
    /// Individual method failures are logged and absorbed. Only when every
    /// attempted method failed is `DiscoveryError::TotalFailure` returned.
    /// The whole call returns within `overall_timeout_ms`.
    pub async fn discover(
        &self,
        page_url: &str,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let deadline = Instant::now() + options.overall_timeout();
        let target = PageTarget::new(page_url);
        let observer = self.observer.as_ref().filter(|_| options.use_dynamic);

        if options.use_dynamic && observer.is_none() {
            debug!("Dynamic discovery requested but no browser observer configured");
        }

        info!(
            "Discovering videos on {} (dynamic={})",
            target.page_url(),
            observer.is_some()
        );

        let (dynamic, direct) = match observer {
            None => (None, Some(self.direct(&target, deadline).await)),
            Some(observer) if options.fallback_to_direct_fetch => {
                let (dynamic, direct) = tokio::join!(
                    observe(observer.as_ref(), &target, options, deadline),
                    self.direct(&target, deadline)
                );
                (Some(dynamic), Some(direct))
            }
            Some(observer) => {
                let dynamic = observe(observer.as_ref(), &target, options, deadline).await;
                let direct = match &dynamic {
                    Ok(_) => None,
                    Err(_) => Some(self.direct(&target, deadline).await),
                };
                (Some(dynamic), direct)
            }
        };

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut causes: Vec<String> = Vec::new();
        let mut completed = 0usize;

        if let Some(result) = dynamic {
            match result {
                Ok(found) => {
                    completed += 1;
                    debug!("Dynamic observation proposed {} candidates", found.len());
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!("{} for {}", e, target.page_url());
                    causes.push(e.to_string());
                }
            }
        }

        if let Some(result) = direct {
            match result {
                Ok(found) => {
                    completed += 1;
                    debug!("Static extraction proposed {} candidates", found.len());
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!("Direct fetch failed for {}: {}", target.page_url(), e);
                    causes.push(e.to_string());
                }
            }
        }

        if completed == 0 {
            return Err(DiscoveryError::TotalFailure { causes });
        }

        log_provenance(&candidates);

        let set = target.normalize(&candidates);
        info!("Found {} video URLs on {}", set.len(), target.page_url());

        Ok(DiscoveryOutcome::from_set(set))
    }

    /// Fetch the page directly and run the static extractor over it.
    async fn direct(
        &self,
        target: &PageTarget,
        deadline: Instant,
    ) -> Result<Vec<Candidate>, FetchError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        let page = tokio::time::timeout_at(deadline, self.fetcher.fetch(target.page_url()))
            .await
            .map_err(|_| FetchError::Timeout {
                url: target.page_url().to_string(),
                timeout,
            })??;

        debug!(
            "Fetched {} ({} bytes, status {}, {})",
            page.final_url,
            page.body.len(),
            page.status,
            page.content_type().unwrap_or("unknown type")
        );

        Ok(extract_from_html(&page.body))
    }
}

async fn observe(
    observer: &dyn PageObserver,
    target: &PageTarget,
    options: &DiscoveryOptions,
    deadline: Instant,
) -> Result<Vec<Candidate>, ObserveError> {
    let hard_cap = deadline.min(Instant::now() + options.dynamic_timeout());
    let budget = hard_cap.saturating_duration_since(Instant::now());
    let timeout = budget - observer_grace(budget);

    tokio::time::timeout_at(hard_cap, observer.observe(target.page_url(), timeout))
        .await
        .map_err(|_| ObserveError::NavigationTimeout(budget))?
}

/// Teardown slack within a dynamic budget.
fn observer_grace(budget: Duration) -> Duration {
    OBSERVER_GRACE.min(budget / 4)
}

fn log_provenance(candidates: &[Candidate]) {
    let mut counts: HashMap<CandidateSource, usize> = HashMap::new();
    for candidate in candidates {
        *counts.entry(candidate.source).or_default() += 1;
    }
    for (source, count) in counts {
        debug!("  {}: {} candidates", source, count);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::discovery::traits::FetchedPage;

    struct FakeFetcher {
        body: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.body {
                Some(body) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status: 200,
                    headers: HashMap::new(),
                    body: body.clone(),
                }),
                None => Err(FetchError::Other("connection refused".to_string())),
            }
        }
    }

    struct FakeObserver {
        urls: Option<Vec<&'static str>>,
        calls: AtomicUsize,
    }

    impl FakeObserver {
        fn ok(urls: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                urls: Some(urls),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                urls: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageObserver for FakeObserver {
        async fn observe(
            &self,
            _page_url: &str,
            _timeout: Duration,
        ) -> Result<Vec<Candidate>, ObserveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.urls {
                Some(urls) => Ok(urls
                    .iter()
                    .map(|u| Candidate::new(*u, CandidateSource::NetworkRequest))
                    .collect()),
                None => Err(ObserveError::Launch("chrome not found".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_static_only_source_element() {
        let fetcher = FakeFetcher::ok(r#"<video><source src="https://cdn/a.mp4"></video>"#);
        let discovery = Discovery::new(fetcher);

        let outcome = discovery
            .discover("https://h/page", &DiscoveryOptions::static_only())
            .await
            .unwrap();

        assert_eq!(outcome.urls(), vec!["https://cdn/a.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_root_relative_source_rewritten() {
        let fetcher = FakeFetcher::ok(r#"<video><source src="/a.mp4"></video>"#);
        let discovery = Discovery::new(fetcher);

        let outcome = discovery
            .discover("https://h/watch?v=1", &DiscoveryOptions::static_only())
            .await
            .unwrap();

        assert!(outcome.urls().contains(&"https://h/a.mp4".to_string()));
    }

    #[tokio::test]
    async fn test_no_video_content_is_not_found() {
        let fetcher = FakeFetcher::ok("<html><body><p>Nothing here</p></body></html>");
        let discovery = Discovery::new(fetcher);

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::static_only())
            .await
            .unwrap();

        assert_eq!(outcome, DiscoveryOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_blank_sources_never_in_result() {
        let fetcher = FakeFetcher::ok(r#"<video src="  "><source src=""></video>"#);
        let discovery = Discovery::new(fetcher);

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::static_only())
            .await
            .unwrap();

        assert_eq!(outcome, DiscoveryOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_fails_dynamic_succeeds() {
        let fetcher = FakeFetcher::failing();
        let observer = FakeObserver::ok(vec!["https://cdn/live.m3u8"]);
        let discovery = Discovery::new(fetcher).with_observer(observer);

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.urls(), vec!["https://cdn/live.m3u8".to_string()]);
    }

    #[tokio::test]
    async fn test_dynamic_fails_static_succeeds() {
        let fetcher = FakeFetcher::ok(r#"<video src="https://cdn/a.webm"></video>"#);
        let observer = FakeObserver::failing();
        let discovery = Discovery::new(fetcher).with_observer(observer);

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.urls(), vec!["https://cdn/a.webm".to_string()]);
    }

    #[tokio::test]
    async fn test_both_fail_is_total_failure_with_causes() {
        let discovery =
            Discovery::new(FakeFetcher::failing()).with_observer(FakeObserver::failing());

        let err = discovery
            .discover("https://h/", &DiscoveryOptions::default())
            .await
            .unwrap_err();

        let causes = err.causes();
        assert_eq!(causes.len(), 2);
        assert!(causes.iter().any(|c| c.contains("chrome not found")));
        assert!(causes.iter().any(|c| c.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_results_unioned_and_deduped() {
        let fetcher = FakeFetcher::ok(
            r#"<video src="/a.mp4"></video><p>https://cdn/b.webm</p>"#,
        );
        let observer = FakeObserver::ok(vec!["https://h/a.mp4", "https://cdn/c.m3u8"]);
        let discovery = Discovery::new(fetcher).with_observer(observer);

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::default())
            .await
            .unwrap();

        let mut urls = outcome.urls();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://cdn/b.webm".to_string(),
                "https://cdn/c.m3u8".to_string(),
                "https://h/a.mp4".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_use_dynamic_false_skips_observer() {
        let fetcher = FakeFetcher::ok("<p>none</p>");
        let observer = FakeObserver::ok(vec!["https://cdn/x.mp4"]);
        let discovery = Discovery::new(fetcher).with_observer(observer.clone());

        let outcome = discovery
            .discover("https://h/", &DiscoveryOptions::static_only())
            .await
            .unwrap();

        assert_eq!(outcome, DiscoveryOutcome::NotFound);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_direct_fetch_when_dynamic_succeeds_without_fallback() {
        let fetcher = FakeFetcher::ok(r#"<video src="https://cdn/static.mp4"></video>"#);
        let observer = FakeObserver::ok(vec!["https://cdn/dynamic.mp4"]);
        let discovery = Discovery::new(fetcher.clone()).with_observer(observer);
        let options = DiscoveryOptions {
            fallback_to_direct_fetch: false,
            ..Default::default()
        };

        let outcome = discovery.discover("https://h/", &options).await.unwrap();

        assert_eq!(outcome.urls(), vec!["https://cdn/dynamic.mp4".to_string()]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_direct_fetch_runs_when_dynamic_fails_without_fallback() {
        let fetcher = FakeFetcher::ok(r#"<video src="https://cdn/static.mp4"></video>"#);
        let discovery = Discovery::new(fetcher.clone()).with_observer(FakeObserver::failing());
        let options = DiscoveryOptions {
            fallback_to_direct_fetch: false,
            ..Default::default()
        };

        let outcome = discovery.discover("https://h/", &options).await.unwrap();

        assert_eq!(outcome.urls(), vec!["https://cdn/static.mp4".to_string()]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    struct HangingObserver;

    #[async_trait]
    impl PageObserver for HangingObserver {
        async fn observe(
            &self,
            _page_url: &str,
            _timeout: Duration,
        ) -> Result<Vec<Candidate>, ObserveError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    struct SlowFetcher;

    #[async_trait]
    impl PageFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(FetchError::Other("unreachable".to_string()))
        }
    }

    fn tight_budget(fallback_to_direct_fetch: bool) -> DiscoveryOptions {
        DiscoveryOptions {
            use_dynamic: true,
            dynamic_timeout_ms: 300,
            fallback_to_direct_fetch,
            overall_timeout_ms: 300,
        }
    }

    #[tokio::test]
    async fn test_sequential_paths_share_overall_budget() {
        let discovery =
            Discovery::new(Arc::new(SlowFetcher)).with_observer(Arc::new(HangingObserver));

        let started = Instant::now();
        let err = discovery
            .discover("https://h/", &tight_budget(false))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
        assert_eq!(err.causes().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_paths_stop_at_overall_budget() {
        let discovery =
            Discovery::new(Arc::new(SlowFetcher)).with_observer(Arc::new(HangingObserver));

        let started = Instant::now();
        let err = discovery
            .discover("https://h/", &tight_budget(true))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
        assert!(err.causes().iter().any(|c| c.contains("timed out")));
    }

    struct RecordingObserver {
        timeout: std::sync::Mutex<Option<Duration>>,
    }

    #[async_trait]
    impl PageObserver for RecordingObserver {
        async fn observe(
            &self,
            _page_url: &str,
            timeout: Duration,
        ) -> Result<Vec<Candidate>, ObserveError> {
            *self.timeout.lock().unwrap() = Some(timeout);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_observer_told_to_finish_before_budget() {
        let observer = Arc::new(RecordingObserver {
            timeout: std::sync::Mutex::new(None),
        });
        let discovery =
            Discovery::new(FakeFetcher::ok("<p>none</p>")).with_observer(observer.clone());
        let options = DiscoveryOptions {
            dynamic_timeout_ms: 30_000,
            overall_timeout_ms: 8_000,
            ..Default::default()
        };

        discovery.discover("https://h/", &options).await.unwrap();

        let told = observer.timeout.lock().unwrap().unwrap();
        assert!(told <= Duration::from_secs(6), "told {:?}", told);
        assert!(told > Duration::from_secs(5), "told {:?}", told);
    }

    #[test]
    fn test_observer_grace_bounded() {
        assert_eq!(observer_grace(Duration::from_secs(60)), OBSERVER_GRACE);
        assert_eq!(observer_grace(Duration::from_secs(1)), Duration::from_millis(250));
    }
}
