//! One-shot discovery command.

use console::style;
use serde_json::json;

use vidscout::config::Settings;
use vidscout::discovery::{DiscoveryOptions, DiscoveryOutcome};
use vidscout::server::build_discovery;

/// Discover video URLs on `url` and print the result as JSON.
pub async fn cmd_discover(
    settings: &Settings,
    url: &str,
    no_dynamic: bool,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let options = command_options(&settings.discovery, no_dynamic, timeout_ms);

    let discovery = build_discovery(settings)?;

    eprintln!(
        "{} Searching {} (dynamic: {})",
        style("→").cyan(),
        url,
        options.use_dynamic && discovery.has_observer()
    );

    match discovery.discover(url, &options).await {
        Ok(DiscoveryOutcome::Found(set)) => {
            let video_urls = set.into_vec();
            eprintln!(
                "  {} Found {} video URLs",
                style("✓").green(),
                video_urls.len()
            );
            let output = json!({
                "videoUrls": video_urls,
                "pageUrl": url,
                "count": video_urls.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Ok(DiscoveryOutcome::NotFound) => {
            eprintln!("  {} No video URLs found on the page", style("!").yellow());
            anyhow::bail!("No video URLs found on {}", url)
        }
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), e);
            Err(e.into())
        }
    }
}

/// Apply command-line flags over the configured options. A zero timeout is
/// ignored.
fn command_options(
    configured: &DiscoveryOptions,
    no_dynamic: bool,
    timeout_ms: Option<u64>,
) -> DiscoveryOptions {
    let mut options = configured.clone();
    if no_dynamic {
        options.use_dynamic = false;
    }
    if let Some(timeout_ms) = timeout_ms.filter(|t| *t > 0) {
        options.overall_timeout_ms = timeout_ms;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let options = command_options(&DiscoveryOptions::default(), true, Some(5000));
        assert!(!options.use_dynamic);
        assert_eq!(options.overall_timeout_ms, 5000);
    }

    #[test]
    fn test_zero_timeout_ignored() {
        let configured = DiscoveryOptions::default();
        let options = command_options(&configured, false, Some(0));
        assert_eq!(options, configured);
    }
}
