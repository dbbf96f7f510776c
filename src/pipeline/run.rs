// src/pipeline/run.rs

//! Pipeline entry points.

use std::collections::HashSet;
use std::future::Future;

use crate::error::Result;
use crate::models::{Config, Offer};
use crate::pipeline::poll::{Poller, PollerState, RunSummary};
use crate::services::{ListingCrawler, ListingSource, MailNotifier};
use crate::storage::OfferCache;

/// Open the cache, log in to the mail server and poll until `shutdown`.
///
/// A failed login is returned as-is (`AppError::Auth` or
/// `AppError::Network`) after releasing the cache without flushing it.
pub async fn run_poller<F>(config: &Config, shutdown: F) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    let mut state = PollerState::Starting;
    log::debug!("Poller {}", state);
    let cache = OfferCache::open(&config.cache.path, config.cache.purge).await?;

    let source = match ListingCrawler::new(config) {
        Ok(source) => source,
        Err(e) => {
            state.advance(PollerState::Failed);
            release(cache).await;
            return Err(e);
        }
    };

    state.advance(PollerState::Authenticating);
    let notifier = match MailNotifier::connect(&config.mail).await {
        Ok(notifier) => notifier,
        Err(e) => {
            log::error!("Mail login failed: {}", e);
            state.advance(PollerState::Failed);
            release(cache).await;
            return Err(e);
        }
    };

    state.advance(PollerState::Polling);
    let poller = Poller::new(source, notifier, cache, config.crawler.poll_interval());
    Ok(poller.run(shutdown).await)
}

async fn release(cache: OfferCache) {
    if let Err(e) = cache.close().await {
        log::warn!("Closing offer cache failed: {}", e);
    }
}

/// An offer from a dry run and whether the cache already knows it.
#[derive(Debug, Clone)]
pub struct CheckedOffer {
    pub offer: Offer,
    pub known: bool,
}

/// Fetch the listings once and compare them against the cache file.
///
/// Sends nothing and leaves the cache file untouched.
pub async fn run_check(config: &Config) -> Result<Vec<CheckedOffer>> {
    let source = ListingCrawler::new(config)?;
    let known: HashSet<String> = OfferCache::read_known(&config.cache.path)
        .await
        .into_iter()
        .collect();

    log::info!("Checking {}", source.url());
    let offers = source.fetch_offers().await?;
    Ok(classify(offers, &known))
}

fn classify(offers: Vec<Offer>, known: &HashSet<String>) -> Vec<CheckedOffer> {
    offers
        .into_iter()
        .map(|offer| CheckedOffer {
            known: known.contains(&offer.link),
            offer,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::TempDir;

    #[test]
    fn test_classify_marks_known_links() {
        let known: HashSet<String> = ["/a".to_string()].into_iter().collect();
        let checked = classify(vec![Offer::new("/a"), Offer::new("/b")], &known);

        assert!(checked[0].known);
        assert!(!checked[1].known);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_cache_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("offers.dat");
        std::fs::write(&path, "/a\n/b\n").unwrap();

        let mut config = Config::default();
        config.cache.path = path.clone();
        config.mail.server = "127.0.0.1:1".to_string();
        config.mail.user = "user".to_string();
        config.mail.password = "secret".to_string();
        config.mail.timeout_secs = 2;

        let result = run_poller(&config, std::future::pending()).await;
        assert!(matches!(result, Err(AppError::Network(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\n/b\n");
    }
}
