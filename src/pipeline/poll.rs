// src/pipeline/poll.rs

//! Poll loop: fetch, dedup against the cache, notify, repeat.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::services::{ListingSource, Notifier};
use crate::storage::OfferCache;

/// Lifecycle of the poller process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Starting,
    Authenticating,
    Polling,
    ShuttingDown,
    Stopped,
    Failed,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Authenticating => "authenticating",
            Self::Polling => "polling",
            Self::ShuttingDown => "shutting down",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl PollerState {
    /// Move to `next`, logging the transition.
    pub fn advance(&mut self, next: PollerState) {
        log::debug!("Poller {} -> {}", self, next);
        *self = next;
    }
}

/// Result of one poll iteration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Offers on the page
    pub fetched: usize,
    /// Offers not in the cache
    pub new: usize,
    /// New offers successfully notified and recorded
    pub notified: usize,
    /// New offers whose notification failed
    pub failed: usize,
}

/// Totals over a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: usize,
    pub failed_iterations: usize,
    pub notified: usize,
    pub send_failures: usize,
}

/// Orchestrates polling over an authenticated notifier and an open cache.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    cache: OfferCache,
    interval: Duration,
    state: PollerState,
    summary: RunSummary,
}

impl<S, N> Poller<S, N>
where
    S: ListingSource,
    N: Notifier,
{
    pub fn new(source: S, notifier: N, cache: OfferCache, interval: Duration) -> Self {
        Self {
            source,
            notifier,
            cache,
            interval,
            state: PollerState::Polling,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn cache(&self) -> &OfferCache {
        &self.cache
    }

    fn enter(&mut self, state: PollerState) {
        self.state.advance(state);
    }

    /// Run a single fetch-dedup-notify pass.
    ///
    /// An offer is recorded only after its notification went out, so a
    /// failed send is retried on the next pass.
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        let offers = self.source.fetch_offers().await?;
        let mut outcome = PollOutcome {
            fetched: offers.len(),
            ..PollOutcome::default()
        };

        let mut attempted = HashSet::new();
        for offer in offers {
            if self.cache.exists(&offer.link) || !attempted.insert(offer.link.clone()) {
                continue;
            }
            outcome.new += 1;

            log::info!("New offer discovered at {}", offer.link);
            log::debug!(
                "Title: {} | Location: {} | Price: {} | Size: {}",
                offer.title,
                offer.location,
                offer.price,
                offer.size
            );

            match self.notifier.notify(&offer).await {
                Ok(()) => {
                    self.cache.add(offer.link);
                    outcome.notified += 1;
                }
                Err(e) => {
                    outcome.failed += 1;
                    log::warn!("Failed to notify about {}: {}", offer.link, e);
                }
            }
        }

        Ok(outcome)
    }

    async fn tick(&mut self) {
        self.summary.iterations += 1;
        match self.poll_once().await {
            Ok(outcome) => {
                self.summary.notified += outcome.notified;
                self.summary.send_failures += outcome.failed;
                if outcome.new > 0 {
                    log::info!(
                        "Poll: {} offers, {} new, {} notified, {} failed",
                        outcome.fetched,
                        outcome.new,
                        outcome.notified,
                        outcome.failed
                    );
                } else {
                    log::debug!("Poll: {} offers, nothing new", outcome.fetched);
                }
            }
            Err(e) => {
                self.summary.failed_iterations += 1;
                log::warn!("Poll iteration failed: {}", e);
            }
        }
    }

    /// Poll until `shutdown` resolves, then close the session and flush.
    ///
    /// `shutdown` is observed before each iteration and during the sleep
    /// between them. A running iteration always completes, so a delivered
    /// notification is recorded before the cache is flushed.
    pub async fn run<F>(mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        log::info!(
            "Polling every {}s with {} known offers",
            self.interval.as_secs(),
            self.cache.len()
        );

        let mut delay = Duration::ZERO;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(delay) => {}
            }
            self.tick().await;
            delay = self.interval;
        }

        self.shutdown().await
    }

    /// Close the notifier, flush and close the cache.
    ///
    /// Every step is attempted; failures are logged, not returned.
    async fn shutdown(mut self) -> RunSummary {
        self.enter(PollerState::ShuttingDown);

        if let Err(e) = self.notifier.close().await {
            log::warn!("Closing mail session failed: {}", e);
        }
        if let Err(e) = self.cache.flush().await {
            log::error!("Flushing offer cache failed: {}", e);
        }

        self.enter(PollerState::Stopped);
        let Self { cache, summary, .. } = self;
        if let Err(e) = cache.close().await {
            log::warn!("Closing offer cache failed: {}", e);
        }

        log::info!(
            "Stopped after {} iterations ({} failed), {} notifications sent",
            summary.iterations,
            summary.failed_iterations,
            summary.notified
        );
        summary
    }
}
