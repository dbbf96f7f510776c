// src/models/mod.rs

//! Domain models for the offer poller.
//!
//! This module contains the scraped offer record and the application
//! configuration it is produced under.

mod config;
mod offer;

// Re-export all public types
pub use config::{
    CacheConfig, Config, CrawlerConfig, ListingSelectors, LoggingConfig, MailConfig,
};
pub use offer::Offer;
