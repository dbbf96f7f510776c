// src/services/listings.rs

//! Listing crawler service.
//!
//! Fetches the listings page and extracts offers using configured CSS
//! selectors.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{Config, ListingSelectors, Offer};
use crate::utils::http::{create_async_client, fetch_markup};
use crate::utils::{normalize_whitespace, parse_selector};

/// Anything that can produce the current batch of offers.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch and parse one batch of offers, in page order.
    async fn fetch_offers(&self) -> Result<Vec<Offer>>;
}

/// Compiled selectors for one listing layout.
#[derive(Debug, Clone)]
pub struct ListingParser {
    listing: Selector,
    header: Selector,
    header_link: Selector,
    body: Selector,
    price: Selector,
    location: Selector,
    size: Selector,
}

impl ListingParser {
    /// Compile the configured selectors.
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            listing: parse_selector(&selectors.listing)?,
            header: parse_selector(&selectors.header)?,
            header_link: parse_selector(&selectors.header_link)?,
            body: parse_selector(&selectors.body)?,
            price: parse_selector(&selectors.price)?,
            location: parse_selector(&selectors.location)?,
            size: parse_selector(&selectors.size)?,
        })
    }

    /// Extract every offer from a listings document, in document order.
    ///
    /// Listings without a header link are skipped; missing body fields
    /// become empty strings.
    pub fn parse(&self, html: &str) -> Vec<Offer> {
        let document = Html::parse_document(html);

        let mut offers = Vec::new();
        let mut skipped = 0usize;
        for listing in document.select(&self.listing) {
            match self.parse_listing(&listing) {
                Some(offer) => offers.push(offer),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} listings without a header link", skipped);
        }
        offers
    }

    fn parse_listing(&self, listing: &ElementRef) -> Option<Offer> {
        let header = listing.select(&self.header).next()?;
        let anchor = header.select(&self.header_link).next()?;

        let link = anchor.value().attr("href")?.trim();
        if link.is_empty() {
            return None;
        }

        let title = Some(element_text(&anchor));
        let body = listing.select(&self.body).next();
        let field = |selector: &Selector| {
            body.and_then(|b| b.select(selector).next())
                .map(|el| element_text(&el))
        };

        Some(Offer::from_parts(
            link,
            title,
            field(&self.price),
            field(&self.size),
            field(&self.location),
        ))
    }
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Service fetching offers from the configured listings page.
pub struct ListingCrawler {
    client: reqwest::Client,
    url: String,
    parser: ListingParser,
}

impl ListingCrawler {
    /// Create a new listing crawler with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_async_client(&config.crawler)?,
            url: config.crawler.listing_url.trim().to_string(),
            parser: ListingParser::new(&config.selectors)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ListingSource for ListingCrawler {
    async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        log::debug!("Fetching offers from {}", self.url);
        let html = fetch_markup(&self.client, &self.url).await?;
        let offers = self.parser.parse(&html);
        log::debug!("Fetched {} offers", offers.len());
        Ok(offers)
    }
}
