//! Service layer for the offer poller.
//!
//! This module contains the business logic for:
//! - Listing fetching and parsing (`ListingCrawler`)
//! - Mail notifications (`MailNotifier`)

mod listings;
mod mailer;

pub use listings::{ListingCrawler, ListingParser, ListingSource};
pub use mailer::{MailNotifier, Notifier, compose};
