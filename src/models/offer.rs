//! Offer data structure.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A single listing scraped from the offers page.
///
/// Identity is the `link` alone: two offers with the same link are the same
/// offer, whatever their descriptive fields say.
#[derive(Debug, Clone, Default)]
pub struct Offer {
    /// Listing href, used as the dedup key
    pub link: String,

    /// Offer headline
    pub title: String,

    /// Price as printed on the page
    pub price: String,

    /// Floor area as printed on the page
    pub size: String,

    /// District or address
    pub location: String,
}

impl Offer {
    /// Create an offer with only its identifying link set.
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }

    /// Create an offer from optional scraped fields.
    ///
    /// Missing fields become empty strings.
    pub fn from_parts(
        link: impl Into<String>,
        title: Option<String>,
        price: Option<String>,
        size: Option<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.unwrap_or_default(),
            price: price.unwrap_or_default(),
            size: size.unwrap_or_default(),
            location: location.unwrap_or_default(),
        }
    }

    /// Mail subject line: `"{location} {price} | {size} {title}"`.
    pub fn subject(&self) -> String {
        format!(
            "{} {} | {} {}",
            self.location, self.price, self.size, self.title
        )
    }
}

impl PartialEq for Offer {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for Offer {}

impl Hash for Offer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.hash(state);
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.link)
    }
}
