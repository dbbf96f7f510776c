//! Persistence for seen offers.
//!
//! The known-set lives in memory while polling and is written to a flat
//! text file on shutdown:
//!
//! ```text
//! offers.dat
//! /nieruchomosci-mam-do-wynajecia/ogl/1
//! /nieruchomosci-mam-do-wynajecia/ogl/2
//! ...
//! ```

pub mod cache;

// Re-export for convenience
pub use cache::OfferCache;
