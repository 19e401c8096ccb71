//! Price source boundary: quote lookups by canonical asset identifier.

pub mod coingecko;
pub mod error;
pub mod source;

pub use coingecko::CoinGecko;
pub use error::FeedError;
pub use source::{PriceSource, QuoteMap};
