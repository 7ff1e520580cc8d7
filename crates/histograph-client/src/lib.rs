pub mod fetcher;
pub mod parser;

use std::time::Duration;

use histograph_core::error::AppError;
use histograph_core::source::HtmlPageSource;

pub use fetcher::{DEFAULT_TIMEOUT, ReqwestFetcher};
pub use parser::ScraperParser;

/// The page source used against a live wiki: reqwest for transport, scraper for parsing.
pub type WikiSource = HtmlPageSource<ReqwestFetcher, ScraperParser>;

/// Build a [`WikiSource`] with the given per-request timeout.
pub fn wiki_source(timeout: Duration) -> Result<WikiSource, AppError> {
    Ok(HtmlPageSource::new(
        ReqwestFetcher::with_timeout(timeout)?,
        ScraperParser::new()?,
    ))
}
