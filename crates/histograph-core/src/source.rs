use crate::error::AppError;
use crate::page::Page;
use crate::traits::{Fetcher, PageParser, PageSource};

/// [`PageSource`] composed of a [`Fetcher`] and a [`PageParser`]:
/// fetch HTML, then parse it.
#[derive(Clone)]
pub struct HtmlPageSource<F, P> {
    fetcher: F,
    parser: P,
}

impl<F, P> HtmlPageSource<F, P>
where
    F: Fetcher,
    P: PageParser,
{
    pub fn new(fetcher: F, parser: P) -> Self {
        Self { fetcher, parser }
    }
}

impl<F, P> PageSource for HtmlPageSource<F, P>
where
    F: Fetcher,
    P: PageParser,
{
    async fn fetch_page(&self, url: &str) -> Result<Page, AppError> {
        let html = self.fetcher.fetch(url).await?;
        tracing::debug!(%url, bytes = html.len(), "Fetched page");
        self.parser.parse(&html)
    }
}
