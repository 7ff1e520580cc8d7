use std::sync::Arc;

use histograph_core::error::AppError;
use histograph_core::page::{Cell, InfoboxRow, InfoboxTable, Link, Page};
use histograph_core::traits::PageParser;
use scraper::{ElementRef, Html, Selector};

struct Selectors {
    first_heading: Selector,
    heading: Selector,
    category: Selector,
    infobox: Selector,
    caption: Selector,
    row: Selector,
    header: Selector,
    data: Selector,
    link: Selector,
}

/// [`PageParser`] backed by `scraper`.
///
/// Reads the `h1#firstHeading` heading (falling back to the first `h1`),
/// every category link, and the first `table.infobox`.
#[derive(Clone)]
pub struct ScraperParser {
    selectors: Arc<Selectors>,
}

impl ScraperParser {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            selectors: Arc::new(Selectors {
                first_heading: selector("h1#firstHeading")?,
                heading: selector("h1")?,
                category: selector(r#"a[href*="/wiki/Category:"]"#)?,
                infobox: selector("table.infobox")?,
                caption: selector("caption")?,
                row: selector("tr")?,
                header: selector("th")?,
                data: selector("td")?,
                link: selector("a[href]")?,
            }),
        })
    }

    fn infobox(&self, table: ElementRef<'_>) -> InfoboxTable {
        let s = &self.selectors;
        let caption = table
            .select(&s.caption)
            .next()
            .map(text_of)
            .filter(|text| !text.is_empty());

        let rows = table
            .select(&s.row)
            .map(|row| InfoboxRow {
                header: row.select(&s.header).next().map(text_of),
                value: row.select(&s.data).next().map(|td| self.cell(td)),
            })
            .collect();

        InfoboxTable { caption, rows }
    }

    fn cell(&self, td: ElementRef<'_>) -> Cell {
        let links = td
            .select(&self.selectors.link)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                Some(Link::new(href, text_of(a)))
            })
            .collect();
        Cell::with_links(text_of(td), links)
    }
}

impl PageParser for ScraperParser {
    fn parse(&self, html: &str) -> Result<Page, AppError> {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let heading = document
            .select(&s.first_heading)
            .next()
            .or_else(|| document.select(&s.heading).next())
            .map(text_of)
            .filter(|text| !text.is_empty());

        let categories = document
            .select(&s.category)
            .map(text_of)
            .filter(|text| !text.is_empty())
            .collect();

        let infobox = document
            .select(&s.infobox)
            .next()
            .map(|table| self.infobox(table));

        Ok(Page {
            heading,
            categories,
            infobox,
        })
    }
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ParseError(format!("Invalid selector '{css}': {e}")))
}

/// Concatenation of the element's trimmed, non-empty text nodes.
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect()
}
