//! Parsed view of one encyclopedia document.
//!
//! A [`Page`] is what a [`PageParser`](crate::traits::PageParser) produces from
//! raw HTML: the primary heading, the text of every category link, and the
//! rows of the first infobox table. Row adjacency is preserved because edge
//! lists sometimes continue on the row after their header.

use serde::{Deserialize, Serialize};

/// A hyperlink inside an infobox cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

impl Link {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }

    /// Internal encyclopedia links start with `/wiki/`.
    pub fn is_internal(&self) -> bool {
        self.href.starts_with("/wiki/")
    }
}

/// A body cell: its plain text and the links it contains, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub links: Vec<Link>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            links: Vec::new(),
        }
    }

    pub fn with_links(text: impl Into<String>, links: Vec<Link>) -> Self {
        Self {
            text: text.into(),
            links,
        }
    }
}

/// One table row: the text of its first header cell and its first body cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxRow {
    pub header: Option<String>,
    pub value: Option<Cell>,
}

impl InfoboxRow {
    /// A label/value row.
    pub fn pair(header: impl Into<String>, value: Cell) -> Self {
        Self {
            header: Some(header.into()),
            value: Some(value),
        }
    }

    /// A header row without a body cell.
    pub fn header_only(header: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
            value: None,
        }
    }

    /// A plain summary row with only a body cell.
    pub fn body(value: Cell) -> Self {
        Self {
            header: None,
            value: Some(value),
        }
    }
}

/// The first infobox-styled table of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxTable {
    pub caption: Option<String>,
    pub rows: Vec<InfoboxRow>,
}

/// A fetched and parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Primary heading text, if the document has one.
    pub heading: Option<String>,
    /// Display text of every category hyperlink.
    pub categories: Vec<String>,
    pub infobox: Option<InfoboxTable>,
}
