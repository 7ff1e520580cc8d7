//! Best-effort extraction of typed fields from an infobox table.
//!
//! Encyclopedia infoboxes are hand-authored and irregular, so a missing table,
//! row, or cell is a normal outcome: the corresponding field stays empty.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::page::{Cell, InfoboxTable, Page};

/// Headers (lower-cased) that set `start_date`.
const START_HEADERS: &[&str] = &["born", "start date", "started", "begin", "birth"];

/// Headers (lower-cased) that set `end_date`.
const END_HEADERS: &[&str] = &["died", "end date", "ended", "death"];

/// A "Date" row holding a range is split on the first en-dash.
const RANGE_SEPARATOR: char = '–';

/// Infobox fields whose links spawn child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeLabel {
    /// On event pages: the people who led each side.
    CommandersAndLeaders,
    /// On person pages: the conflicts they took part in.
    BattlesWars,
}

impl EdgeLabel {
    pub const ALL: [EdgeLabel; 2] = [EdgeLabel::CommandersAndLeaders, EdgeLabel::BattlesWars];

    /// The literal header text of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::CommandersAndLeaders => "Commanders and leaders",
            EdgeLabel::BattlesWars => "Battles/wars",
        }
    }

    /// Exact, case-sensitive match on the header text.
    pub fn from_header(header: &str) -> Option<EdgeLabel> {
        Self::ALL.into_iter().find(|label| label.as_str() == header)
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything pulled out of one infobox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxData {
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    /// Every other label/value row, excluding the edge-list fields.
    pub metadata: BTreeMap<String, String>,
    /// Linked entity names per edge field, in document order.
    pub edges: BTreeMap<EdgeLabel, Vec<String>>,
}

impl InfoboxData {
    /// Linked names recorded under `label`; empty when the field was absent.
    pub fn edges(&self, label: EdgeLabel) -> &[String] {
        self.edges.get(&label).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Extract description, dates, metadata and edge lists from the page's
/// first infobox. A page without one yields empty data.
pub fn extract(page: &Page) -> InfoboxData {
    let Some(table) = &page.infobox else {
        return InfoboxData::default();
    };

    let mut data = InfoboxData {
        description: describe(table),
        ..Default::default()
    };

    for row in &table.rows {
        let (Some(header), Some(value)) = (&row.header, &row.value) else {
            continue;
        };
        let lower = header.to_lowercase();

        if lower == "date" {
            match value.text.split_once(RANGE_SEPARATOR) {
                Some((start, end)) => {
                    data.start_date = start.trim().to_string();
                    data.end_date = end.trim().to_string();
                }
                None => data.start_date = value.text.clone(),
            }
        } else if START_HEADERS.contains(&lower.as_str()) {
            data.start_date = value.text.clone();
        } else if END_HEADERS.contains(&lower.as_str()) {
            data.end_date = value.text.clone();
        } else if EdgeLabel::from_header(header).is_none() {
            data.metadata.insert(header.clone(), value.text.clone());
        }
    }

    for (index, row) in table.rows.iter().enumerate() {
        let Some(label) = row.header.as_deref().and_then(EdgeLabel::from_header) else {
            continue;
        };
        // Long lists are sometimes laid out on the row after their header.
        let cell = row
            .value
            .as_ref()
            .or_else(|| table.rows.get(index + 1).and_then(|next| next.value.as_ref()));
        let Some(cell) = cell else {
            continue;
        };

        let names = linked_names(cell);
        if !names.is_empty() {
            data.edges.insert(label, names);
        }
    }

    data
}

/// Caption text if the table has one, else the first plain summary row.
fn describe(table: &InfoboxTable) -> String {
    if let Some(caption) = &table.caption {
        return caption.clone();
    }
    table
        .rows
        .iter()
        .filter(|row| row.header.is_none())
        .find_map(|row| row.value.as_ref())
        .map(|cell| cell.text.clone())
        .unwrap_or_default()
}

fn linked_names(cell: &Cell) -> Vec<String> {
    cell.links
        .iter()
        .filter(|link| link.is_internal() && !link.text.is_empty())
        .map(|link| link.text.clone())
        .collect()
}
