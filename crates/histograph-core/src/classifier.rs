//! Category-link heuristics for telling event pages from person pages.

use crate::models::PageKind;
use crate::page::Page;

const EVENT_INDICATORS: &[&str] = &["wars", "battles", "conflicts", "campaigns", "operations"];

const PERSON_INDICATORS: &[&str] = &[
    "people",
    "person",
    "military",
    "generals",
    "commanders",
    "leaders",
];

/// Classify a page by substring matches over its joined, lower-cased
/// category link text. Event indicators are checked first.
pub fn classify(page: &Page) -> PageKind {
    let joined = page
        .categories
        .iter()
        .map(|category| category.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if contains_any(&joined, EVENT_INDICATORS) {
        PageKind::Event
    } else if contains_any(&joined, PERSON_INDICATORS) {
        PageKind::Person
    } else {
        PageKind::Unknown
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
