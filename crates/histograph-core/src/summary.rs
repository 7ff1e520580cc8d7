use serde::Serialize;

use crate::models::{NodeKind, NodeRecord};

/// Titles found at one degree, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegreeSummary {
    pub degree: usize,
    pub events: Vec<String>,
    pub people: Vec<String>,
}

/// Group titles by degree (ascending), keeping discovery order within a degree.
pub fn summarize(records: &[NodeRecord]) -> Vec<DegreeSummary> {
    let Some(max_degree) = records.iter().map(|r| r.degree).max() else {
        return Vec::new();
    };

    (0..=max_degree)
        .map(|degree| {
            let mut summary = DegreeSummary {
                degree,
                ..Default::default()
            };
            for record in records.iter().filter(|r| r.degree == degree) {
                let titles = match record.node_type {
                    NodeKind::Event => &mut summary.events,
                    NodeKind::Person => &mut summary.people,
                };
                titles.push(record.title.clone());
            }
            summary
        })
        .collect()
}
