use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::infobox::{EdgeLabel, InfoboxData};

/// The two roles a graph node can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Event,
    Person,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Event => "Event",
            NodeKind::Person => "Person",
        }
    }

    /// Events link to people and people link to events.
    pub fn opposite(&self) -> NodeKind {
        match self {
            NodeKind::Event => NodeKind::Person,
            NodeKind::Person => NodeKind::Event,
        }
    }

    /// The infobox field whose links lead to nodes of the opposite kind.
    pub fn edge_label(&self) -> EdgeLabel {
        match self {
            NodeKind::Event => EdgeLabel::CommandersAndLeaders,
            NodeKind::Person => EdgeLabel::BattlesWars,
        }
    }

    /// Prefix of persisted node identifiers (`e1`, `p1`, ...).
    pub fn id_prefix(&self) -> char {
        match self {
            NodeKind::Event => 'e',
            NodeKind::Person => 'p',
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event" => Ok(NodeKind::Event),
            "person" => Ok(NodeKind::Person),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

/// Result of classifying a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageKind {
    Event,
    Person,
    Unknown,
}

impl PageKind {
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            PageKind::Event => Some(NodeKind::Event),
            PageKind::Person => Some(NodeKind::Person),
            PageKind::Unknown => None,
        }
    }
}

impl From<NodeKind> for PageKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Event => PageKind::Event,
            NodeKind::Person => PageKind::Person,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Event => write!(f, "Event"),
            PageKind::Person => write!(f, "Person"),
            PageKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A discovered Event or Person.
///
/// Immutable once built: every field is fixed by [`NodeBuilder`] at discovery
/// time. Identity is the `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    title: String,
    url: String,
    kind: NodeKind,
    degree: usize,
    parent_url: Option<String>,
    description: String,
    start_date: String,
    end_date: String,
    metadata: BTreeMap<String, String>,
}

impl Node {
    pub fn builder(
        title: impl Into<String>,
        url: impl Into<String>,
        kind: NodeKind,
    ) -> NodeBuilder {
        NodeBuilder {
            title: title.into(),
            url: url.into(),
            kind,
            degree: 0,
            parent_url: None,
            infobox: InfoboxData::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn parent_url(&self) -> Option<&str> {
        self.parent_url.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    pub fn end_date(&self) -> &str {
        &self.end_date
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// The seed is the only node without a discoverer.
    pub fn is_seed(&self) -> bool {
        self.parent_url.is_none() && self.degree == 0
    }

    /// Flatten into a persisted record under the given identifier.
    pub fn to_record(&self, node_id: impl Into<String>) -> NodeRecord {
        NodeRecord {
            node_id: node_id.into(),
            node_type: self.kind,
            title: self.title.clone(),
            url: self.url.clone(),
            degree: self.degree,
            parent_url: self.parent_url.clone(),
            description: self.description.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Builder for [`Node`]: fetch → extract → construct.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    title: String,
    url: String,
    kind: NodeKind,
    degree: usize,
    parent_url: Option<String>,
    infobox: InfoboxData,
}

impl NodeBuilder {
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn parent_url(mut self, parent_url: impl Into<String>) -> Self {
        self.parent_url = Some(parent_url.into());
        self
    }

    /// Pre-populate description, dates and metadata from the node's own infobox.
    pub fn infobox(mut self, infobox: InfoboxData) -> Self {
        self.infobox = infobox;
        self
    }

    pub fn build(self) -> Result<Node, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Generic(format!(
                "Node title must not be empty (url: {})",
                self.url
            )));
        }
        if self.url.trim().is_empty() {
            return Err(AppError::Generic(format!(
                "Node url must not be empty (title: {title})"
            )));
        }

        let InfoboxData {
            description,
            start_date,
            end_date,
            metadata,
            ..
        } = self.infobox;

        Ok(Node {
            title,
            url: self.url,
            kind: self.kind,
            degree: self.degree,
            parent_url: self.parent_url,
            description,
            start_date,
            end_date,
            metadata,
        })
    }
}

/// Flat persisted form of a node, as written by the persistence collaborators.
///
/// Lookup keys: `node_id`, `url`, and the `(title, parent_url)` pair used to
/// de-duplicate re-imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub node_type: NodeKind,
    pub title: String,
    pub url: String,
    pub degree: usize,
    pub parent_url: Option<String>,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub metadata: BTreeMap<String, String>,
}
