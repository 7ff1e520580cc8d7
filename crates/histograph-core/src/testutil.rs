//! Test utilities: mock implementations of the core traits and page builders.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Node, NodeKind};
use crate::page::{Cell, InfoboxRow, InfoboxTable, Link, Page};
use crate::session::{NewSession, SessionStatus};
use crate::traits::{Fetcher, NodeSink, PageParser, PageSource, SessionStore};
use crate::traversal::{TraversalEvent, TraversalReporter};

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

fn wiki_links(names: &[&str]) -> Vec<Link> {
    names
        .iter()
        .map(|name| Link::new(format!("/wiki/{}", name.replace(' ', "_")), *name))
        .collect()
}

fn infobox_page(title: &str, category: &str, edge_header: &str, names: &[&str]) -> Page {
    let mut rows = vec![InfoboxRow::body(Cell::text(format!("{title} summary")))];
    if !names.is_empty() {
        rows.push(InfoboxRow::pair(
            edge_header,
            Cell::with_links(names.join(" "), wiki_links(names)),
        ));
    }
    Page {
        heading: Some(title.to_string()),
        categories: vec![category.to_string()],
        infobox: Some(InfoboxTable {
            caption: None,
            rows,
        }),
    }
}

/// An event page listing `commanders` under "Commanders and leaders".
pub fn event_page(title: &str, commanders: &[&str]) -> Page {
    infobox_page(
        title,
        "Wars involving the United States",
        "Commanders and leaders",
        commanders,
    )
}

/// A person page listing `battles` under "Battles/wars".
pub fn person_page(title: &str, battles: &[&str]) -> Page {
    infobox_page(title, "United States Army generals", "Battles/wars", battles)
}

/// A page whose categories match neither kind.
pub fn unknown_page(title: &str, battles: &[&str]) -> Page {
    infobox_page(title, "1880 births", "Battles/wars", battles)
}

impl Page {
    pub fn with_date(self, date: &str) -> Self {
        self.with_row("Date", date)
    }

    pub fn with_born(self, born: &str) -> Self {
        self.with_row("Born", born)
    }

    pub fn with_row(mut self, header: &str, value: &str) -> Self {
        self.infobox
            .get_or_insert_with(InfoboxTable::default)
            .rows
            .push(InfoboxRow::pair(header, Cell::text(value)));
        self
    }
}

/// A stored node with no infobox data.
pub fn node(title: &str, kind: NodeKind, degree: usize, parent_url: Option<&str>) -> Node {
    let url = format!("https://w.test/wiki/{}", title.replace(' ', "_"));
    let builder = Node::builder(title, url, kind).degree(degree);
    match parent_url {
        Some(parent) => builder.parent_url(parent).build().unwrap(),
        None => builder.build().unwrap(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(html.to_string())])),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, AppError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Mock parser that puts the raw HTML in the page heading.
#[derive(Clone, Default)]
pub struct MockParser {
    pub parsed: Arc<Mutex<Vec<String>>>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageParser for MockParser {
    fn parse(&self, html: &str) -> Result<Page, AppError> {
        self.parsed.lock().unwrap().push(html.to_string());
        Ok(Page {
            heading: Some(html.to_string()),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// In-memory document source keyed by absolute url. Unknown urls yield a 404.
#[derive(Clone, Default)]
pub struct MockSource {
    pages: Arc<Mutex<HashMap<String, Page>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    cancel_on: Arc<Mutex<Option<(String, CancellationToken)>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: Page) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    pub fn with_failure(self, url: &str) -> Self {
        self.failures.lock().unwrap().insert(url.to_string());
        self
    }

    /// Cancel `token` the first time `url` is fetched.
    pub fn cancel_when_fetched(self, url: &str, token: CancellationToken) -> Self {
        *self.cancel_on.lock().unwrap() = Some((url.to_string(), token));
        self
    }

    /// Every url requested so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl PageSource for MockSource {
    async fn fetch_page(&self, url: &str) -> Result<Page, AppError> {
        self.fetched.lock().unwrap().push(url.to_string());

        if let Some((trigger, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if trigger == url {
                token.cancel();
            }
        }

        if self.failures.lock().unwrap().contains(url) {
            return Err(AppError::HttpError(format!("HTTP 500 for {url}")));
        }

        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records event names and progress percentages.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<&'static str>>>,
    progress: Arc<Mutex<Vec<u8>>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `token` once the given degree has completed.
    pub fn cancel_after_level(mut self, degree: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((degree, token));
        self
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|event| **event == name).count()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }
}

impl TraversalReporter for RecordingReporter {
    fn report(&self, event: TraversalEvent<'_>) {
        let name = match &event {
            TraversalEvent::Started { .. } => "Started",
            TraversalEvent::Fetching { .. } => "Fetching",
            TraversalEvent::FetchFailed { .. } => "FetchFailed",
            TraversalEvent::LevelStarted { .. } => "LevelStarted",
            TraversalEvent::LevelEmpty { .. } => "LevelEmpty",
            TraversalEvent::Expanding { .. } => "Expanding",
            TraversalEvent::UnknownPage { .. } => "UnknownPage",
            TraversalEvent::AlreadyVisited { .. } => "AlreadyVisited",
            TraversalEvent::Discovered { .. } => "Discovered",
            TraversalEvent::LevelCompleted { .. } => "LevelCompleted",
            TraversalEvent::Progress { .. } => "Progress",
            TraversalEvent::Cancelled { .. } => "Cancelled",
            TraversalEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(name);

        match event {
            TraversalEvent::Progress { percent, .. } => {
                self.progress.lock().unwrap().push(percent);
            }
            TraversalEvent::LevelCompleted { degree, .. } => {
                if let Some((at, token)) = &self.cancel_after {
                    if *at == degree {
                        token.cancel();
                    }
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Sink that numbers nodes per kind and records what it was given.
#[derive(Clone, Default)]
pub struct MockSink {
    pub persisted: Arc<Mutex<Vec<(Node, Option<Uuid>)>>>,
    /// Fail every call once this many nodes have been stored.
    fail_after: Option<usize>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Default::default()
        }
    }
}

impl NodeSink for MockSink {
    async fn persist(&self, node: &Node, session: Option<Uuid>) -> Result<String, AppError> {
        let mut persisted = self.persisted.lock().unwrap();
        if self.fail_after.is_some_and(|limit| persisted.len() >= limit) {
            return Err(AppError::StorageError("disk full".into()));
        }
        let ordinal = persisted
            .iter()
            .filter(|(stored, _)| stored.kind() == node.kind())
            .count()
            + 1;
        persisted.push((node.clone(), session));
        Ok(format!("{}{ordinal}", node.kind().id_prefix()))
    }
}

// ---------------------------------------------------------------------------
// MockSessions
// ---------------------------------------------------------------------------

/// Session store that records creations and status updates.
#[derive(Clone, Default)]
pub struct MockSessions {
    pub created: Arc<Mutex<Vec<(Uuid, NewSession)>>>,
    pub updates: Arc<Mutex<Vec<(Uuid, SessionStatus, u64, Option<String>)>>>,
    create_error: Arc<Mutex<Option<AppError>>>,
    update_error: Arc<Mutex<Option<AppError>>>,
}

impl MockSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_error(error: AppError) -> Self {
        Self {
            create_error: Arc::new(Mutex::new(Some(error))),
            ..Default::default()
        }
    }

    pub fn with_update_error(error: AppError) -> Self {
        Self {
            update_error: Arc::new(Mutex::new(Some(error))),
            ..Default::default()
        }
    }
}

impl SessionStore for MockSessions {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid, AppError> {
        if let Some(error) = self.create_error.lock().unwrap().take() {
            return Err(error);
        }
        let id = Uuid::new_v4();
        self.created.lock().unwrap().push((id, session.clone()));
        Ok(id)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        total_nodes: u64,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(error) = self.update_error.lock().unwrap().take() {
            return Err(error);
        }
        self.updates
            .lock()
            .unwrap()
            .push((id, status, total_nodes, error.map(str::to_string)));
        Ok(())
    }
}
