//! Degree-bounded breadth-first traversal over event and person pages.
//!
//! ```text
//! seed ──fetch──> degree 0 ──expand──> degree 1 ──expand──> ... ──> max_degree
//!                     │                    │
//!                     └─ classify ─ extract ─ enqueue children (dedup by url)
//! ```
//!
//! One run owns its [`NodeStore`]; fetches are issued one at a time in
//! insertion order, so the returned node sequence is a deterministic function
//! of the seed, the degree limit and the document source.

use std::fmt;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::classifier;
use crate::error::AppError;
use crate::infobox;
use crate::models::{Node, NodeKind, PageKind};
use crate::page::Page;
use crate::politeness::{Pacer, PolitenessConfig};
use crate::store::NodeStore;
use crate::traits::PageSource;

/// Progress reported once the last level is done; the remainder belongs to
/// whoever persists the results.
pub const TRAVERSAL_PROGRESS_CAP: u8 = 90;

/// Settings for one traversal.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Origin that entity names are resolved against (`{base_url}/wiki/{Name}`).
    pub base_url: String,
    /// Deepest degree kept in the result. The seed is degree 0.
    pub max_degree: usize,
    /// Title of the seed node. Falls back to the page heading, then the url.
    pub seed_title: Option<String>,
    pub politeness: PolitenessConfig,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            max_degree: 3,
            seed_title: None,
            politeness: PolitenessConfig::default(),
        }
    }
}

impl TraversalConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_degree(mut self, max_degree: usize) -> Self {
        self.max_degree = max_degree;
        self
    }

    pub fn with_seed_title(mut self, title: impl Into<String>) -> Self {
        self.seed_title = Some(title.into());
        self
    }

    pub fn with_politeness(mut self, politeness: PolitenessConfig) -> Self {
        self.politeness = politeness;
        self
    }

    /// Reject configurations that cannot produce a run.
    pub fn validate(&self, seed_url: &str) -> Result<(), AppError> {
        let seed_url = seed_url.trim();
        if seed_url.is_empty() {
            return Err(AppError::ConfigError("seed URL is empty".into()));
        }
        let seed = Url::parse(seed_url)
            .map_err(|e| AppError::ConfigError(format!("invalid seed URL '{seed_url}': {e}")))?;
        if !matches!(seed.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "seed URL scheme '{}' is not supported (only http/https)",
                seed.scheme()
            )));
        }
        Url::parse(&self.base_url).map_err(|e| {
            AppError::ConfigError(format!("invalid base URL '{}': {e}", self.base_url))
        })?;
        if self
            .seed_title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(AppError::ConfigError("seed title is empty".into()));
        }
        Ok(())
    }

    /// Deterministic address of a linked entity: spaces become underscores.
    pub fn entity_url(&self, name: &str) -> String {
        format!(
            "{}/wiki/{}",
            self.base_url.trim_end_matches('/'),
            name.replace(' ', "_")
        )
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Frontier exhausted or `max_degree` reached.
    Completed,
    /// Stopped through the cancellation token; nodes found so far are kept.
    Cancelled,
    /// Aborted by a collaborator (e.g. persistence), with the reason.
    Failed(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Final status plus every stored node in discovery order (seed first).
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub nodes: Vec<Node>,
}

/// Events emitted by the engine for logging and progress display.
#[derive(Debug, Clone)]
pub enum TraversalEvent<'a> {
    Started {
        seed_url: &'a str,
        max_degree: usize,
    },
    Fetching {
        url: &'a str,
    },
    FetchFailed {
        url: &'a str,
        error: &'a AppError,
    },
    LevelStarted {
        degree: usize,
        frontier: usize,
    },
    /// No node exists at this degree, so none can exist deeper.
    LevelEmpty {
        degree: usize,
    },
    Expanding {
        title: &'a str,
        kind: PageKind,
        degree: usize,
    },
    UnknownPage {
        title: &'a str,
        url: &'a str,
    },
    AlreadyVisited {
        name: &'a str,
        url: &'a str,
    },
    Discovered {
        node: &'a Node,
    },
    LevelCompleted {
        degree: usize,
        total_nodes: usize,
    },
    Progress {
        percent: u8,
        message: &'a str,
    },
    Cancelled {
        degree: usize,
    },
    Finished {
        status: &'a RunStatus,
        total_nodes: usize,
    },
}

/// Receives traversal events. Fire-and-forget: the engine never waits on it.
pub trait TraversalReporter: Send + Sync {
    fn report(&self, event: TraversalEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TraversalReporter for TracingReporter {
    fn report(&self, event: TraversalEvent<'_>) {
        match event {
            TraversalEvent::Started {
                seed_url,
                max_degree,
            } => {
                tracing::info!(%seed_url, %max_degree, "Starting extraction");
            }
            TraversalEvent::Fetching { url } => {
                tracing::debug!(%url, "Fetching");
            }
            TraversalEvent::FetchFailed { url, error } if error.is_fetch_failure() => {
                tracing::warn!(%url, %error, "Fetch failed, skipping");
            }
            TraversalEvent::FetchFailed { url, error } => {
                tracing::error!(%url, %error, "Unexpected error while fetching, skipping");
            }
            TraversalEvent::LevelStarted { degree, frontier } => {
                tracing::info!(%degree, %frontier, "Processing degree");
            }
            TraversalEvent::LevelEmpty { degree } => {
                tracing::info!(%degree, "No nodes at degree, stopping");
            }
            TraversalEvent::Expanding {
                title,
                kind,
                degree,
            } => {
                tracing::info!(%title, %kind, %degree, "Expanding");
            }
            TraversalEvent::UnknownPage { title, url } => {
                tracing::debug!(%title, %url, "Page is neither event nor person");
            }
            TraversalEvent::AlreadyVisited { name, url } => {
                tracing::debug!(%name, %url, "Already visited");
            }
            TraversalEvent::Discovered { node } => {
                tracing::info!(
                    title = %node.title(),
                    kind = %node.kind(),
                    degree = %node.degree(),
                    "Found node"
                );
            }
            TraversalEvent::LevelCompleted {
                degree,
                total_nodes,
            } => {
                tracing::info!(%degree, %total_nodes, "Completed degree");
            }
            TraversalEvent::Progress { percent, message } => {
                tracing::debug!(%percent, %message, "Progress");
            }
            TraversalEvent::Cancelled { degree } => {
                tracing::info!(%degree, "Extraction stopped by user");
            }
            TraversalEvent::Finished {
                status,
                total_nodes,
            } => {
                tracing::info!(%status, %total_nodes, "Extraction finished");
            }
        }
    }
}

/// Percentage reported after finishing `degree`: `min(90, 90 * degree / max_degree)`.
pub fn level_progress(degree: usize, max_degree: usize) -> u8 {
    if max_degree == 0 {
        return TRAVERSAL_PROGRESS_CAP;
    }
    let cap = usize::from(TRAVERSAL_PROGRESS_CAP);
    (cap * degree / max_degree).min(cap) as u8
}

/// Cancellation observed while waiting for the next fetch slot.
struct Interrupted;

/// Orchestrates the walk: fetch → classify → extract → enqueue.
pub struct TraversalEngine<S> {
    source: S,
    config: TraversalConfig,
}

impl<S: PageSource> TraversalEngine<S> {
    pub fn new(source: S, config: TraversalConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Run a fresh traversal from `seed_url`.
    pub async fn run<R: TraversalReporter>(
        &self,
        seed_url: &str,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<RunOutcome, AppError> {
        self.run_with_store(seed_url, NodeStore::new(), cancel, reporter)
            .await
    }

    /// Run a traversal on top of an existing store. Urls the store already
    /// marks visited are never fetched or added again.
    pub async fn run_with_store<R: TraversalReporter>(
        &self,
        seed_url: &str,
        mut store: NodeStore,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<RunOutcome, AppError> {
        self.config.validate(seed_url)?;
        let seed_url = seed_url.trim();
        let max_degree = self.config.max_degree;

        reporter.report(TraversalEvent::Started {
            seed_url,
            max_degree,
        });

        let mut pacer = Pacer::new(self.config.politeness.clone());

        // The seed's type is known up front; its page is reused for the
        // degree-0 expansion instead of being fetched twice.
        let seed_page = self
            .fetch(seed_url, &mut pacer, cancel, reporter)
            .await
            .unwrap_or(None);
        let seed = Node::builder(
            self.seed_title(seed_url, seed_page.as_ref()),
            seed_url,
            NodeKind::Event,
        )
        .infobox(seed_page.as_ref().map(infobox::extract).unwrap_or_default())
        .build()?;
        store.mark_visited(seed_url);
        if store.add(seed.clone()) {
            reporter.report(TraversalEvent::Discovered { node: &seed });
        }
        let mut seed_fetch = Some(seed_page);

        let mut status = RunStatus::Completed;
        'levels: for degree in 0..=max_degree {
            let frontier = store.nodes_at_degree(degree);
            if frontier.is_empty() {
                reporter.report(TraversalEvent::LevelEmpty { degree });
                break;
            }
            if cancel.is_cancelled() {
                status = cancelled(degree, reporter);
                break;
            }

            reporter.report(TraversalEvent::LevelStarted {
                degree,
                frontier: frontier.len(),
            });

            // Children of the last level would be discarded, so it is not expanded.
            if degree < max_degree {
                for node in &frontier {
                    if cancel.is_cancelled() {
                        status = cancelled(degree, reporter);
                        break 'levels;
                    }

                    let fetched = match seed_fetch.take_if(|_| node.url() == seed_url) {
                        Some(page) => Ok(page),
                        None => self.fetch(node.url(), &mut pacer, cancel, reporter).await,
                    };
                    let page = match fetched {
                        Ok(Some(page)) => page,
                        Ok(None) => continue,
                        Err(Interrupted) => {
                            status = cancelled(degree, reporter);
                            break 'levels;
                        }
                    };

                    if let Err(Interrupted) = self
                        .expand(node, &page, &mut store, &mut pacer, cancel, reporter)
                        .await
                    {
                        status = cancelled(degree, reporter);
                        break 'levels;
                    }
                }
            }

            reporter.report(TraversalEvent::LevelCompleted {
                degree,
                total_nodes: store.len(),
            });
            let message = format!(
                "Completed degree {degree}. Total nodes so far: {}",
                store.len()
            );
            reporter.report(TraversalEvent::Progress {
                percent: level_progress(degree, max_degree),
                message: &message,
            });
        }

        reporter.report(TraversalEvent::Finished {
            status: &status,
            total_nodes: store.len(),
        });

        Ok(RunOutcome {
            status,
            nodes: store.into_nodes(),
        })
    }

    /// Create the children of `node` from the edge list matching its role.
    async fn expand<R: TraversalReporter>(
        &self,
        node: &Node,
        page: &Page,
        store: &mut NodeStore,
        pacer: &mut Pacer,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<(), Interrupted> {
        let role = if node.is_seed() {
            PageKind::from(node.kind())
        } else {
            classifier::classify(page)
        };
        let title = page.heading.as_deref().unwrap_or(node.title());
        let Some(kind) = role.node_kind() else {
            reporter.report(TraversalEvent::UnknownPage {
                title,
                url: node.url(),
            });
            return Ok(());
        };

        reporter.report(TraversalEvent::Expanding {
            title,
            kind: role,
            degree: node.degree(),
        });

        let data = infobox::extract(page);
        for name in data.edges(kind.edge_label()) {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }

            let url = self.config.entity_url(name);
            if !store.mark_visited(&url) {
                reporter.report(TraversalEvent::AlreadyVisited { name, url: &url });
                continue;
            }

            let child_data = self
                .fetch(&url, pacer, cancel, reporter)
                .await?
                .map(|child_page| infobox::extract(&child_page))
                .unwrap_or_default();
            // A fetch that completes after cancellation is abandoned.
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }

            let child = match Node::builder(name.as_str(), url.as_str(), kind.opposite())
                .degree(node.degree() + 1)
                .parent_url(node.url())
                .infobox(child_data)
                .build()
            {
                Ok(child) => child,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "Skipping malformed node");
                    continue;
                }
            };

            if store.add(child.clone()) {
                reporter.report(TraversalEvent::Discovered { node: &child });
            }
        }

        Ok(())
    }

    /// Wait for the politeness slot, then fetch. A failed fetch is reported
    /// and yields `None`.
    async fn fetch<R: TraversalReporter>(
        &self,
        url: &str,
        pacer: &mut Pacer,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<Option<Page>, Interrupted> {
        if !pacer.wait(cancel).await {
            return Err(Interrupted);
        }
        reporter.report(TraversalEvent::Fetching { url });
        match self.source.fetch_page(url).await {
            Ok(page) => Ok(Some(page)),
            Err(error) => {
                reporter.report(TraversalEvent::FetchFailed { url, error: &error });
                Ok(None)
            }
        }
    }

    fn seed_title(&self, seed_url: &str, page: Option<&Page>) -> String {
        if let Some(title) = &self.config.seed_title {
            return title.trim().to_string();
        }
        page.and_then(|page| page.heading.as_deref())
            .map(str::trim)
            .filter(|heading| !heading.is_empty())
            .map(str::to_string)
            .or_else(|| title_from_url(seed_url))
            .unwrap_or_else(|| "Unknown Title".to_string())
    }
}

fn cancelled<R: TraversalReporter>(degree: usize, reporter: &R) -> RunStatus {
    reporter.report(TraversalEvent::Cancelled { degree });
    RunStatus::Cancelled
}

/// `https://host/wiki/Korean_War` → `Korean War`.
fn title_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(segment.replace('_', " "))
}
