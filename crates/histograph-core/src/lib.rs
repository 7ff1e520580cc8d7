pub mod classifier;
pub mod error;
pub mod extraction;
pub mod ids;
pub mod infobox;
pub mod models;
pub mod page;
pub mod politeness;
pub mod session;
pub mod source;
pub mod store;
pub mod summary;
pub mod traits;
pub mod traversal;

#[cfg(test)]
pub(crate) mod testutil;

pub use classifier::classify;
pub use error::AppError;
pub use extraction::{ExtractionReport, ExtractionRequest, ExtractionService};
pub use ids::SequentialIds;
pub use infobox::{EdgeLabel, InfoboxData};
pub use models::{Node, NodeBuilder, NodeKind, NodeRecord, PageKind};
pub use page::{Cell, InfoboxRow, InfoboxTable, Link, Page};
pub use politeness::PolitenessConfig;
pub use session::{ExtractionSession, KindCounts, NewSession, SessionStatus, SessionSummary};
pub use source::HtmlPageSource;
pub use store::NodeStore;
pub use summary::{DegreeSummary, summarize};
pub use traits::{Fetcher, NodeSink, NullSessions, PageParser, PageSource, SessionStore};
pub use traversal::{
    RunOutcome, RunStatus, TracingReporter, TraversalConfig, TraversalEngine, TraversalEvent,
    TraversalReporter,
};
