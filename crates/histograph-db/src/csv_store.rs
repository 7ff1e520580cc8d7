//! Delimited-file output: one row per node, appended across runs.
//!
//! Columns: `node_id, node_type, title, url, degree, parent_url, description,
//! start_date, end_date, metadata` (metadata is a JSON object).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use histograph_core::error::AppError;
use histograph_core::models::{Node, NodeKind, NodeRecord};
use histograph_core::session::KindCounts;
use histograph_core::traits::NodeSink;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    node_id: String,
    node_type: NodeKind,
    title: String,
    url: String,
    degree: usize,
    parent_url: String,
    description: String,
    start_date: String,
    end_date: String,
    metadata: String,
}

impl CsvRow {
    fn from_record(record: &NodeRecord) -> Result<Self, AppError> {
        Ok(Self {
            node_id: record.node_id.clone(),
            node_type: record.node_type,
            title: record.title.clone(),
            url: record.url.clone(),
            degree: record.degree,
            parent_url: record.parent_url.clone().unwrap_or_default(),
            description: record.description.clone(),
            start_date: record.start_date.clone(),
            end_date: record.end_date.clone(),
            metadata: serde_json::to_string(&record.metadata)?,
        })
    }

    fn into_record(self) -> Result<NodeRecord, AppError> {
        let metadata: BTreeMap<String, String> = if self.metadata.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&self.metadata)?
        };
        Ok(NodeRecord {
            node_id: self.node_id,
            node_type: self.node_type,
            title: self.title,
            url: self.url,
            degree: self.degree,
            parent_url: Some(self.parent_url).filter(|p| !p.is_empty()),
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            metadata,
        })
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::StorageError(format!("{}: {e}", path.display()))
}

/// Read every row of the file. A missing file is an empty dataset.
pub fn read_records(path: &Path) -> Result<Vec<NodeRecord>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| storage_error(path, e))?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| row.map_err(|e| storage_error(path, e))?.into_record())
        .collect()
}

/// Append records whose `node_id` is not yet in the file. Returns how many
/// rows were written.
pub fn export_records(path: &Path, records: &[NodeRecord]) -> Result<usize, AppError> {
    let known: HashSet<String> = read_records(path)?
        .into_iter()
        .map(|record| record.node_id)
        .collect();
    let mut seen = HashSet::new();
    let fresh: Vec<NodeRecord> = records
        .iter()
        .filter(|record| !known.contains(&record.node_id) && seen.insert(&record.node_id))
        .cloned()
        .collect();

    if !fresh.is_empty() {
        append_rows(path, &fresh)?;
    }
    tracing::info!(
        path = %path.display(),
        appended = fresh.len(),
        skipped = records.len() - fresh.len(),
        "Exported nodes to CSV"
    );
    Ok(fresh.len())
}

/// Header is written only when the file is missing or empty.
fn append_rows(path: &Path, records: &[NodeRecord]) -> Result<(), AppError> {
    let write_header = !matches!(std::fs::metadata(path), Ok(m) if m.len() > 0);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| storage_error(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for record in records {
        writer
            .serialize(CsvRow::from_record(record)?)
            .map_err(|e| storage_error(path, e))?;
    }
    writer.flush().map_err(|e| storage_error(path, e))
}

#[derive(Debug, Default)]
struct CsvState {
    /// `(title, parent_url)` → node_id of every row already in the file.
    keys: HashMap<(String, String), String>,
    events: u64,
    people: u64,
}

impl CsvState {
    fn from_records(records: &[NodeRecord]) -> Self {
        let mut state = Self::default();
        for record in records {
            state.remember(record);
            let ordinal = record
                .node_id
                .get(1..)
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or_default();
            let counter = match record.node_type {
                NodeKind::Event => &mut state.events,
                NodeKind::Person => &mut state.people,
            };
            *counter = (*counter).max(ordinal);
        }
        state
    }

    fn remember(&mut self, record: &NodeRecord) {
        self.keys.insert(
            dedup_key(&record.title, record.parent_url.as_deref()),
            record.node_id.clone(),
        );
    }

    fn next_id(&mut self, kind: NodeKind) -> String {
        let counter = match kind {
            NodeKind::Event => &mut self.events,
            NodeKind::Person => &mut self.people,
        };
        *counter += 1;
        format!("{}{}", kind.id_prefix(), counter)
    }
}

fn dedup_key(title: &str, parent_url: Option<&str>) -> (String, String) {
    (title.to_string(), parent_url.unwrap_or_default().to_string())
}

/// [`NodeSink`] that appends nodes to a CSV file.
///
/// A row is written only when its `(title, parent_url)` pair is not yet in
/// the file; otherwise the existing identifier is returned. Identifier
/// counters continue from the highest `eN`/`pN` already present.
#[derive(Clone)]
pub struct CsvNodeStore {
    path: PathBuf,
    state: Arc<Mutex<Option<CsvState>>>,
}

impl CsvNodeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, node: &Node) -> Result<String, AppError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::StorageError("CSV state lock poisoned".into()))?;
        if guard.is_none() {
            *guard = Some(CsvState::from_records(&read_records(&self.path)?));
        }
        let state = guard.get_or_insert_with(CsvState::default);

        if let Some(node_id) = state.keys.get(&dedup_key(node.title(), node.parent_url())) {
            tracing::debug!(title = %node.title(), %node_id, "Node already in CSV, skipping");
            return Ok(node_id.clone());
        }

        let record = node.to_record(state.next_id(node.kind()));
        append_rows(&self.path, std::slice::from_ref(&record))?;

        state.remember(&record);
        Ok(record.node_id)
    }
}

impl NodeSink for CsvNodeStore {
    async fn persist(&self, node: &Node, _session: Option<Uuid>) -> Result<String, AppError> {
        let store = self.clone();
        let node = node.clone();
        tokio::task::spawn_blocking(move || store.append(&node))
            .await
            .map_err(|e| AppError::StorageError(format!("CSV writer task failed: {e}")))?
    }
}

/// Lazily loaded, explicitly invalidated view of a CSV node file.
pub struct CsvDataset {
    path: PathBuf,
    cache: Cache<(), Arc<Vec<NodeRecord>>>,
}

impl CsvDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Cache::new(1),
        }
    }

    /// All rows, read from disk on first use and cached afterwards.
    pub async fn load(&self) -> Result<Arc<Vec<NodeRecord>>, AppError> {
        let path = self.path.clone();
        self.cache
            .try_get_with((), async move {
                let records = tokio::task::spawn_blocking(move || read_records(&path))
                    .await
                    .map_err(|e| AppError::StorageError(format!("CSV reader task failed: {e}")))??;
                tracing::debug!(rows = records.len(), "Loaded CSV dataset");
                Ok::<_, AppError>(Arc::new(records))
            })
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))
    }

    /// Drop the cached rows; the next [`load`](Self::load) reads the file again.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }

    pub async fn reload(&self) -> Result<Arc<Vec<NodeRecord>>, AppError> {
        self.invalidate().await;
        self.load().await
    }

    pub async fn by_kind(&self, kind: NodeKind) -> Result<Vec<NodeRecord>, AppError> {
        Ok(self
            .load()
            .await?
            .iter()
            .filter(|record| record.node_type == kind)
            .cloned()
            .collect())
    }

    pub async fn kind_counts(&self) -> Result<KindCounts, AppError> {
        let records = self.load().await?;
        let events = records
            .iter()
            .filter(|record| record.node_type == NodeKind::Event)
            .count() as u64;
        Ok(KindCounts {
            events,
            people: records.len() as u64 - events,
        })
    }
}

#[cfg(test)]
mod tests {
    use histograph_core::infobox::InfoboxData;
    use tempfile::TempDir;

    use super::*;

    const SEED: &str = "https://w.test/wiki/Korean_War";

    fn node(title: &str, kind: NodeKind, degree: usize, parent: Option<&str>) -> Node {
        let url = format!("https://w.test/wiki/{}", title.replace(' ', "_"));
        let mut builder = Node::builder(title, url, kind).degree(degree);
        if let Some(parent) = parent {
            builder = builder.parent_url(parent);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn appends_rows_with_per_kind_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        let store = CsvNodeStore::new(&path);

        let data = InfoboxData {
            start_date: "25 June 1950".into(),
            metadata: [("Location".to_string(), "Korea, \"the peninsula\"".to_string())].into(),
            ..Default::default()
        };
        let seed = Node::builder("Korean War", SEED, NodeKind::Event)
            .infobox(data)
            .build()
            .unwrap();

        assert_eq!(store.persist(&seed, None).await.unwrap(), "e1");
        let macarthur = node("Douglas MacArthur", NodeKind::Person, 1, Some(SEED));
        assert_eq!(store.persist(&macarthur, None).await.unwrap(), "p1");
        let inchon = node("Battle of Inchon", NodeKind::Event, 2, Some(macarthur.url()));
        assert_eq!(store.persist(&inchon, None).await.unwrap(), "e2");

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].parent_url, None);
        assert_eq!(records[0].start_date, "25 June 1950");
        assert_eq!(
            records[0].metadata.get("Location").map(String::as_str),
            Some("Korea, \"the peninsula\"")
        );
        assert_eq!(records[2].parent_url.as_deref(), Some(macarthur.url()));
    }

    #[tokio::test]
    async fn skips_known_title_parent_pairs_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");

        let first = CsvNodeStore::new(&path);
        first
            .persist(&node("Korean War", NodeKind::Event, 0, None), None)
            .await
            .unwrap();
        first
            .persist(&node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)), None)
            .await
            .unwrap();

        // A second run against the same file continues the counters.
        let second = CsvNodeStore::new(&path);
        let again = second
            .persist(&node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)), None)
            .await
            .unwrap();
        let new = second
            .persist(&node("Peng Dehuai", NodeKind::Person, 1, Some(SEED)), None)
            .await
            .unwrap();

        assert_eq!(again, "p1");
        assert_eq!(new, "p2");
        assert_eq!(read_records(&path).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dataset_is_cached_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        let store = CsvNodeStore::new(&path);
        let dataset = CsvDataset::new(&path);

        assert!(dataset.load().await.unwrap().is_empty());

        store
            .persist(&node("Korean War", NodeKind::Event, 0, None), None)
            .await
            .unwrap();
        store
            .persist(&node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)), None)
            .await
            .unwrap();

        // Still the cached empty view.
        assert!(dataset.load().await.unwrap().is_empty());

        assert_eq!(dataset.reload().await.unwrap().len(), 2);
        assert_eq!(
            dataset.kind_counts().await.unwrap(),
            KindCounts {
                events: 1,
                people: 1
            }
        );
        let people = dataset.by_kind(NodeKind::Person).await.unwrap();
        assert_eq!(people[0].title, "Kim Il Sung");
    }

    #[tokio::test]
    async fn export_appends_only_unknown_node_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        let store = CsvNodeStore::new(&path);
        store
            .persist(&node("Korean War", NodeKind::Event, 0, None), None)
            .await
            .unwrap();

        let macarthur = node("Douglas MacArthur", NodeKind::Person, 1, Some(SEED));
        let from_db = vec![
            node("Korean War", NodeKind::Event, 0, None).to_record("e1"),
            macarthur.to_record("p1"),
            node("Battle of Inchon", NodeKind::Event, 2, Some(macarthur.url())).to_record("e2"),
            macarthur.to_record("p1"),
        ];

        assert_eq!(export_records(&path, &from_db).unwrap(), 2);
        assert_eq!(export_records(&path, &from_db).unwrap(), 0);

        let records = read_records(&path).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, ["e1", "p1", "e2"]);
        assert_eq!(records[2].parent_url.as_deref(), Some(macarthur.url()));
    }

    #[test]
    fn export_to_a_new_file_writes_the_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.csv");
        let records = vec![
            node("Korean War", NodeKind::Event, 0, None).to_record("e1"),
            node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)).to_record("p1"),
        ];

        assert_eq!(export_records(&path, &records).unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("node_id,node_type").count(), 1);
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn malformed_metadata_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        std::fs::write(
            &path,
            "node_id,node_type,title,url,degree,parent_url,description,start_date,end_date,metadata\n\
             e1,Event,Korean War,https://w.test/wiki/Korean_War,0,,,,,{not json\n",
        )
        .unwrap();

        assert!(matches!(
            read_records(&path),
            Err(AppError::SerializationError(_))
        ));
    }
}
