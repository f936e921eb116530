use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::{Document, Node, NodeData, NodeId};
use crate::ops::aggregate::{self, AggregateError};
use crate::ops::check;

/// Default plan file name, looked up by `discover_document`
pub const DEFAULT_FILE: &str = "plan.fdd.json";

/// Highest on-disk format this build understands
const FORMAT_VERSION: u32 = 1;

/// Error type for document persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no {DEFAULT_FILE} found in this directory or any parent")]
    NotFound,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize document: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("{path} uses format {found}, newer than supported ({FORMAT_VERSION})")]
    UnsupportedFormat { path: PathBuf, found: u32 },
    #[error("{path} is not a valid plan: {}", problems.join("; "))]
    Invalid { path: PathBuf, problems: Vec<String> },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Where documents come from and go to
pub trait DocumentStore {
    fn load(&self, path: &Path) -> Result<Document, StoreError>;
    fn save(&self, doc: &Document, path: &Path) -> Result<(), StoreError>;
}

/// JSON documents: one nested object per node, written atomically
#[derive(Debug, Clone, Copy)]
pub struct JsonStore {
    /// Enforce Program/Project exclusivity when validating on load
    pub exclusivity: bool,
}

impl Default for JsonStore {
    fn default() -> Self {
        JsonStore { exclusivity: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    format: u32,
    /// Highest sequence number ever handed out, so removed Features' numbers
    /// are not reused after a reload
    #[serde(default)]
    last_seq: u32,
    root: StoredNode,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredNode {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
    #[serde(flatten)]
    data: NodeData,
    #[serde(default = "default_repeat", skip_serializing_if = "is_default_repeat")]
    repeat: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<StoredNode>,
}

fn default_repeat() -> u32 {
    1
}

fn is_default_repeat(repeat: &u32) -> bool {
    *repeat == 1
}

impl JsonStore {
    /// Read and rebuild a document without validating it. Parent links, the
    /// sequence counter and derived values are restored; hierarchy rules may
    /// still be violated. `fdt check` reports on documents loaded this way.
    pub fn read(&self, path: &Path) -> Result<Document, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let stored: StoredDocument =
            serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        if stored.format > FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat {
                path: path.to_path_buf(),
                found: stored.format,
            });
        }

        let mut nodes = Vec::new();
        flatten(stored.root, &mut nodes);
        let mut doc = Document::from_parts(nodes, NodeId(0));
        doc.relink();
        doc.sequence_mut().observe(stored.last_seq);
        aggregate::recompute_all(&mut doc)?;
        Ok(doc)
    }
}

impl DocumentStore for JsonStore {
    /// Read, then reject documents that break the hierarchy rules
    fn load(&self, path: &Path) -> Result<Document, StoreError> {
        let doc = self.read(path)?;
        let today = Local::now().date_naive();
        let result = check::check_document(&doc, self.exclusivity, today);
        if !result.valid {
            return Err(StoreError::Invalid {
                path: path.to_path_buf(),
                problems: result.errors.iter().map(ToString::to_string).collect(),
            });
        }
        tracing::info!(path = %path.display(), nodes = doc.len(), "document loaded");
        Ok(doc)
    }

    /// Write the attached tree. Detached nodes (undo leftovers) are dropped.
    fn save(&self, doc: &Document, path: &Path) -> Result<(), StoreError> {
        let stored = StoredDocument {
            format: FORMAT_VERSION,
            last_seq: doc.sequence().last(),
            root: store_node(doc, doc.root()),
        };
        let mut json = serde_json::to_string_pretty(&stored)?;
        json.push('\n');
        atomic_write(path, json.as_bytes()).map_err(|e| StoreError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "document saved");
        Ok(())
    }
}

/// Append `stored` and its descendants in pre-order, children linked by index
fn flatten(stored: StoredNode, nodes: &mut Vec<Node>) -> NodeId {
    let id = NodeId(nodes.len());
    let mut node = Node::new(stored.name, stored.data);
    node.external_id = stored.external_id;
    node.progress.repeat = stored.repeat;
    nodes.push(node);
    let children: Vec<NodeId> = stored
        .children
        .into_iter()
        .map(|child| flatten(child, nodes))
        .collect();
    nodes[id.0].children = children;
    id
}

fn store_node(doc: &Document, id: NodeId) -> StoredNode {
    let node = doc.node(id);
    StoredNode {
        name: node.name().to_string(),
        external_id: node.external_id().map(str::to_string),
        data: node.data().clone(),
        repeat: node.progress().repeat,
        children: node
            .children()
            .iter()
            .map(|child| store_node(doc, *child))
            .collect(),
    }
}

/// Discover the plan file by walking up from the given directory
pub fn discover_document(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DEFAULT_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(StoreError::NotFound);
        }
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
