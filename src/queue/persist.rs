//! Saving and restoring the backlog.
//!
//! The backlog lives under the `"queue"` key of the host's save node as an
//! ordered list of `{ "funds", "rep", "subject" }` objects. Saving always
//! replaces that list wholesale; loading restores every entry it can and
//! skips the rest.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::BatchQueue;
use super::error::{PersistError, RecordError};
use crate::Amount;
use crate::model::ReportRecord;

/// Key of the queue container inside a save node.
pub const QUEUE_KEY: &str = "queue";

/// Host save node: a JSON object the queue owns one key of.
pub type SaveNode = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize)]
struct SavedRecord {
    funds: f64,
    rep: f64,
    subject: String,
}

impl From<&ReportRecord> for SavedRecord {
    fn from(record: &ReportRecord) -> Self {
        Self {
            funds: record.funds().to_float(),
            rep: record.reputation().to_float(),
            subject: record.subject().to_string(),
        }
    }
}

fn decode_record(index: usize, entry: &Value) -> Result<ReportRecord, RecordError> {
    let saved = SavedRecord::deserialize(entry)
        .map_err(|source| RecordError::Malformed { index, source })?;
    let amount = |field: &'static str, value: f64| {
        Amount::checked_from_float(value).ok_or(RecordError::OutOfRange {
            index,
            field,
            value,
        })
    };
    Ok(ReportRecord::new(
        amount("funds", saved.funds)?,
        amount("rep", saved.rep)?,
        saved.subject,
    ))
}

fn decode_entries(entries: &[Value]) -> VecDeque<ReportRecord> {
    let mut backlog = VecDeque::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match decode_record(index, entry) {
            Ok(record) => backlog.push_back(record),
            Err(e) => warn!(entry = %entry, "bad value found in queue, skipping: {e}"),
        }
    }
    backlog
}

/// Replace the queue container of `node`; a failed encoding stores an empty
/// container rather than a partial one.
fn store_entries(node: &mut SaveNode, entries: Result<Vec<Value>, serde_json::Error>) -> usize {
    let entries = match entries {
        Ok(entries) => entries,
        Err(e) => {
            error!("failed to encode message queue, saving it empty: {e}");
            Vec::new()
        }
    };
    let count = entries.len();
    node.insert(QUEUE_KEY.to_string(), Value::Array(entries));
    count
}

/// `Ok(None)` when the file does not exist.
fn read_node(path: &Path) -> Result<Option<SaveNode>, PersistError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| PersistError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

impl<L, N> BatchQueue<L, N> {
    fn encode_backlog(&self) -> Result<Vec<Value>, serde_json::Error> {
        self.backlog
            .iter()
            .map(|record| serde_json::to_value(SavedRecord::from(record)))
            .collect()
    }

    /// Replace the queue container of `node` with the current backlog.
    ///
    /// If the backlog cannot be encoded an empty container is written instead
    /// of a partial one.
    pub fn save(&self, node: &mut SaveNode) {
        let count = store_entries(node, self.encode_backlog());
        info!(records = count, "saved message queue");
    }

    /// Rebuild the backlog from the queue container of `node`.
    ///
    /// A node without a container yields an empty backlog and gets an empty
    /// container added. Malformed entries are skipped.
    pub fn load(&mut self, node: &mut SaveNode) {
        let backlog = match node.get(QUEUE_KEY) {
            Some(Value::Array(entries)) => decode_entries(entries),
            Some(other) => {
                warn!(value = %other, "queue container is not a list, starting empty");
                VecDeque::new()
            }
            None => VecDeque::new(),
        };
        if !node.contains_key(QUEUE_KEY) {
            info!("no queue to load");
            node.insert(QUEUE_KEY.to_string(), Value::Array(Vec::new()));
        }
        self.backlog = backlog;
        info!(records = self.backlog.len(), "loaded message queue");
    }

    /// Restore the backlog from the state file at `path`.
    ///
    /// A missing file is a fresh start. An unreadable or corrupt file is
    /// logged and also treated as a fresh start.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut node = match read_node(path) {
            Ok(Some(node)) => node,
            Ok(None) => {
                debug!(path = %path.display(), "no state file yet");
                SaveNode::new()
            }
            Err(e) => {
                warn!("{e}, starting with an empty queue");
                SaveNode::new()
            }
        };
        self.load(&mut node);
    }

    /// Save the backlog to the state file at `path`.
    ///
    /// Other keys already present in the file are kept. The file is written
    /// to a sibling `.tmp` file first and renamed over the target.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let mut node = match read_node(path) {
            Ok(node) => node.unwrap_or_default(),
            Err(e) => {
                warn!("{e}, overwriting it");
                SaveNode::new()
            }
        };
        self.save(&mut node);

        let encoded = serde_json::to_string_pretty(&node)?;
        let tmp_path = path.with_extension("tmp");
        let io_error = |source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp_path, encoded).map_err(io_error)?;
        fs::rename(&tmp_path, path).map_err(io_error)?;
        Ok(())
    }
}
