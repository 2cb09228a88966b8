//! Identity store: what screenkeep remembers between runs.
//!
//! The store is a flat JSON object with two kinds of keys:
//!
//! * output names map to the identity last seen on that connector, so a
//!   monitor whose EDID cannot be read is still recognised;
//! * identities map to the monitor's last known workspaces and xrandr
//!   arguments.
//!
//! ```json
//! {
//!   "HDMI-1": "EKxqoEw0MjAaGgDELLU2415",
//!   "EKxqoEw0MjAaGgDELLU2415": {
//!     "workspaces": ["3", "4"],
//!     "args": "--mode 1920x1080 --pos 1920x0"
//!   }
//! }
//! ```
//!
//! Records are only rewritten when a save is in effect or when their
//! monitor was just unplugged (see [`IdentityStore::next_snapshot`]), so a
//! hand-tuned layout is not clobbered by a transient hot-plug.

use crate::layout::LayoutInstruction;
use crate::output::Transition;
use crate::reconcile::Reconciliation;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Last known state of one physical monitor.
///
/// This is a typed view of a record entry.  The file keeps the raw JSON, so
/// fields screenkeep does not know about survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersistedRecord {
    #[serde(default)]
    pub workspaces: Vec<String>,
    /// Serialized [`LayoutInstruction`].  Absent in records that were
    /// created without a layout.
    #[serde(default)]
    pub args: Option<String>,
}

/// Errors from reading or writing the store file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Snapshot of the store file.
///
/// Entries are kept as raw JSON.  Only [`set_identity`](Self::set_identity)
/// and [`set_record`](Self::set_record) change them; everything else is
/// written back exactly as it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityStore {
    entries: BTreeMap<String, Value>,
}

/// Whether this pass should save every connected output.
///
/// Saving is the default when nothing was plugged or unplugged; after a
/// hot-plug only an explicit request saves.
pub fn should_save(reconciliation: &Reconciliation, save_requested: bool) -> bool {
    !reconciliation.setup_changed() || save_requested
}

impl IdentityStore {
    /// Load the store from `path`.  A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no store at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rewrite the whole file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Pretty-printed JSON with sorted keys.
    pub fn to_json(&self) -> Result<String, StoreError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Identity last seen on the connector `name`.
    pub fn identity_for_name(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Saved record for `identity`.  An object whose known fields have the
    /// wrong shape is not a record.
    pub fn record(&self, identity: &str) -> Option<PersistedRecord> {
        match self.entries.get(identity) {
            Some(value @ Value::Object(_)) => match PersistedRecord::deserialize(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("{}: unusable record: {}", identity, e);
                    None
                }
            },
            _ => None,
        }
    }

    pub fn set_identity(&mut self, name: &str, identity: &str) {
        self.entries
            .insert(name.to_string(), Value::String(identity.to_string()));
    }

    /// Overwrite the known fields of `identity`'s record.  Other fields of
    /// an existing record are kept.
    pub fn set_record(&mut self, identity: &str, record: PersistedRecord) {
        let mut fields = match self.entries.remove(identity) {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        fields.insert("workspaces".to_string(), Value::from(record.workspaces));
        match record.args {
            Some(args) => fields.insert("args".to_string(), Value::String(args)),
            None => fields.remove("args"),
        };
        self.entries.insert(identity.to_string(), Value::Object(fields));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derive the snapshot to write after `reconciliation`.
    ///
    /// * Every output with an identity refreshes its name → identity entry.
    /// * When [`should_save`] holds, every connected output and every
    ///   unplugged output gets its record overwritten with its current
    ///   workspaces and layout.
    /// * Otherwise only unplugged outputs are refreshed, capturing their
    ///   last layout before they go dark.
    ///
    /// Every other entry is carried forward verbatim.
    pub fn next_snapshot(&self, reconciliation: &Reconciliation, save_requested: bool) -> Self {
        let save_all = should_save(reconciliation, save_requested);
        let mut next = self.clone();

        for r in &reconciliation.outputs {
            let output = &r.output;
            if output.identity.is_empty() {
                continue;
            }
            next.set_identity(&output.name, &output.identity);

            let refresh = r.transition == Transition::Unplugged
                || (save_all && output.is_connected());
            if refresh {
                debug!("saving {} as {}", output.name, output.identity);
                next.set_record(
                    &output.identity,
                    PersistedRecord {
                        workspaces: output.workspaces.clone(),
                        args: Some(LayoutInstruction::for_output(output).to_string()),
                    },
                );
            }
        }

        next
    }
}
