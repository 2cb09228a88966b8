//! The reconciliation engine.
//!
//! [`reconcile`] merges the parsed topology, the freshly extracted EDID
//! identities, the window manager's workspaces and the previous
//! [`IdentityStore`] snapshot into one [`Reconciliation`].  It is a pure
//! function: the store is only read, and the next snapshot is derived from
//! the result by [`IdentityStore::next_snapshot`].
//!
//! After reconciliation every workspace known to the window manager is
//! assigned to exactly one output.

use crate::output::{Output, Transition};
use crate::store::IdentityStore;
use crate::topology::OutputReport;
use crate::workspaces::WorkspaceIndex;
use log::debug;
use std::collections::{HashMap, HashSet};

/// An output together with its classification for this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledOutput {
    pub output: Output,
    pub transition: Transition,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// One entry per reported output, in report order.
    pub outputs: Vec<ReconciledOutput>,
    pub any_plugged: bool,
    pub any_unplugged: bool,
}

impl Reconciliation {
    /// Whether a monitor appeared or disappeared since the last run.
    pub fn setup_changed(&self) -> bool {
        self.any_plugged || self.any_unplugged
    }

    /// Look up a reconciled output by connector name.
    pub fn get(&self, name: &str) -> Option<&ReconciledOutput> {
        self.outputs.iter().find(|o| o.output.name == name)
    }
}

/// Resolve an output's identity: fresh EDID, then the name cached in the
/// store, then empty.
pub fn resolve_identity(
    name: &str,
    fresh: &HashMap<String, String>,
    store: &IdentityStore,
) -> String {
    if let Some(id) = fresh.get(name).filter(|id| !id.is_empty()) {
        return id.clone();
    }
    if let Some(id) = store.identity_for_name(name) {
        debug!("{}: no EDID, using cached identity", name);
        return id.to_string();
    }
    String::new()
}

/// Run the reconciliation engine.
///
/// * `reports`: parsed topology, one per connector.
/// * `identities`: `output_name -> identity` from the EDID source.
/// * `index`: current workspace assignments.
/// * `store`: snapshot of the identity store from the previous run.
pub fn reconcile(
    reports: Vec<OutputReport>,
    identities: &HashMap<String, String>,
    index: &WorkspaceIndex,
    store: &IdentityStore,
) -> Reconciliation {
    let mut outputs: Vec<ReconciledOutput> = reports
        .into_iter()
        .map(|report| {
            let identity = resolve_identity(&report.name, identities, store);
            let workspaces = index.workspaces_on(&report.name).to_vec();
            let output = Output {
                name: report.name,
                identity,
                connection: report.connection,
                active: report.active,
                geometry: report.geometry,
                primary: report.primary,
                rotation: report.rotation,
                workspaces,
            };
            let transition = output.transition();
            debug!("{}: {} ({})", output.name, transition, output.connection);
            ReconciledOutput { output, transition }
        })
        .collect();

    restore_plugged(&mut outputs, index, store);

    let any_plugged = outputs.iter().any(|o| o.transition == Transition::Plugged);
    let any_unplugged = outputs.iter().any(|o| o.transition == Transition::Unplugged);

    Reconciliation {
        outputs,
        any_plugged,
        any_unplugged,
    }
}

/// Give every plugged output back the workspaces it held last time, taking
/// them away from whichever output has them now.
fn restore_plugged(outputs: &mut [ReconciledOutput], index: &WorkspaceIndex, store: &IdentityStore) {
    let mut claimed: HashSet<String> = HashSet::new();

    for i in 0..outputs.len() {
        if outputs[i].transition != Transition::Plugged || outputs[i].output.identity.is_empty() {
            continue;
        }
        let Some(record) = store.record(&outputs[i].output.identity) else {
            debug!("{}: no saved record", outputs[i].output.name);
            continue;
        };

        let mut restored: Vec<String> = Vec::new();
        for ws in &record.workspaces {
            if !index.contains(ws) {
                debug!("{}: saved workspace {} no longer exists", outputs[i].output.name, ws);
                continue;
            }
            if claimed.insert(ws.clone()) {
                restored.push(ws.clone());
            }
        }

        for (j, other) in outputs.iter_mut().enumerate() {
            if j != i {
                other.output.workspaces.retain(|ws| !restored.contains(ws));
            }
        }

        let target = &mut outputs[i].output;
        debug!("{}: restoring workspaces {:?}", target.name, restored);
        let already_there: Vec<String> = target
            .workspaces
            .iter()
            .filter(|ws| !restored.contains(ws))
            .cloned()
            .collect();
        let mut merged = restored;
        merged.extend(already_there);
        target.workspaces = merged;
    }
}
