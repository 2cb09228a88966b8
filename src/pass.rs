//! One reconciliation pass, from queries to persisted state.
//!
//! [`ReconciliationPass`] owns the three backends and runs:
//!
//! 1. the topology, EDID and workspace queries, concurrently;
//! 2. the [`reconcile`] engine against the stored snapshot;
//! 3. the store write;
//! 4. the xrandr layout, when a monitor appeared or disappeared;
//! 5. the workspace migration, when a monitor appeared.
//!
//! The store is written before the layout is applied.  A layout the tool
//! rejects is reported but the store write is not rolled back.

use crate::identity::edid_identity;
use crate::layout::{layout_plan, OutputClause};
use crate::migration::{self, MigrationCommand};
use crate::reconcile::{reconcile, Reconciliation};
use crate::store::{should_save, IdentityStore, StoreError};
use crate::topology::{parse_report, ParseError};
use crate::traits::{DisplayServer, IdentitySource, ToolError, WindowManager};
use crate::workspaces::WorkspaceIndex;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;
use std::thread::ScopedJoinHandle;

/// Possible errors from a pass.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// An external query failed; nothing was changed.
    #[error("{what} query failed: {message}")]
    Query {
        what: &'static str,
        message: String,
        code: Option<i32>,
    },
    /// The topology report could not be parsed; nothing was changed.
    #[error("topology parse error: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Applying the layout or the workspace moves failed.
    #[error("{what} failed: {message}")]
    Apply {
        what: &'static str,
        message: String,
        code: Option<i32>,
    },
    /// No workspace is focused, so there is nothing to restore focus to.
    /// The layout may already have been applied.
    #[error("no focused workspace")]
    NoFocusedWorkspace,
}

impl PassError {
    fn query<E: ToolError>(what: &'static str, e: E) -> Self {
        PassError::Query {
            what,
            message: e.to_string(),
            code: e.exit_code(),
        }
    }

    fn apply<E: ToolError>(what: &'static str, e: E) -> Self {
        PassError::Apply {
            what,
            message: e.to_string(),
            code: e.exit_code(),
        }
    }

    /// Process exit code: the external tool's own code when known, else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PassError::Query { code, .. } | PassError::Apply { code, .. } => {
                code.filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

/// Whether the command-line argument asks for an explicit save.
pub fn save_requested(arg: Option<&str>) -> bool {
    arg.is_some_and(|a| a.contains("save"))
}

/// Everything a pass decided, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub reconciliation: Reconciliation,
    /// Focused workspace, when the window manager reported one.
    pub focused: Option<String>,
    pub should_save: bool,
    /// One clause per output.
    pub layout: Vec<OutputClause>,
    /// Workspace moves; empty unless an output was plugged.
    pub migration: Vec<MigrationCommand>,
    /// The store to write at the end of the pass.
    pub next_store: IdentityStore,
}

/// Outcome of [`ReconciliationPass::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub plan: Plan,
    pub layout_applied: bool,
    pub workspaces_moved: bool,
}

/// Orchestrates one pass over the three backends.
///
/// Generic over every backend trait, so tests drive it with recording
/// doubles.
pub struct ReconciliationPass<D, I, W> {
    display: D,
    edids: I,
    wm: W,
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

impl<D, I, W> ReconciliationPass<D, I, W>
where
    D: DisplayServer,
    I: IdentitySource,
    W: WindowManager,
{
    pub fn new(display: D, edids: I, wm: W) -> Self {
        Self { display, edids, wm }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn window_manager(&self) -> &W {
        &self.wm
    }

    /// Query all three sources concurrently and build the plan against
    /// `store`.  No side effects.
    pub fn plan(&self, store: &IdentityStore, save_requested: bool) -> Result<Plan, PassError> {
        let (topology, blobs, workspaces) = std::thread::scope(|s| {
            let topology = s.spawn(|| self.display.query_topology());
            let blobs = s.spawn(|| self.edids.edid_blobs());
            let workspaces = s.spawn(|| self.wm.workspaces());
            (join(topology), join(blobs), join(workspaces))
        });

        let topology = topology.map_err(|e| PassError::query("topology", e))?;
        let blobs = blobs.map_err(|e| PassError::query("EDID", e))?;
        let workspaces = workspaces.map_err(|e| PassError::query("workspace", e))?;

        let reports = parse_report(&topology)?;

        let mut identities = HashMap::new();
        for (name, blob) in blobs {
            match edid_identity(&blob) {
                Some(id) => {
                    identities.insert(name, id);
                }
                None => debug!("{}: EDID unavailable ({} bytes)", name, blob.len()),
            }
        }

        let index = WorkspaceIndex::new(workspaces);
        debug!("{} output(s), {} workspace(s)", reports.len(), index.len());
        let reconciliation = reconcile(reports, &identities, &index, store);

        let focused = index.focused().ok().map(str::to_string);

        let layout = layout_plan(&reconciliation, store);
        let migration = match (&focused, reconciliation.any_plugged) {
            (Some(focused), true) => {
                migration::plan(&reconciliation, focused, self.wm.move_capability())
            }
            _ => Vec::new(),
        };

        Ok(Plan {
            should_save: should_save(&reconciliation, save_requested),
            next_store: store.next_snapshot(&reconciliation, save_requested),
            reconciliation,
            focused,
            layout,
            migration,
        })
    }

    /// Run a full pass against the store file at `store_path`.
    pub fn run(&self, store_path: &Path, save_requested: bool) -> Result<PassReport, PassError> {
        let store = IdentityStore::load(store_path)?;
        let plan = self.plan(&store, save_requested)?;
        let r = &plan.reconciliation;

        for clause in &plan.layout {
            info!("{}", clause);
        }
        info!(
            "plugged={} unplugged={} save={}",
            r.any_plugged, r.any_unplugged, plan.should_save
        );

        plan.next_store.save(store_path)?;
        debug!("wrote {}", store_path.display());

        let layout_applied = r.setup_changed();
        if layout_applied {
            self.display
                .apply_layout(&plan.layout)
                .map_err(|e| PassError::apply("layout", e))?;
        }

        let workspaces_moved = r.any_plugged;
        if workspaces_moved {
            if plan.focused.is_none() {
                return Err(PassError::NoFocusedWorkspace);
            }
            self.wm
                .run_commands(&plan.migration)
                .map_err(|e| PassError::apply("workspace migration", e))?;
        }

        Ok(PassReport {
            plan,
            layout_applied,
            workspaces_moved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MoveCapability;
    use crate::output::{Transition, Workspace};
    use crate::store::PersistedRecord;
    use crate::traits::testing::{MockDisplay, MockEdids, MockWm};

    fn ws(name: &str, output: &str, focused: bool) -> Workspace {
        Workspace {
            name: name.into(),
            output: output.into(),
            focused,
        }
    }

    /// 128-byte EDID whose identity is derived from `tag`.
    fn edid(tag: &[u8]) -> Vec<u8> {
        let mut e = vec![0u8; 128];
        e[8..8 + tag.len()].copy_from_slice(tag);
        e
    }

    fn id_of(tag: &[u8]) -> String {
        edid_identity(&edid(tag)).unwrap()
    }

    const DOCKED: &str = "\
Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 344mm x 194mm
   1920x1080     60.02*+
HDMI-1 connected 1920x1080+1920+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+
";

    const REPLUGGED: &str = "\
Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 344mm x 194mm
   1920x1080     60.02*+
HDMI-1 connected (normal left inverted right x axis y axis)
   1920x1080     60.00 +
";

    const UNPLUGGED: &str = "\
Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 344mm x 194mm
   1920x1080     60.02*+
HDMI-1 disconnected 1920x1080+1920+0 (normal left inverted right x axis y axis) 0mm x 0mm
";

    fn edids() -> MockEdids {
        MockEdids(HashMap::from([
            ("eDP-1".to_string(), edid(b"laptop")),
            ("HDMI-1".to_string(), edid(b"external")),
        ]))
    }

    fn store_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs.json");
        (dir, path)
    }

    #[test]
    fn save_flag_parsing() {
        assert!(!save_requested(None));
        assert!(save_requested(Some("save")));
        assert!(save_requested(Some("--save")));
        assert!(!save_requested(Some("restore")));
    }

    #[test]
    fn steady_state_pass_saves_and_applies_nothing() {
        let (_dir, path) = store_file();
        let pass = ReconciliationPass::new(
            MockDisplay::new(DOCKED),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", true), ws("2", "HDMI-1", false)]),
        );

        let report = pass.run(&path, false).unwrap();
        assert!(!report.layout_applied);
        assert!(!report.workspaces_moved);
        assert!(report.plan.should_save);
        assert!(pass.display().applied().is_empty());
        assert!(pass.window_manager().commands().is_empty());

        let stored = IdentityStore::load(&path).unwrap();
        let hdmi = id_of(b"external");
        assert_eq!(stored.identity_for_name("HDMI-1"), Some(hdmi.as_str()));
        assert_eq!(
            stored.record(&hdmi),
            Some(PersistedRecord {
                workspaces: vec!["2".into()],
                args: Some("--mode 1920x1080 --pos 1920x0".into()),
            })
        );
    }

    #[test]
    fn no_op_pass_is_idempotent() {
        let (_dir, path) = store_file();
        let pass = ReconciliationPass::new(
            MockDisplay::new(DOCKED),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", true), ws("2", "HDMI-1", false)]),
        );
        pass.run(&path, false).unwrap();
        let store = IdentityStore::load(&path).unwrap();

        let first = pass.plan(&store, false).unwrap();
        let second = pass.plan(&first.next_store, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.next_store, store);
        assert!(first.migration.is_empty());
    }

    #[test]
    fn unplug_then_replug_restores_layout_and_workspaces() {
        let (_dir, path) = store_file();

        // Docked: remember where everything lives.
        ReconciliationPass::new(
            MockDisplay::new(DOCKED),
            edids(),
            MockWm::new(vec![
                ws("1", "eDP-1", true),
                ws("2", "HDMI-1", false),
                ws("3", "HDMI-1", false),
            ]),
        )
        .run(&path, false)
        .unwrap();

        // Cable pulled: HDMI-1 still holds its mode, i3 has not moved
        // anything yet.
        let unplug = ReconciliationPass::new(
            MockDisplay::new(UNPLUGGED),
            MockEdids(HashMap::from([("eDP-1".to_string(), edid(b"laptop"))])),
            MockWm::new(vec![
                ws("1", "eDP-1", true),
                ws("2", "HDMI-1", false),
                ws("3", "HDMI-1", false),
            ]),
        );
        let report = unplug.run(&path, false).unwrap();
        assert!(report.plan.reconciliation.any_unplugged);
        assert!(report.layout_applied);
        assert!(!report.workspaces_moved);
        assert_eq!(
            unplug.display().applied()[0],
            [
                OutputClause::Configure {
                    output: "eDP-1".into(),
                    args: "--primary --mode 1920x1080 --pos 0x0".into()
                },
                OutputClause::Off {
                    output: "HDMI-1".into()
                },
            ]
        );

        // Plugged back in: i3 has meanwhile moved everything to eDP-1.
        let replug = ReconciliationPass::new(
            MockDisplay::new(REPLUGGED),
            edids(),
            MockWm::new(vec![
                ws("1", "eDP-1", false),
                ws("2", "eDP-1", true),
                ws("3", "eDP-1", false),
            ]),
        );
        let report = replug.run(&path, false).unwrap();
        let hdmi = report.plan.reconciliation.get("HDMI-1").unwrap();
        assert_eq!(hdmi.transition, Transition::Plugged);
        assert_eq!(hdmi.output.workspaces, ["2", "3"]);

        assert_eq!(
            replug.display().applied()[0][1],
            OutputClause::Configure {
                output: "HDMI-1".into(),
                args: "--mode 1920x1080 --pos 1920x0".into()
            }
        );
        assert_eq!(
            migration::render(&replug.window_manager().commands()[0]),
            "workspace --no-auto-back-and-forth 1; move workspace to output eDP-1; \
             workspace --no-auto-back-and-forth 2; move workspace to output HDMI-1; \
             workspace --no-auto-back-and-forth 3; move workspace to output HDMI-1; \
             workspace --no-auto-back-and-forth 2"
        );
    }

    #[test]
    fn hot_plug_keeps_other_records() {
        let (_dir, path) = store_file();
        let laptop = id_of(b"laptop");
        let external = id_of(b"external");
        let mut prior = IdentityStore::default();
        prior.set_record(
            &laptop,
            PersistedRecord {
                workspaces: vec!["1".into()],
                args: Some("--primary --mode 1600x900 --pos 0x0".into()),
            },
        );
        prior.set_record(
            "SOMEONE-ELSE",
            PersistedRecord {
                workspaces: vec!["8".into()],
                args: Some("--mode 800x600".into()),
            },
        );
        prior.save(&path).unwrap();

        let pass = ReconciliationPass::new(
            MockDisplay::new(UNPLUGGED),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", true), ws("4", "HDMI-1", false)]),
        );
        let report = pass.run(&path, false).unwrap();
        assert!(!report.plan.should_save);

        let stored = IdentityStore::load(&path).unwrap();
        assert_eq!(stored.record(&laptop), prior.record(&laptop));
        assert_eq!(stored.record("SOMEONE-ELSE"), prior.record("SOMEONE-ELSE"));
        assert_eq!(stored.record(&external).unwrap().workspaces, ["4"]);
    }

    #[test]
    fn disconnected_output_with_record_is_a_no_op() {
        let (_dir, path) = store_file();
        let report = "DP-1 connected 1920x1080+0+0\nHDMI-1 disconnected (normal left)\n";
        let mut prior = IdentityStore::default();
        prior.set_identity("HDMI-1", "H");
        prior.set_record(
            "H",
            PersistedRecord {
                workspaces: vec!["3".into()],
                args: Some("--mode 1920x1080 --pos 1920x0".into()),
            },
        );
        prior.save(&path).unwrap();

        let pass = ReconciliationPass::new(
            MockDisplay::new(report),
            MockEdids(HashMap::from([("DP-1".to_string(), edid(b"dp"))])),
            MockWm::new(vec![ws("1", "DP-1", true)]),
        );
        let first = pass.run(&path, false).unwrap();
        assert!(!first.plan.reconciliation.any_unplugged);
        assert!(!first.layout_applied);
        assert_eq!(
            IdentityStore::load(&path).unwrap().record("H"),
            prior.record("H")
        );

        let second = pass.run(&path, false).unwrap();
        assert_eq!(first.plan.layout, second.plan.layout);
        assert!(pass.display().applied().is_empty());
    }

    #[test]
    fn plug_and_unplug_together_move_nothing_onto_the_dark_output() {
        let (_dir, path) = store_file();
        let report = "\
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 344mm x 194mm
   1920x1080     60.02*+
HDMI-1 connected (normal left inverted right x axis y axis)
   1920x1080     60.00 +
DP-1 disconnected 2560x1440+1920+0 (normal left inverted right x axis y axis) 0mm x 0mm
";
        let pass = ReconciliationPass::new(
            MockDisplay::new(report),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", true), ws("5", "DP-1", false)]),
        );
        let report = pass.run(&path, false).unwrap();
        assert!(report.plan.reconciliation.any_plugged);
        assert!(report.plan.reconciliation.any_unplugged);
        assert_eq!(
            pass.display().applied()[0][2],
            OutputClause::Off {
                output: "DP-1".into()
            }
        );
        assert_eq!(
            migration::render(&pass.window_manager().commands()[0]),
            "workspace --no-auto-back-and-forth 1; move workspace to output eDP-1; \
             workspace --no-auto-back-and-forth 5; move workspace to output eDP-1; \
             workspace --no-auto-back-and-forth 1"
        );
    }

    #[test]
    fn query_failure_aborts_before_writing() {
        let (_dir, path) = store_file();
        let mut display = MockDisplay::new(DOCKED);
        display.fail_query = Some(4);
        let pass = ReconciliationPass::new(display, edids(), MockWm::new(vec![ws("1", "eDP-1", true)]));

        let err = pass.run(&path, false).unwrap_err();
        assert!(matches!(err, PassError::Query { what: "topology", .. }));
        assert_eq!(err.exit_code(), 4);
        assert!(!path.exists());
    }

    #[test]
    fn workspace_query_failure_defaults_to_exit_one() {
        let (_dir, path) = store_file();
        let mut wm = MockWm::new(vec![]);
        wm.fail_query = true;
        let pass = ReconciliationPass::new(MockDisplay::new(DOCKED), edids(), wm);
        let err = pass.run(&path, false).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn parse_failure_aborts_before_writing() {
        let (_dir, path) = store_file();
        let pass = ReconciliationPass::new(
            MockDisplay::new("DP-1 connected 1920x1080+0\n"),
            edids(),
            MockWm::new(vec![ws("1", "DP-1", true)]),
        );
        assert!(matches!(pass.run(&path, false), Err(PassError::Parse(_))));
        assert!(!path.exists());
    }

    #[test]
    fn rejected_layout_keeps_written_store() {
        let (_dir, path) = store_file();
        let mut display = MockDisplay::new(REPLUGGED);
        display.fail_apply = Some(2);
        let pass = ReconciliationPass::new(display, edids(), MockWm::new(vec![ws("1", "eDP-1", true)]));

        let err = pass.run(&path, false).unwrap_err();
        assert!(matches!(err, PassError::Apply { what: "layout", .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(path.exists());
        assert!(pass.window_manager().commands().is_empty());
    }

    #[test]
    fn plug_without_focus_fails_after_layout() {
        let (_dir, path) = store_file();
        let pass = ReconciliationPass::new(
            MockDisplay::new(REPLUGGED),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", false)]),
        );
        let err = pass.run(&path, false).unwrap_err();
        assert!(matches!(err, PassError::NoFocusedWorkspace));
        assert_eq!(pass.display().applied().len(), 1);
        assert!(pass.window_manager().commands().is_empty());
    }

    #[test]
    fn named_move_capability_is_used() {
        let (_dir, path) = store_file();
        let mut wm = MockWm::new(vec![ws("1", "eDP-1", true)]);
        wm.capability = MoveCapability::Named;
        let pass = ReconciliationPass::new(MockDisplay::new(REPLUGGED), edids(), wm);
        pass.run(&path, false).unwrap();
        assert_eq!(
            pass.window_manager().commands()[0],
            [
                MigrationCommand::MoveNamed {
                    workspace: "1".into(),
                    output: "eDP-1".into()
                },
                MigrationCommand::Focus("1".into()),
            ]
        );
    }

    #[test]
    fn corrupt_store_aborts() {
        let (_dir, path) = store_file();
        std::fs::write(&path, "[1, 2").unwrap();
        let pass = ReconciliationPass::new(
            MockDisplay::new(DOCKED),
            edids(),
            MockWm::new(vec![ws("1", "eDP-1", true)]),
        );
        assert!(matches!(pass.run(&path, false), Err(PassError::Store(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2");
    }
}
