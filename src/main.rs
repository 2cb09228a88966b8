//! Entry point for **screenkeep**.
//!
//! Runs a single reconciliation pass and exits.  Meant to be bound to a
//! hotkey or run from a udev/hotplug hook:
//!
//! ```text
//! screenkeep          # reconcile; save only when nothing was (un)plugged
//! screenkeep save     # reconcile and always save the current layout
//! ```

use log::{error, info};
use screenkeep::config::Config;
use screenkeep::i3::wm::I3;
use screenkeep::pass::{save_requested, ReconciliationPass};
use screenkeep::x11::edid::SysfsEdid;
use screenkeep::x11::xrandr::Xrandr;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/screenkeep`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("screenkeep")
}

/// Try to load the config from `$XDG_CONFIG_HOME/screenkeep/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    if !path.exists() {
        info!("no config at {}, using defaults", path.display());
        return Config::default();
    }
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            error!("{}, using defaults", e);
            Config::default()
        }
    }
}

//  Main 

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg = std::env::args().nth(1);
    let save = save_requested(arg.as_deref());

    let config = load_config();
    let store_path = config.store_path(&home_dir());

    let pass = ReconciliationPass::new(
        Xrandr::new(config.xrandr.as_str()),
        SysfsEdid::new(&config.edid_root),
        I3::new(config.i3_msg.as_str()),
    );

    match pass.run(&store_path, save) {
        Ok(report) => {
            let r = &report.plan.reconciliation;
            info!(
                "{} output(s), plugged={} unplugged={}, layout {}, workspaces {}",
                r.outputs.len(),
                r.any_plugged,
                r.any_unplugged,
                if report.layout_applied { "applied" } else { "unchanged" },
                if report.workspaces_moved { "moved" } else { "unchanged" },
            );
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
