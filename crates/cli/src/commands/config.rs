// `revisit config`: print the effective tracker configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use revisit_tracker::{TrackerConfig, TrackerPaths};
use serde::{Deserialize, Serialize};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Directory holding settings and positions (defaults to ~/.revisit).
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    pub settings_path: String,
    pub settings_found: bool,
    pub db_path: String,
    /// Open delay after clamping, in milliseconds.
    pub open_delay_ms: u64,
    /// Flush period after clamping, in milliseconds.
    pub save_interval_ms: u64,
    /// Values as written in the settings file (or defaults).
    pub configured: TrackerConfig,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match args.base_dir {
        Some(dir) => Ok(TrackerPaths::in_dir(dir)),
        None => TrackerPaths::resolve().context("failed to locate the revisit directory"),
    }
    .map(|paths| effective(&paths));
    output::emit(format, result, format_human)
}

fn effective(paths: &TrackerPaths) -> ConfigView {
    let configured = TrackerConfig::load(&paths.settings_path);
    ConfigView {
        settings_path: paths.settings_path.display().to_string(),
        settings_found: paths.settings_path.is_file(),
        db_path: paths.db_path(&configured).display().to_string(),
        open_delay_ms: millis(configured.open_delay()),
        save_interval_ms: millis(configured.save_interval()),
        configured,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn format_human(view: &ConfigView) -> String {
    let source = if view.settings_found { "" } else { " (not found, using defaults)" };
    [
        format!("settings:      {}{source}", view.settings_path),
        format!("positions:     {}", view.db_path),
        format!("open delay:    {} ms", view.open_delay_ms),
        format!("save interval: {} ms", view.save_interval_ms),
    ]
    .join("\n")
}
