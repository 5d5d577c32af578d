// CLI subcommand dispatch and the helpers shared by the store commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use revisit_common::path::normalize_document_id;
use revisit_common::{CursorRange, DocumentId, EphemeralState};
use revisit_tracker::{FlushOutcome, PositionMap, StateStore, TrackerConfig, TrackerPaths};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod config;
pub mod forget;
pub mod list;
pub mod prune;
pub mod rename;
pub mod show;

#[derive(Subcommand)]
pub enum Command {
    /// List tracked documents with their cursor and scroll
    List(list::ListArgs),
    /// Show the remembered position of one document
    Show(show::ShowArgs),
    /// Forget the remembered position of one document
    Forget(forget::ForgetArgs),
    /// Move a remembered position to a new document id
    Rename(rename::RenameArgs),
    /// Drop entries for documents missing under a vault root
    Prune(prune::PruneArgs),
    /// Print the effective configuration
    Config(config::ConfigArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::List(args) => list::run(args),
        Command::Show(args) => show::run(args),
        Command::Forget(args) => forget::run(args),
        Command::Rename(args) => rename::run(args),
        Command::Prune(args) => prune::run(args),
        Command::Config(args) => config::run(args),
    }
}

/// Lookup of a document that has no entry.
#[derive(Debug, Error)]
#[error("document `{0}` is not tracked")]
pub struct NotTracked(pub DocumentId);

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Position file to operate on (defaults to the configured one).
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

impl StoreArgs {
    fn db_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }
        let paths = TrackerPaths::resolve().context("failed to locate the revisit directory")?;
        let config = TrackerConfig::load(&paths.settings_path);
        Ok(paths.db_path(&config))
    }

    pub fn open(&self) -> anyhow::Result<OpenStore> {
        OpenStore::open(self.db_path()?)
    }
}

/// The position file loaded into a working copy.
pub struct OpenStore {
    pub store: StateStore,
    pub positions: PositionMap,
}

impl OpenStore {
    /// Load `path`. An unreadable or corrupt file is an error so the
    /// following flush can never replace it with a partial map.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let store = StateStore::local(path);
        let entries = store.try_load().context("failed to load positions")?;
        debug!(path = %store.path().display(), entries = entries.len(), "loaded positions");
        Ok(Self { positions: PositionMap::from_map(entries), store })
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Persist the working copy. Returns whether the file was written.
    pub fn flush(&self) -> anyhow::Result<bool> {
        let outcome = self.store.flush(&self.positions).context("failed to save positions")?;
        Ok(matches!(outcome, FlushOutcome::Written { .. }))
    }
}

/// Parse a document argument into the normalized map key.
pub fn parse_document(raw: &str) -> anyhow::Result<DocumentId> {
    normalize_document_id(raw).with_context(|| format!("invalid document id `{raw}`"))
}

/// One map entry as printed by `list` and `show`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryView {
    pub document: DocumentId,
    #[serde(flatten)]
    pub state: EphemeralState,
}

impl EntryView {
    pub fn new(document: DocumentId, state: EphemeralState) -> Self {
        Self { document, state }
    }

    /// `a.md  cursor 3:0-3:7  scroll 120`
    pub fn human_line(&self) -> String {
        let mut line = self.document.to_string();
        if let Some(cursor) = self.state.cursor {
            line.push_str(&format!("  cursor {}", format_range(cursor)));
        }
        if let Some(scroll) = self.state.scroll {
            line.push_str(&format!("  scroll {scroll}"));
        }
        line
    }
}

/// `line:ch`, or `line:ch-line:ch` for a non-empty selection.
pub fn format_range(range: CursorRange) -> String {
    let from = format!("{}:{}", range.from.line, range.from.ch);
    if range.from == range.to {
        from
    } else {
        format!("{from}-{}:{}", range.to.line, range.to.ch)
    }
}
