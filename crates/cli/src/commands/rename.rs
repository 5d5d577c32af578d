// `revisit rename`: move a remembered position to a new document id.

use clap::Args;
use revisit_common::DocumentId;
use serde::{Deserialize, Serialize};

use super::{parse_document, OpenStore, StoreArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Current document id.
    old: String,
    /// New document id.
    new: String,
    #[command(flatten)]
    store: StoreArgs,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResult {
    pub from: DocumentId,
    pub to: DocumentId,
    pub moved: bool,
    pub written: bool,
}

pub fn run(args: RenameArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = args.store.open().and_then(|open| rename(&open, &args.old, &args.new));
    output::emit(format, result, format_human)
}

/// Same as a host rename: an existing entry at the new id is replaced, and a
/// missing entry at the old id changes nothing.
fn rename(open: &OpenStore, old: &str, new: &str) -> anyhow::Result<RenameResult> {
    let from = parse_document(old)?;
    let to = parse_document(new)?;
    let moved = open.positions.rename(&from, to.clone());
    let written = open.flush()?;
    Ok(RenameResult { from, to, moved, written })
}

fn format_human(result: &RenameResult) -> String {
    if result.moved {
        format!("Moved {} -> {}.", result.from, result.to)
    } else {
        format!("{} was not tracked; nothing moved.", result.from)
    }
}
