// `revisit list`: list tracked documents.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::{EntryView, OpenStore, StoreArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    pub db: String,
    #[serde(default)]
    pub entries: Vec<EntryView>,
}

pub fn run(args: ListArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = args.store.open().map(|open| list(&open));
    output::emit(format, result, format_human)
}

fn list(open: &OpenStore) -> ListResult {
    let mut entries: Vec<EntryView> = open
        .positions
        .snapshot()
        .into_iter()
        .map(|(document, state)| EntryView::new(document, state))
        .collect();
    entries.sort_by(|a, b| a.document.cmp(&b.document));
    ListResult { db: open.path().display().to_string(), entries }
}

fn format_human(result: &ListResult) -> String {
    if result.entries.is_empty() {
        return format!("No positions in {}.", result.db);
    }

    let mut lines = Vec::with_capacity(result.entries.len() + 1);
    lines.push(format!("{} document(s) in {}", result.entries.len(), result.db));
    for entry in &result.entries {
        lines.push(format!("  {}", entry.human_line()));
    }
    lines.join("\n")
}
