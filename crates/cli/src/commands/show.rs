// `revisit show`: print one remembered position.

use clap::Args;

use super::{parse_document, EntryView, NotTracked, OpenStore, StoreArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id (vault-relative path).
    doc: String,
    #[command(flatten)]
    store: StoreArgs,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ShowArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = args.store.open().and_then(|open| show(&open, &args.doc));
    output::emit(format, result, EntryView::human_line)
}

fn show(open: &OpenStore, raw: &str) -> anyhow::Result<EntryView> {
    let doc = parse_document(raw)?;
    let state = open.positions.get(&doc).ok_or_else(|| NotTracked(doc.clone()))?;
    Ok(EntryView::new(doc, state))
}
