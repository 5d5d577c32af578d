// `revisit forget`: drop one remembered position.

use clap::Args;
use revisit_common::{DocumentId, EphemeralState};
use serde::{Deserialize, Serialize};

use super::{parse_document, OpenStore, StoreArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ForgetArgs {
    /// Document id (vault-relative path).
    doc: String,
    #[command(flatten)]
    store: StoreArgs,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgetResult {
    pub document: DocumentId,
    /// The entry that was removed, if there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<EphemeralState>,
    pub written: bool,
}

pub fn run(args: ForgetArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = args.store.open().and_then(|open| forget(&open, &args.doc));
    output::emit(format, result, format_human)
}

/// Same as a host delete: a missing entry is not an error.
fn forget(open: &OpenStore, raw: &str) -> anyhow::Result<ForgetResult> {
    let document = parse_document(raw)?;
    let removed = open.positions.remove(&document);
    let written = open.flush()?;
    Ok(ForgetResult { document, removed, written })
}

fn format_human(result: &ForgetResult) -> String {
    match result.removed {
        Some(_) => format!("Forgot {}.", result.document),
        None => format!("{} was not tracked.", result.document),
    }
}
