// `revisit prune`: drop positions of documents that no longer exist.
//
// Catches up on deletes and renames that happened while no host was
// running to report them. Keys that are not canonical document ids (absolute
// paths, `..` components) can never be looked up by the tracker and are
// dropped without touching the file system.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use clap::Args;
use revisit_common::path::normalize_document_id;
use revisit_common::DocumentId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{OpenStore, StoreArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Vault root that document ids are relative to.
    #[arg(long, value_name = "DIR")]
    root: PathBuf,
    #[command(flatten)]
    store: StoreArgs,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneResult {
    pub root: String,
    #[serde(default)]
    pub removed: Vec<DocumentId>,
    pub remaining: usize,
    pub written: bool,
}

pub fn run(args: PruneArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = args.store.open().and_then(|open| prune(&open, &args.root));
    output::emit(format, result, format_human)
}

fn prune(open: &OpenStore, root: &Path) -> anyhow::Result<PruneResult> {
    let meta = std::fs::metadata(root)
        .with_context(|| format!("cannot read vault root {}", root.display()))?;
    ensure!(meta.is_dir(), "vault root {} is not a directory", root.display());

    let removed = open.positions.retain(|doc| document_exists(root, doc));
    for doc in &removed {
        debug!(doc = %doc, "pruned missing document");
    }
    let written = open.flush()?;
    Ok(PruneResult {
        root: root.display().to_string(),
        removed,
        remaining: open.positions.len(),
        written,
    })
}

fn document_exists(root: &Path, doc: &DocumentId) -> bool {
    match normalize_document_id(doc.as_str()) {
        Ok(canonical) if canonical == *doc => root.join(doc.as_str()).is_file(),
        _ => false,
    }
}

fn format_human(result: &PruneResult) -> String {
    if result.removed.is_empty() {
        return format!("Nothing to prune; {} document(s) tracked.", result.remaining);
    }

    let mut lines = Vec::with_capacity(result.removed.len() + 1);
    lines.push(format!(
        "Pruned {} document(s), {} remaining.",
        result.removed.len(),
        result.remaining
    ));
    for doc in &result.removed {
        lines.push(format!("  {doc}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Vault {
        _dir: TempDir,
        root: PathBuf,
        db: PathBuf,
    }

    fn vault(files: &[&str], db_contents: &str) -> Vault {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("vault");
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "# note").unwrap();
        }
        std::fs::create_dir_all(&root).unwrap();
        let db = dir.path().join("positions.json");
        std::fs::write(&db, db_contents).unwrap();
        Vault { _dir: dir, root, db }
    }

    #[test]
    fn drops_missing_documents() {
        let v = vault(
            &["notes/kept.md"],
            r#"{"notes/kept.md":{"scroll":1.0},"notes/gone.md":{"scroll":2.0},"old.md":{}}"#,
        );

        let result = prune(&OpenStore::open(&v.db).unwrap(), &v.root).unwrap();
        assert_eq!(result.removed, [DocumentId::new("notes/gone.md"), DocumentId::new("old.md")]);
        assert_eq!(result.remaining, 1);
        assert!(result.written);

        let reopened = OpenStore::open(&v.db).unwrap();
        assert!(reopened.positions.contains(&DocumentId::new("notes/kept.md")));
        assert_eq!(reopened.positions.len(), 1);
    }

    #[test]
    fn directories_do_not_count_as_documents() {
        let v = vault(&["notes/a.md"], r#"{"notes":{"scroll":1.0}}"#);

        let result = prune(&OpenStore::open(&v.db).unwrap(), &v.root).unwrap();
        assert_eq!(result.removed, [DocumentId::new("notes")]);
    }

    #[test]
    fn keys_outside_the_vault_are_dropped() {
        let v = vault(&["a.md"], "{}");
        let outside = v.root.parent().unwrap().join("outside.md");
        std::fs::write(&outside, "# elsewhere").unwrap();
        let mut contents = serde_json::Map::new();
        contents.insert("a.md".into(), serde_json::json!({"scroll": 1.0}));
        contents.insert(outside.display().to_string(), serde_json::json!({"scroll": 2.0}));
        contents.insert("../outside.md".into(), serde_json::json!({"scroll": 3.0}));
        std::fs::write(&v.db, serde_json::Value::Object(contents).to_string()).unwrap();

        let result = prune(&OpenStore::open(&v.db).unwrap(), &v.root).unwrap();
        assert_eq!(result.removed.len(), 2);
        assert_eq!(result.remaining, 1);
        assert!(!result.removed.contains(&DocumentId::new("a.md")));
    }

    #[test]
    fn nothing_missing_writes_nothing() {
        let v = vault(&["a.md"], r#"{"a.md":{"scroll":1.0}}"#);

        let result = prune(&OpenStore::open(&v.db).unwrap(), &v.root).unwrap();
        assert!(result.removed.is_empty());
        assert!(!result.written);
        assert_eq!(format_human(&result), "Nothing to prune; 1 document(s) tracked.");
    }

    #[test]
    fn missing_root_is_an_error() {
        let v = vault(&[], r#"{"a.md":{"scroll":1.0}}"#);
        let open = OpenStore::open(&v.db).unwrap();

        assert!(prune(&open, &v.root.join("nope")).is_err());
        assert!(prune(&open, &v.db).is_err());
        assert_eq!(open.positions.len(), 1);
    }

    #[test]
    fn human_format_lists_removed() {
        let result = PruneResult {
            root: "/vault".into(),
            removed: vec![DocumentId::new("gone.md")],
            remaining: 3,
            written: true,
        };
        let output = format_human(&result);
        assert!(output.contains("Pruned 1 document(s), 3 remaining."));
        assert!(output.contains("  gone.md"));
    }
}
