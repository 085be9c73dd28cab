//! CLI presentation: text and json formatters per command.

use crate::error::EngineError;
use crate::snapshot::{File, FileKind, MergeOutcome};
use crate::types::Hash;
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::path::Path;

pub fn format_snapshot_result(hash: &Hash) -> String {
    hash.to_string()
}

/// One block per history entry, newest first.
pub fn format_log_text(entries: &[(Hash, File)], color: bool) -> String {
    let blocks: Vec<String> = entries
        .iter()
        .map(|(hash, file)| {
            let title = format!("snapshot {}", hash);
            let mut block = if color {
                title.yellow().to_string()
            } else {
                title
            };
            block.push_str(&format!("\nKind:    {}", describe_kind(&file.kind)));
            if file.parents.len() > 1 {
                let parents: Vec<String> = file.parents.iter().map(Hash::short).collect();
                block.push_str(&format!("\nMerge:   {}", parents.join(" ")));
            } else if let Some(parent) = file.parents.first() {
                block.push_str(&format!("\nParent:  {}", parent.short()));
            }
            block
        })
        .collect();
    blocks.join("\n\n")
}

fn describe_kind(kind: &FileKind) -> String {
    match kind {
        FileKind::Regular { mode, .. } => format!("regular ({:o})", mode),
        FileKind::Symlink { .. } => "symlink".to_string(),
        FileKind::Directory { children } => format!("directory ({} entries)", children.len()),
        FileKind::Conflict { .. } => "conflict".to_string(),
    }
}

pub fn format_log_json(entries: &[(Hash, File)]) -> Result<String, EngineError> {
    let arr: Vec<Value> = entries.iter().map(|(hash, file)| entry_json(hash, file)).collect();
    serde_json::to_string_pretty(&arr)
        .map_err(|e| EngineError::Config(format!("Failed to render JSON: {}", e)))
}

fn entry_json(hash: &Hash, file: &File) -> Value {
    let parents: Vec<String> = file.parents.iter().map(Hash::to_string).collect();
    let side = |h: &Option<Hash>| h.map(|h| h.to_string());
    let mut value = json!({
        "hash": hash.to_string(),
        "kind": file.kind.name(),
        "parents": parents,
    });
    let details = match &file.kind {
        FileKind::Regular { contents, mode } => json!({
            "contents": contents.to_string(),
            "mode": format!("{:o}", mode),
        }),
        FileKind::Symlink { target } => json!({ "target": target.to_string() }),
        FileKind::Directory { children } => {
            let children: serde_json::Map<String, Value> = children
                .iter()
                .map(|(name, hash)| (name.clone(), Value::String(hash.to_string())))
                .collect();
            json!({ "children": children })
        }
        FileKind::Conflict { base, ours, theirs } => json!({
            "base": side(base),
            "ours": side(ours),
            "theirs": side(theirs),
        }),
    };
    if let (Some(target), Value::Object(extra)) = (value.as_object_mut(), details) {
        target.extend(extra);
    }
    value
}

/// Merged hash on the first line, then one `CONFLICT` line per conflicted path.
pub fn format_merge_result(outcome: &MergeOutcome) -> String {
    let mut lines = vec![outcome.hash.to_string()];
    lines.extend(
        outcome
            .conflicts
            .iter()
            .map(|path| format!("CONFLICT {}", display_relative(path))),
    );
    lines.join("\n")
}

fn display_relative(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}
