//! Canonical text encoding of snapshot nodes.
//!
//! ```text
//! regular 644 blake3:<hex>        | symlink blake3:<hex> | directory | conflict
//! parent blake3:<hex>             (zero or more, history order)
//! child blake3:<hex> <name>       (directories, sorted by name)
//! base|ours|theirs blake3:<hex>   (conflicts, in this order, each optional)
//! ```
//!
//! Every line ends with `\n`. The encoded bytes are hashed to form the node's
//! identity, so a given [`File`] has exactly one accepted encoding and the
//! format must stay readable across versions.

use super::{File, FileKind};
use crate::error::FormatError;
use crate::types::Hash;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::iter::Peekable;

const MAX_MODE: u32 = 0o7777;

pub fn serialize(file: &File) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    match &file.kind {
        FileKind::Regular { contents, mode } => {
            let _ = writeln!(out, "regular {:o} {}", mode, contents);
        }
        FileKind::Symlink { target } => {
            let _ = writeln!(out, "symlink {}", target);
        }
        FileKind::Directory { .. } => out.push_str("directory\n"),
        FileKind::Conflict { .. } => out.push_str("conflict\n"),
    }
    for parent in &file.parents {
        let _ = writeln!(out, "parent {}", parent);
    }
    match &file.kind {
        FileKind::Directory { children } => {
            for (name, hash) in children {
                let _ = writeln!(out, "child {} {}", hash, escape_name(name));
            }
        }
        FileKind::Conflict { base, ours, theirs } => {
            for (tag, side) in [("base", base), ("ours", ours), ("theirs", theirs)] {
                if let Some(hash) = side {
                    let _ = writeln!(out, "{} {}", tag, hash);
                }
            }
        }
        _ => {}
    }
    out
}

pub fn parse(text: &str) -> Result<File, FormatError> {
    if text.is_empty() {
        return Err(FormatError::Empty);
    }
    let body = text.strip_suffix('\n').ok_or_else(|| FormatError::UnexpectedLine {
        line: text.split('\n').count(),
        text: text.rsplit('\n').next().unwrap_or_default().to_string(),
    })?;
    let mut lines = body.split('\n').enumerate().map(|(i, l)| (i + 1, l)).peekable();

    let (_, header) = lines.next().ok_or(FormatError::Empty)?;
    let mut header_fields = header.split(' ');
    let tag = header_fields.next().unwrap_or_default();
    let header_args: Vec<&str> = header_fields.collect();
    let field_count = |expected: usize| {
        if header_args.len() == expected {
            Ok(())
        } else {
            Err(FormatError::FieldCount {
                line: 1,
                text: header.to_string(),
            })
        }
    };

    let mut kind = match tag {
        "regular" => {
            field_count(2)?;
            FileKind::Regular {
                mode: parse_mode(header_args[0])?,
                contents: header_args[1].parse()?,
            }
        }
        "symlink" => {
            field_count(1)?;
            FileKind::Symlink {
                target: header_args[0].parse()?,
            }
        }
        "directory" => {
            field_count(0)?;
            FileKind::Directory {
                children: BTreeMap::new(),
            }
        }
        "conflict" => {
            field_count(0)?;
            FileKind::Conflict {
                base: None,
                ours: None,
                theirs: None,
            }
        }
        other => return Err(FormatError::UnknownKind(other.to_string())),
    };

    let mut parents = Vec::new();
    while let Some(hash) = take_tagged(&mut lines, "parent")? {
        parents.push(hash);
    }

    match &mut kind {
        FileKind::Directory { children } => {
            let mut previous: Option<String> = None;
            while let Some(&(line, text)) = lines.peek() {
                let Some(rest) = text.strip_prefix("child ") else {
                    break;
                };
                lines.next();
                let (hash, escaped) = rest.split_once(' ').ok_or_else(|| {
                    FormatError::FieldCount {
                        line,
                        text: text.to_string(),
                    }
                })?;
                let name = unescape_name(escaped)?;
                if previous.as_ref().is_some_and(|p| *p >= name) {
                    return Err(FormatError::UnexpectedLine {
                        line,
                        text: text.to_string(),
                    });
                }
                children.insert(name.clone(), hash.parse()?);
                previous = Some(name);
            }
        }
        FileKind::Conflict { base, ours, theirs } => {
            *base = take_tagged(&mut lines, "base")?;
            *ours = take_tagged(&mut lines, "ours")?;
            *theirs = take_tagged(&mut lines, "theirs")?;
            if ours.is_none() && theirs.is_none() {
                return Err(FormatError::FieldCount {
                    line: 1,
                    text: header.to_string(),
                });
            }
        }
        _ => {}
    }

    if let Some((line, text)) = lines.next() {
        return Err(FormatError::UnexpectedLine {
            line,
            text: text.to_string(),
        });
    }
    Ok(File { kind, parents })
}

/// Consume the next line if it carries `tag`, returning its hash.
fn take_tagged<'a, I>(lines: &mut Peekable<I>, tag: &str) -> Result<Option<Hash>, FormatError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let Some(&(line, text)) = lines.peek() else {
        return Ok(None);
    };
    let Some(rest) = text.strip_prefix(tag).and_then(|r| r.strip_prefix(' ')) else {
        return Ok(None);
    };
    lines.next();
    if rest.contains(' ') {
        return Err(FormatError::FieldCount {
            line,
            text: text.to_string(),
        });
    }
    Ok(Some(rest.parse()?))
}

fn parse_mode(text: &str) -> Result<u32, FormatError> {
    let invalid = || FormatError::InvalidMode(text.to_string());
    let mode = u32::from_str_radix(text, 8).map_err(|_| invalid())?;
    if mode > MAX_MODE || format!("{:o}", mode) != text {
        return Err(invalid());
    }
    Ok(mode)
}

/// Escape a directory entry name so it fits on one line.
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape_name(escaped: &str) -> Result<String, FormatError> {
    let invalid = || FormatError::InvalidName(escaped.to_string());
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                _ => return Err(invalid()),
            },
            '\n' => return Err(invalid()),
            c => out.push(c),
        }
    }
    if !is_valid_name(&out) {
        return Err(invalid());
    }
    Ok(out)
}

/// A single path component: non-empty, no separators, not `.` or `..`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}
