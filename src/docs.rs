//! Document Source: candidate documentation files in the working copy.
//!
//! Each include pattern is listed separately (sorted), and the listings are
//! concatenated in pattern order. With the default patterns every `.rst`
//! file therefore comes before every `.md` file.
//!
//! Hidden files and anything under a hidden directory (`.git/`, `.github/`,
//! `.changeset/`, ...) are never listed.

use anyhow::{bail, Result};
use globset::Glob;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::models::DocId;

pub fn list_documents(root: &Path, include_globs: &[String]) -> Result<Vec<DocId>> {
    if !root.exists() {
        bail!("Working copy does not exist: {}", root.display());
    }

    let all = relative_files(root)?;

    let mut seen = HashSet::new();
    let mut docs = Vec::new();
    for pattern in include_globs {
        let matcher = Glob::new(pattern)?.compile_matcher();
        let mut listing: Vec<&DocId> = all.iter().filter(|rel| matcher.is_match(rel)).collect();
        listing.sort();
        for rel in listing {
            if seen.insert(rel.clone()) {
                docs.push(rel.clone());
            }
        }
    }

    Ok(docs)
}

/// Read a document's full text from the working copy.
pub fn read_document(root: &Path, doc: &str) -> std::io::Result<String> {
    std::fs::read_to_string(root.join(doc))
}

fn relative_files(root: &Path) -> Result<Vec<DocId>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(rel_str);
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
