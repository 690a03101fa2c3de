//! Persisted glossary: term identifier → [`TermRecord`].
//!
//! Upserts overwrite the whole record (last write wins). Keys are kept in a
//! `BTreeMap` so the file serialises identically for identical contents.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{Term, TermRecord};
use crate::store::{read_json_or_default, write_json_atomic};

#[derive(Debug)]
pub struct GlossaryStore {
    path: PathBuf,
    terms: BTreeMap<String, TermRecord>,
}

impl GlossaryStore {
    /// Load the glossary file. A missing file yields an empty glossary.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            terms: read_json_or_default(path)?,
        })
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            terms: BTreeMap::new(),
        }
    }

    /// Persist an empty glossary, discarding whatever was there.
    pub fn reset(path: &Path) -> Result<Self> {
        let store = Self::empty(path);
        store.save()?;
        Ok(store)
    }

    /// Insert or replace the record for `term.id`.
    pub fn upsert(&mut self, term: Term) {
        let (id, record) = term.into_parts();
        self.terms.insert(id, record);
    }

    pub fn get(&self, id: &str) -> Option<&TermRecord> {
        self.terms.get(id)
    }

    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.terms)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current mapping rendered as pretty JSON, for use as prompt context.
    pub fn to_context_json(&self) -> String {
        serde_json::to_string_pretty(&self.terms).unwrap_or_else(|_| "{}".to_string())
    }
}
