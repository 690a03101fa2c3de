//! Persisted set of documents whose terms are already in the glossary.
//!
//! The file is a JSON array of document identifiers in the order they were
//! completed. Membership is checked through an in-memory index.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::DocId;
use crate::store::{read_json_or_default, write_json_atomic};

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    order: Vec<DocId>,
    index: HashSet<DocId>,
}

impl CheckpointStore {
    /// Load the checkpoint file. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        let order: Vec<DocId> = read_json_or_default(path)?;
        let mut store = Self {
            path: path.to_path_buf(),
            order: Vec::with_capacity(order.len()),
            index: HashSet::with_capacity(order.len()),
        };
        for doc in order {
            store.append(doc);
        }
        Ok(store)
    }

    /// An empty set bound to `path`, without reading or writing it.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            order: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Persist an empty checkpoint set, discarding whatever was there.
    pub fn reset(path: &Path) -> Result<Self> {
        let store = Self::empty(path);
        store.save()?;
        Ok(store)
    }

    pub fn contains(&self, doc: &str) -> bool {
        self.index.contains(doc)
    }

    /// Record `doc` as done. Returns `false` if it was already present.
    pub fn append(&mut self, doc: DocId) -> bool {
        if !self.index.insert(doc.clone()) {
            return false;
        }
        self.order.push(doc);
        true
    }

    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocId> {
        self.order.iter()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
