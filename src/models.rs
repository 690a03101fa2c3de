//! Core data models for glossary extraction.
//!
//! A [`Term`] is what the Extraction Call returns; it is split into its
//! identifier and a [`TermRecord`] when stored in the glossary.

use serde::{Deserialize, Serialize};

/// Repository-relative path of a document, `/`-separated.
pub type DocId = String;

/// A glossary entry as persisted in the glossary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub title: String,
    pub summary: String,
    pub details: Option<String>,
    pub references: Vec<String>,
}

/// A term as returned by the LLM, including its identifier.
///
/// `details` may be `null` or absent; every other field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub details: Option<String>,
    pub references: Vec<String>,
}

impl Term {
    pub fn into_parts(self) -> (String, TermRecord) {
        (
            self.id,
            TermRecord {
                title: self.title,
                summary: self.summary,
                details: self.details,
                references: self.references,
            },
        )
    }
}
