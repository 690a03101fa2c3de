//! # Glossary Harness
//!
//! Resumable LLM-driven glossary extraction over a documentation repository.
//!
//! Glossary Harness clones a documentation repository and sends each `.rst`
//! and `.md` file to an LLM with a fixed response schema. The returned terms
//! are merged into a JSON glossary. Every completed document is checkpointed,
//! so an interrupted run picks up where it stopped.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │    repo    │──▶│    docs    │──▶│    ingest    │──▶│ glossary.json    │
//! │ git clone  │   │ rst + md   │   │ LLM per doc  │   │ checkpoints.json │
//! └────────────┘   └────────────┘   └──────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gloss run                 # clone (if needed) and extract pending documents
//! gloss run --workers 4     # same, four extraction calls in flight
//! gloss run --dry-run       # show what would be extracted
//! gloss status              # working copy and store sizes
//! gloss list --pending      # documents still to do
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Term and document types |
//! | [`repo`] | Working-copy acquisition and reset |
//! | [`docs`] | Candidate document listing |
//! | [`checkpoint`] | Completed-document set |
//! | [`glossary`] | Term store |
//! | [`store`] | Atomic JSON persistence |
//! | [`prompt`] | Prompt template rendering |
//! | [`extract`] | LLM Extraction Call |
//! | [`ingest`] | Batch processor |
//! | [`progress`] | Progress reporting |
//! | [`status`] | Read-only reports |

pub mod checkpoint;
pub mod config;
pub mod docs;
pub mod extract;
pub mod glossary;
pub mod ingest;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod repo;
pub mod status;
pub mod store;
