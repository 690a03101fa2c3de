//! Read-only reports: `gloss status` and `gloss list`.
//!
//! Neither command clones, resets, or writes anything.

use anyhow::{bail, Result};

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::docs::list_documents;
use crate::glossary::GlossaryStore;
use crate::ingest::{classify, Disposition};
use crate::repo::origin_url;

/// Print the working copy, its origin, and store sizes.
pub fn run_status(config: &Config) -> Result<()> {
    let workdir = &config.paths.workdir;
    let checkpoints = CheckpointStore::load(&config.paths.checkpoints)?;
    let glossary = GlossaryStore::load(&config.paths.output)?;

    let origin = if workdir.exists() {
        origin_url(workdir).unwrap_or_else(|| "unknown".to_string())
    } else {
        "not cloned".to_string()
    };
    let in_sync = origin == config.repo;

    println!("Glossary Harness Status");
    println!("=======================");
    println!();
    println!("  Repository:  {}", config.repo);
    println!("  Working copy: {}", workdir.display());
    println!("  Origin:      {}", origin);
    if !in_sync {
        println!("  (next run will clone and reset state)");
    }
    println!();
    println!(
        "  Checkpoints: {}  ({})",
        checkpoints.len(),
        checkpoints.path().display()
    );
    println!(
        "  Terms:       {}  ({})",
        glossary.len(),
        glossary.path().display()
    );

    Ok(())
}

/// Print every candidate document with its disposition.
pub fn run_list(config: &Config, pending_only: bool) -> Result<()> {
    let workdir = &config.paths.workdir;
    if !workdir.exists() {
        bail!(
            "No working copy at {}. Run `gloss run` first.",
            workdir.display()
        );
    }

    let checkpoints = CheckpointStore::load(&config.paths.checkpoints)?;
    let docs = list_documents(workdir, &config.run.include_globs)?;

    let mut pending = 0usize;
    for doc in &docs {
        let disposition = classify(config, &checkpoints, doc);
        if disposition == Disposition::Pending {
            pending += 1;
        } else if pending_only {
            continue;
        }
        println!("{:<8} {}", disposition.label(), doc);
    }

    println!();
    println!("{} documents, {} pending", docs.len(), pending);
    Ok(())
}
