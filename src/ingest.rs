//! Batch processing: documents → Extraction Call → glossary + checkpoints.
//!
//! Coordinates the full run: repository acquisition → document listing →
//! per-document extraction → merge and persist. Resumability comes from the
//! checkpoint set; every document whose terms have been durably merged is
//! recorded there and never extracted again for the same repository.
//!
//! For each listed document, in order:
//! 1. already checkpointed → skip;
//! 2. under an ignore prefix → skip, never checkpointed;
//! 3. the glossary-definition file itself → skip;
//! 4. otherwise extract. A failure leaves the document un-checkpointed so
//!    the next run retries it. Success goes through [`Ledger::commit`], which
//!    saves the glossary before it appends the checkpoint.
//!
//! With `workers > 1`, extraction runs on a bounded pool of tokio tasks.
//! Workers never touch the stores: they send their outcome over a channel to
//! the coordinating task, which is the only writer and which publishes a fresh
//! glossary snapshot after each commit.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::{Config, MAX_WORKERS};
use crate::docs::{list_documents, read_document};
use crate::extract::{create_extractor, ExtractError, Extractor};
use crate::glossary::GlossaryStore;
use crate::models::{DocId, Term};
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::prompt::{PromptTemplate, PromptVars};
use crate::repo::{check_repository, prepare_repository, RepoState, ScratchClone};

/// Options for a single `gloss run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Overrides `run.workers` from the config.
    pub workers: Option<usize>,
    /// List what would be extracted without calling the LLM.
    pub dry_run: bool,
    /// Maximum number of Extraction Calls in this run.
    pub limit: Option<usize>,
    pub progress: ProgressMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: None,
            dry_run: false,
            limit: None,
            progress: ProgressMode::Off,
        }
    }
}

/// How a listed document is treated by the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Done,
    Ignored,
    GlossaryDefinition,
    Pending,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Done => "done",
            Disposition::Ignored => "ignored",
            Disposition::GlossaryDefinition => "self",
            Disposition::Pending => "pending",
        }
    }
}

/// Decide what to do with `doc`. The order of the checks matters only for
/// reporting; none of the skipped cases is ever extracted.
pub fn classify(config: &Config, checkpoints: &CheckpointStore, doc: &str) -> Disposition {
    if checkpoints.contains(doc) {
        Disposition::Done
    } else if config.is_ignored(doc) {
        Disposition::Ignored
    } else if doc == config.glossary {
        Disposition::GlossaryDefinition
    } else {
        Disposition::Pending
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub found: u64,
    pub already_done: u64,
    pub ignored: u64,
    pub self_skipped: u64,
    pub extracted: u64,
    pub failed: u64,
    /// Pending documents left for a later run because of `--limit`.
    pub deferred: u64,
    pub terms_upserted: u64,
    pub glossary_terms: u64,
    pub checkpoints: u64,
    /// What a dry run found the working copy would need. Unset for real runs.
    pub repo_state: Option<RepoState>,
}

impl RunSummary {
    pub fn print(&self, dry_run: bool) {
        if dry_run {
            println!("run (dry-run)");
        } else {
            println!("run");
        }
        match self.repo_state {
            Some(RepoState::Cloned) => println!("  working copy: would clone"),
            Some(RepoState::Recloned) => {
                println!("  working copy: would reclone and reset state")
            }
            Some(RepoState::Ready) | None => {}
        }
        println!("  documents found: {}", self.found);
        println!("  already done: {}", self.already_done);
        println!("  ignored: {}", self.ignored);
        println!("  glossary definition skipped: {}", self.self_skipped);
        if dry_run {
            println!("  would extract: {}", self.extracted + self.deferred);
        } else {
            println!("  extracted: {}", self.extracted);
            println!("  failed: {}", self.failed);
            println!("  deferred: {}", self.deferred);
            println!("  terms upserted: {}", self.terms_upserted);
        }
        println!("  glossary terms: {}", self.glossary_terms);
        println!("  checkpoints: {}", self.checkpoints);
        println!("ok");
    }
}

/// Both persisted stores, owned by exactly one writer.
#[derive(Debug)]
pub struct Ledger {
    checkpoints: CheckpointStore,
    glossary: GlossaryStore,
}

impl Ledger {
    pub fn new(checkpoints: CheckpointStore, glossary: GlossaryStore) -> Self {
        Self {
            checkpoints,
            glossary,
        }
    }

    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(
            CheckpointStore::load(&config.paths.checkpoints)?,
            GlossaryStore::load(&config.paths.output)?,
        ))
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn glossary(&self) -> &GlossaryStore {
        &self.glossary
    }

    /// Merge `terms` and mark `doc` done. The glossary is persisted before
    /// the checkpoint, so a checkpointed document always has its terms on
    /// disk. Returns the number of terms upserted.
    pub fn commit(&mut self, doc: &str, terms: Vec<Term>) -> Result<usize> {
        let count = terms.len();
        for term in terms {
            debug!(
                doc,
                id = %term.id,
                title = %term.title,
                summary = %term.summary,
                "term"
            );
            self.glossary.upsert(term);
        }
        self.glossary
            .save()
            .with_context(|| format!("Failed to save glossary after {}", doc))?;

        self.checkpoints.append(doc.to_string());
        self.checkpoints
            .save()
            .with_context(|| format!("Failed to save checkpoints after {}", doc))?;
        Ok(count)
    }
}

/// Read-only inputs shared by every extraction in a run.
pub struct Workload {
    /// Root of the working copy.
    pub root: PathBuf,
    pub template: PromptTemplate,
    /// Text of the glossary-definition file.
    pub glossary_text: String,
    pub guidelines: String,
    pub extractor: Arc<dyn Extractor>,
    /// Upper bound on a single Extraction Call.
    pub timeout: Duration,
}

type Extraction = Result<Vec<Term>, ExtractError>;

/// Run the whole pipeline with the configured LLM provider.
pub async fn run_ingest(config: &Config, opts: &RunOptions) -> Result<RunSummary> {
    let extractor = if opts.dry_run {
        None
    } else {
        Some(create_extractor(&config.llm)?)
    };
    run_ingest_with_extractor(config, opts, extractor).await
}

/// Run the whole pipeline with a caller-supplied extractor.
///
/// `extractor` may be `None` only for dry runs.
pub async fn run_ingest_with_extractor(
    config: &Config,
    opts: &RunOptions,
    extractor: Option<Arc<dyn Extractor>>,
) -> Result<RunSummary> {
    let progress = opts.progress.reporter();

    if opts.dry_run {
        return dry_run(config, progress.as_ref());
    }
    let Some(extractor) = extractor else {
        bail!("no extractor configured");
    };

    let state = prepare_repository(config)?;
    debug!(?state, "working copy prepared");

    let root = config.paths.workdir.clone();
    let (glossary_text, template) = load_run_inputs(config, &root)?;

    progress.report(ProgressEvent::Discovering);
    let docs = list_documents(&root, &config.run.include_globs)?;
    info!(count = docs.len(), "documents listed");

    let mut ledger = Ledger::open(config)?;

    let workload = Workload {
        root,
        template,
        glossary_text,
        guidelines: config.guidelines.clone(),
        extractor,
        timeout: Duration::from_secs(config.llm.timeout_secs),
    };

    let workers = opts.workers.unwrap_or(config.run.workers).max(1);
    process_documents(
        config,
        &docs,
        &mut ledger,
        workload,
        workers,
        opts.limit,
        progress.as_ref(),
    )
    .await
}

/// Read the glossary definition under `root` and load the prompt template.
/// Both are fatal when missing.
fn load_run_inputs(config: &Config, root: &Path) -> Result<(String, PromptTemplate)> {
    let glossary_path = root.join(&config.glossary);
    if !glossary_path.is_file() {
        bail!("glossary definition not found: {}", glossary_path.display());
    }
    let glossary_text = std::fs::read_to_string(&glossary_path).with_context(|| {
        format!(
            "Failed to read glossary definition: {}",
            glossary_path.display()
        )
    })?;
    let template = PromptTemplate::load(&config.paths.prompt)?;
    Ok((glossary_text, template))
}

/// Plan a run without changing the working copy or either store.
///
/// A working copy that a real run would keep is listed in place. Otherwise
/// the repository is cloned to a scratch directory and planned against empty
/// stores, since a real run would reset them.
fn dry_run(config: &Config, progress: &dyn ProgressReporter) -> Result<RunSummary> {
    let state = check_repository(config);
    if state == RepoState::Recloned {
        warn!(
            path = %config.paths.workdir.display(),
            "working copy tracks another source; a real run would reclone and reset state"
        );
    }

    let scratch = match state {
        RepoState::Ready => None,
        RepoState::Cloned | RepoState::Recloned => Some(ScratchClone::create(config)?),
    };
    let root = match &scratch {
        Some(s) => s.path().to_path_buf(),
        None => config.paths.workdir.clone(),
    };
    load_run_inputs(config, &root)?;

    progress.report(ProgressEvent::Discovering);
    let docs = list_documents(&root, &config.run.include_globs)?;
    info!(count = docs.len(), "documents listed");

    let ledger = match state {
        RepoState::Ready => Ledger::open(config)?,
        RepoState::Cloned | RepoState::Recloned => Ledger::new(
            CheckpointStore::empty(&config.paths.checkpoints),
            GlossaryStore::empty(&config.paths.output),
        ),
    };

    let (mut summary, pending) = plan(config, &ledger, &docs);
    summary.repo_state = Some(state);
    summary.deferred = pending.len() as u64;
    summary.glossary_terms = ledger.glossary().len() as u64;
    summary.checkpoints = ledger.checkpoints().len() as u64;
    Ok(summary)
}

/// Split `docs` into skipped counts and the pending list, in listing order.
fn plan(config: &Config, ledger: &Ledger, docs: &[DocId]) -> (RunSummary, Vec<DocId>) {
    let mut summary = RunSummary {
        found: docs.len() as u64,
        ..RunSummary::default()
    };
    let mut pending = Vec::new();

    for doc in docs {
        match classify(config, ledger.checkpoints(), doc) {
            Disposition::Done => summary.already_done += 1,
            Disposition::Ignored => {
                info!(doc = %doc, "ignoring");
                summary.ignored += 1;
            }
            Disposition::GlossaryDefinition => summary.self_skipped += 1,
            Disposition::Pending => pending.push(doc.clone()),
        }
    }

    (summary, pending)
}

/// Process `docs` against `ledger`. This is the batch processor proper;
/// [`run_ingest_with_extractor`] only prepares its inputs.
pub async fn process_documents(
    config: &Config,
    docs: &[DocId],
    ledger: &mut Ledger,
    workload: Workload,
    workers: usize,
    limit: Option<usize>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let workers = workers.clamp(1, MAX_WORKERS);
    let (mut summary, mut pending) = plan(config, ledger, docs);

    if let Some(lim) = limit {
        if pending.len() > lim {
            summary.deferred = (pending.len() - lim) as u64;
            pending.truncate(lim);
        }
    }

    info!(
        pending = pending.len(),
        workers,
        extractor = workload.extractor.name(),
        "starting extraction"
    );

    if workers <= 1 {
        run_sequential(&workload, pending, ledger, &mut summary, progress).await?;
    } else {
        run_pooled(
            Arc::new(workload),
            pending,
            workers,
            ledger,
            &mut summary,
            progress,
        )
        .await?;
    }

    summary.glossary_terms = ledger.glossary().len() as u64;
    summary.checkpoints = ledger.checkpoints().len() as u64;
    Ok(summary)
}

async fn run_sequential(
    workload: &Workload,
    pending: Vec<DocId>,
    ledger: &mut Ledger,
    summary: &mut RunSummary,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let total = pending.len() as u64;
    for (i, doc) in pending.into_iter().enumerate() {
        let terms = ledger.glossary().to_context_json();
        let outcome = extract_document(workload, &doc, &terms).await?;
        let ok = record(ledger, summary, &doc, outcome)?;
        progress.report(ProgressEvent::Extracting {
            n: i as u64 + 1,
            total,
            doc,
            ok,
        });
    }
    Ok(())
}

async fn run_pooled(
    workload: Arc<Workload>,
    pending: Vec<DocId>,
    workers: usize,
    ledger: &mut Ledger,
    summary: &mut RunSummary,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let total = pending.len() as u64;
    let (tx, mut rx) = mpsc::channel::<(DocId, Result<Extraction>)>(workers);
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(ledger.glossary().to_context_json()));
    let permits = Arc::new(Semaphore::new(workers));

    // Workers live in the dispatcher's JoinSet, so aborting the dispatcher
    // aborts every in-flight call with it.
    let dispatcher = tokio::spawn(async move {
        let mut in_flight = JoinSet::new();
        for doc in pending {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            while in_flight.try_join_next().is_some() {}
            let terms = snapshot_rx.borrow().clone();
            let workload = workload.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                let outcome = extract_document(&workload, &doc, &terms).await;
                let _ = tx.send((doc, outcome)).await;
                drop(permit);
            });
        }
        drop(tx);
        while in_flight.join_next().await.is_some() {}
    });

    let drained = async {
        let mut n = 0u64;
        while let Some((doc, outcome)) = rx.recv().await {
            let ok = record(ledger, summary, &doc, outcome?)?;
            if ok {
                let _ = snapshot_tx.send(Arc::new(ledger.glossary().to_context_json()));
            }
            n += 1;
            progress.report(ProgressEvent::Extracting { n, total, doc, ok });
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Err(e) = drained {
        dispatcher.abort();
        let _ = dispatcher.await;
        return Err(e);
    }
    dispatcher.await.context("dispatcher task failed")?;
    Ok(())
}

/// Read, render and extract one document. The outer `Result` carries fatal
/// errors (a template that cannot render); the inner one a per-document
/// failure that leaves the document for the next run.
async fn extract_document(workload: &Workload, doc: &str, terms: &str) -> Result<Extraction> {
    let src = match read_document(&workload.root, doc) {
        Ok(s) => s,
        Err(e) => return Ok(Err(ExtractError::Unreadable(e))),
    };

    let prompt = workload.template.render(&PromptVars {
        doc,
        src: &src,
        glossary: &workload.glossary_text,
        terms,
        guidelines: &workload.guidelines,
    })?;

    info!(doc, "extracting");
    debug!(doc, prompt_bytes = prompt.len(), "prompt rendered");

    match tokio::time::timeout(workload.timeout, workload.extractor.extract(&prompt)).await {
        Ok(result) => Ok(result),
        Err(_) => Ok(Err(ExtractError::Timeout(workload.timeout))),
    }
}

/// Commit or count one outcome. Returns whether the document was committed.
fn record(
    ledger: &mut Ledger,
    summary: &mut RunSummary,
    doc: &str,
    outcome: Extraction,
) -> Result<bool> {
    match outcome {
        Ok(terms) => {
            let n = ledger.commit(doc, terms)?;
            info!(doc, terms = n, "merged");
            summary.extracted += 1;
            summary.terms_upserted += n as u64;
            Ok(true)
        }
        Err(e) => {
            warn!(doc, error = %e, "extraction failed, will retry next run");
            summary.failed += 1;
            Ok(false)
        }
    }
}
