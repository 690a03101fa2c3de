//! TOML configuration parsing.
//!
//! The configuration is loaded once at startup by [`load_config`] and the
//! resulting [`Config`] is passed by reference to every component.
//!
//! ```toml
//! repo = "https://github.com/example/project.git"
//! glossary = "docs/glossary.rst"
//! guidelines = "Prefer short, neutral definitions."
//! ignore = ["docs/archive/", "CHANGELOG.md"]
//!
//! [llm]
//! provider = "gemini"
//! model = "gemini-2.5-pro"
//!
//! [run]
//! workers = 4
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Source URL of the documentation repository.
    pub repo: String,
    /// Glossary-definition file, relative to the clone root.
    pub glossary: String,
    #[serde(default)]
    pub guidelines: String,
    /// Path prefixes (relative to the clone root) that are never processed.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    #[serde(default = "default_checkpoints")]
    pub checkpoints: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_prompt")]
    pub prompt: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            checkpoints: default_checkpoints(),
            output: default_output(),
            prompt: default_prompt(),
        }
    }
}

fn default_workdir() -> PathBuf {
    PathBuf::from("repo")
}
fn default_checkpoints() -> PathBuf {
    PathBuf::from("checkpoints.json")
}
fn default_output() -> PathBuf {
    PathBuf::from("glossary.json")
}
fn default_prompt() -> PathBuf {
    PathBuf::from("prompt.tera")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL override, mostly useful for proxies and tests.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}

impl LlmConfig {
    /// Name of the environment variable the API key is read from.
    pub fn key_env(&self) -> &str {
        match &self.api_key_env {
            Some(name) => name,
            None if self.provider == "openai" => "OPENAI_API_KEY",
            None => "GEMINI_API_KEY",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            include_globs: default_include_globs(),
        }
    }
}

/// Upper bound on `run.workers` and `--workers`.
pub const MAX_WORKERS: usize = 256;

fn default_workers() -> usize {
    1
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.rst".to_string(), "**/*.md".to_string()]
}

impl Config {
    /// Absolute location of the glossary-definition file inside the clone.
    pub fn glossary_path(&self) -> PathBuf {
        self.paths.workdir.join(&self.glossary)
    }

    /// Whether `doc` falls under one of the configured ignore prefixes.
    pub fn is_ignored(&self, doc: &str) -> bool {
        self.ignore.iter().any(|prefix| doc.starts_with(prefix.as_str()))
    }
}

/// Strip a leading `./` so repository-relative paths compare equal to the
/// identifiers produced by the document listing.
fn normalize_relative(path: &str) -> String {
    let mut p = path.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.repo.trim().is_empty() {
        bail!("repo must not be empty");
    }

    config.glossary = normalize_relative(&config.glossary)
        .trim_end_matches('/')
        .to_string();
    if config.glossary.is_empty() {
        bail!("glossary must name a file inside the repository");
    }

    config.ignore = config
        .ignore
        .iter()
        .map(|p| normalize_relative(p))
        .filter(|p| !p.is_empty())
        .collect();

    if config.run.workers == 0 || config.run.workers > MAX_WORKERS {
        bail!("run.workers must be between 1 and {}", MAX_WORKERS);
    }
    if config.run.include_globs.is_empty() {
        bail!("run.include_globs must list at least one pattern");
    }
    if config.llm.timeout_secs == 0 {
        bail!("llm.timeout_secs must be > 0");
    }

    match config.llm.provider.as_str() {
        "gemini" | "openai" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be gemini or openai.",
            other
        ),
    }

    // Relative paths are anchored at the config file's directory.
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.paths.workdir = anchor(base, &config.paths.workdir);
    config.paths.checkpoints = anchor(base, &config.paths.checkpoints);
    config.paths.output = anchor(base, &config.paths.output);
    config.paths.prompt = anchor(base, &config.paths.prompt);

    Ok(config)
}

fn anchor(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
