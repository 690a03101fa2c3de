#![allow(dead_code)]

use async_trait::async_trait;
use glossary_harness::config::{load_config, Config};
use glossary_harness::extract::{ExtractError, Extractor};
use glossary_harness::models::Term;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

/// Template whose first line names the document, so the scripted extractor
/// can tell which document a prompt belongs to.
pub const TEMPLATE: &str = "DOC:{{ doc }}\n--- source\n{{ src }}\n--- glossary\n{{ glossary }}\n--- terms\n{{ terms }}\n--- guidelines\n{{ guidelines }}\n";

pub enum Reply {
    Terms(Vec<Term>),
    Fail,
    Hang,
}

/// In-memory extractor with per-document replies. Documents without a
/// scripted reply yield one term whose id is derived from the path.
#[derive(Default)]
pub struct ScriptedExtractor {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn reply(&self, doc: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(doc.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompt_for(&self, doc: &str) -> Option<String> {
        let header = format!("DOC:{}\n", doc);
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.starts_with(&header))
            .cloned()
    }
}

pub fn term(id: &str, title: &str) -> Term {
    Term {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("{} in one line.", title),
        details: None,
        references: vec![],
    }
}

pub fn default_term_for(doc: &str) -> Term {
    let id = doc.replace(['/', '.'], "-");
    term(&id, doc)
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, prompt: &str) -> Result<Vec<Term>, ExtractError> {
        let doc = prompt
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("DOC:"))
            .unwrap_or_default()
            .to_string();
        self.calls.lock().unwrap().push(doc.clone());
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = match self.replies.lock().unwrap().get(&doc) {
            Some(Reply::Terms(terms)) => Reply::Terms(terms.clone()),
            Some(Reply::Fail) => Reply::Fail,
            Some(Reply::Hang) => Reply::Hang,
            None => Reply::Terms(vec![default_term_for(&doc)]),
        };

        match reply {
            Reply::Terms(terms) => Ok(terms),
            Reply::Fail => Err(ExtractError::InvalidResponse("scripted failure".into())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

/// A scratch project directory: config, template and an (uncloned) working
/// copy populated directly on disk.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    pub fn new(extra_config: &str) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let project = Self { dir };
        project.write_config("file:///unused", extra_config);
        fs::write(project.root().join("prompt.tera"), TEMPLATE).unwrap();
        project.add_doc("docs/glossary.rst", "Glossary style: one line per term.");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn workdir(&self) -> PathBuf {
        self.root().join("repo")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("gloss.toml")
    }

    pub fn write_config(&self, repo: &str, extra: &str) {
        let body = format!(
            "repo = \"{}\"\nglossary = \"docs/glossary.rst\"\nguidelines = \"Keep it short.\"\n{}\n",
            repo, extra
        );
        fs::write(self.config_path(), body).unwrap();
    }

    pub fn config(&self) -> Config {
        load_config(&self.config_path()).unwrap()
    }

    pub fn add_doc(&self, rel: &str, body: &str) {
        let path = self.workdir().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    pub fn checkpoints(&self) -> Vec<String> {
        let path = self.root().join("checkpoints.json");
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap(),
            Err(_) => vec![],
        }
    }

    pub fn glossary_json(&self) -> serde_json::Value {
        let path = self.root().join("glossary.json");
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap(),
            Err(_) => serde_json::json!({}),
        }
    }

    pub fn glossary_bytes(&self) -> Vec<u8> {
        fs::read(self.root().join("glossary.json")).unwrap_or_default()
    }
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
}

/// Create a committed git repository containing `files` and return its
/// `file://` URL.
pub fn make_origin(dir: &Path, files: &[(&str, &str)]) -> String {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    for (rel, body) in files {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    git(dir, &["add", "-A"]);
    git(
        dir,
        &[
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "-m",
            "docs",
        ],
    );
    format!("file://{}", dir.display())
}
