//! Prompt template loading and rendering.
//!
//! The template is a Tera file. It is parsed and trial-rendered once per run,
//! so syntax errors and most render errors (unknown variables, filters on
//! the wrong type) abort before any document is processed. Variables
//! available to it:
//!
//! | Variable | Content |
//! |----------|---------|
//! | `doc` | document identifier (repository-relative path) |
//! | `src` | full document text |
//! | `glossary` | text of the glossary-definition file |
//! | `terms` | current glossary mapping as pretty JSON |
//! | `guidelines` | the configured style guidelines |

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "prompt";

/// Inputs for one rendering of the prompt.
#[derive(Debug, Serialize)]
pub struct PromptVars<'a> {
    pub doc: &'a str,
    pub src: &'a str,
    pub glossary: &'a str,
    pub terms: &'a str,
    pub guidelines: &'a str,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    tera: Tera,
}

impl PromptTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
        let template = Self::parse(&raw)
            .with_context(|| format!("Invalid prompt template: {}", path.display()))?;
        template
            .check()
            .with_context(|| format!("Invalid prompt template: {}", path.display()))?;
        Ok(template)
    }

    /// Render once with placeholder values.
    pub fn check(&self) -> Result<()> {
        self.render(&PromptVars {
            doc: "docs/example.md",
            src: "Example document.",
            glossary: "Example glossary.",
            terms: "{}",
            guidelines: "",
        })
        .map(|_| ())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, raw)?;
        Ok(Self { tera })
    }

    pub fn render(&self, vars: &PromptVars<'_>) -> Result<String> {
        let ctx = Context::from_serialize(vars)?;
        self.tera
            .render(TEMPLATE_NAME, &ctx)
            .with_context(|| format!("Failed to render prompt for {}", vars.doc))
    }
}
