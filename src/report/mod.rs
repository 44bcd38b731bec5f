//! Report assembly and rendering.
//!
//! The [`Builder`] collects one section per sanitizer plus run-level errors
//! and serializes them into the document external tools consume:
//!
//! ```text
//! popeye:
//!   score, grade
//!   sanitizers: [{ sanitizer, tally, issues: { fqn: [{ group, level, message }] } }]
//!   errors: [{ message }]
//! ```

pub mod console;

pub use console::Console;

use crate::error::RenderError;
use crate::issues::{Level, Outcome, Tally, grade};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Output Format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored console report (default)
    #[default]
    Console,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "standard" => Some(Self::Console),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Findings of one sanitizer as they appear in the report.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub outcome: Outcome,
    pub tally: Tally,
}

/// A run-level failure, kept as its rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub message: String,
}

/// Accumulates report sections and errors for one run.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    sections: Vec<Section>,
    errors: Vec<ErrorEntry>,
    min_level: Level,
    cancelled: bool,
}

#[derive(Serialize)]
struct Document<'a> {
    popeye: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    score: u8,
    grade: &'static str,
    sanitizers: Vec<SectionDoc<'a>>,
    errors: &'a [ErrorEntry],
}

#[derive(Serialize)]
struct SectionDoc<'a> {
    sanitizer: &'a str,
    tally: &'a Tally,
    issues: Outcome,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide resources whose worst issue is below `level`. Tallies are not
    /// affected.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn add_section(&mut self, name: impl Into<String>, outcome: Outcome, tally: Tally) {
        self.sections.push(Section {
            name: name.into(),
            outcome,
            tally,
        });
    }

    pub fn add_error(&mut self, err: impl fmt::Display) {
        self.errors.push(ErrorEntry {
            message: err.to_string(),
        });
    }

    /// Tag the report as the partial result of a cancelled run.
    pub fn mark_cancelled(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.add_error(crate::error::Error::Cancelled);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Rounded mean of the section scores, 0 without sections.
    pub fn score(&self) -> u8 {
        if self.sections.is_empty() {
            return 0;
        }
        let n = self.sections.len() as u64;
        let sum: u64 = self.sections.iter().map(|s| u64::from(s.tally.score)).sum();
        ((sum + n / 2) / n) as u8
    }

    pub fn grade(&self) -> &'static str {
        grade(self.score())
    }

    fn document(&self) -> Document<'_> {
        Document {
            popeye: Body {
                score: self.score(),
                grade: self.grade(),
                sanitizers: self
                    .sections
                    .iter()
                    .map(|s| SectionDoc {
                        sanitizer: &s.name,
                        tally: &s.tally,
                        issues: s.outcome.filter(self.min_level),
                    })
                    .collect(),
                errors: &self.errors,
            },
        }
    }

    /// Compact JSON rendering of the report document.
    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(&self.document())?)
    }

    pub fn to_yaml(&self) -> Result<String, RenderError> {
        Ok(serde_yaml::to_string(&self.document())?)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, RenderError> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Yaml => self.to_yaml(),
            OutputFormat::Console => {
                let mut console = Console::new(Vec::new(), false);
                console.print_header()?;
                console.print_report(self, self.min_level)?;
                console.print_errors(self)?;
                console.print_summary(self)?;
                Ok(String::from_utf8_lossy(&console.into_inner()).into_owned())
            }
        }
    }
}
