//! Result presentation: turns a report into what the result card shows.
//!
//! Pure: no I/O, no shared state. Every section is always present; an empty
//! one carries a muted placeholder instead of disappearing.

use std::fmt;

use serde::Serialize;

use crate::models::analysis::AnalysisReport;

pub const EMPTY_JOB_DESCRIPTION: &str = "—";
pub const NO_PRESENT_KEYWORDS: &str = "No matches found.";
pub const NO_MISSING_KEYWORDS: &str = "No missing keywords returned by backend.";
pub const NO_RECOMMENDATIONS: &str = "No recommendations received.";

/// Body of one result panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SectionBody {
    Items(Vec<String>),
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: &'static str,
    pub body: SectionBody,
}

impl Section {
    fn new(heading: &'static str, items: &[String], placeholder: &'static str) -> Self {
        let body = if items.is_empty() {
            SectionBody::Placeholder(placeholder)
        } else {
            SectionBody::Items(items.to_vec())
        };
        Self { heading, body }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, SectionBody::Placeholder(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    /// Rounded percentage, e.g. `"82%"`.
    pub match_score: String,
    pub job_description: String,
    pub present_keywords: Section,
    pub missing_keywords: Section,
    pub recommendations: Section,
}

pub fn render(report: &AnalysisReport, submitted_job_description: &str) -> ViewModel {
    let job_description = match submitted_job_description.trim() {
        "" => EMPTY_JOB_DESCRIPTION.to_string(),
        jd => jd.to_string(),
    };

    ViewModel {
        match_score: format_score(report.match_score),
        job_description,
        present_keywords: Section::new(
            "Keywords found in resume",
            &report.present_keywords,
            NO_PRESENT_KEYWORDS,
        ),
        missing_keywords: Section::new(
            "Missing keywords",
            &report.missing_keywords,
            NO_MISSING_KEYWORDS,
        ),
        recommendations: Section::new(
            "Recommendations",
            &report.recommendations,
            NO_RECOMMENDATIONS,
        ),
    }
}

fn format_score(score: f64) -> String {
    let rounded = if score.is_finite() {
        score.round().clamp(0.0, 100.0) as u32
    } else {
        0
    };
    format!("{rounded}%")
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        match &self.body {
            SectionBody::Items(items) => {
                for item in items {
                    writeln!(f, "- {item}")?;
                }
                Ok(())
            }
            SectionBody::Placeholder(text) => writeln!(f, "{text}"),
        }
    }
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Match score: {}", self.match_score)?;
        writeln!(f)?;
        writeln!(f, "Job description")?;
        writeln!(f, "{}", self.job_description)?;
        writeln!(f)?;
        write!(f, "{}", self.present_keywords)?;
        writeln!(f)?;
        write!(f, "{}", self.missing_keywords)?;
        writeln!(f)?;
        write!(f, "{}", self.recommendations)
    }
}
