use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Document types accepted by the résumé upload control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
}

impl DocumentKind {
    /// Resolves the kind from the file extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "doc" => Some(DocumentKind::Doc),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Doc => "application/msword",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// A résumé file attached to the submission form.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_file_name(&self.file_name)
    }
}

/// The submission form: a job description plus an optional attached file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionInput {
    pub job_description: String,
    pub file: Option<ResumeFile>,
}

impl SubmissionInput {
    pub fn new(job_description: impl Into<String>, file: Option<ResumeFile>) -> Self {
        Self {
            job_description: job_description.into(),
            file,
        }
    }

    /// Resets the form after a successful submission.
    pub fn clear(&mut self) {
        self.job_description.clear();
        self.file = None;
    }

    pub fn is_empty(&self) -> bool {
        self.job_description.is_empty() && self.file.is_none()
    }
}

/// Normalized match report. Always fully shaped, whatever the gateway sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub match_score: f64, // 0 – 100
    pub present_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Result of the last successful submission, held until saved or replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAnalysis {
    pub resume_text: Option<String>,
    pub job_description_text: Option<String>,
    pub feedback: Option<AnalysisReport>,
    pub resume_name: Option<String>,
}

/// A `PendingAnalysis` with every field present, ready to be persisted.
#[derive(Debug, Clone, Copy)]
pub struct CompleteAnalysis<'a> {
    pub resume_text: &'a str,
    pub job_description_text: &'a str,
    pub feedback: &'a AnalysisReport,
    pub resume_name: &'a str,
}

impl PendingAnalysis {
    /// Returns the analysis only when nothing required for a save is missing.
    pub fn complete(&self) -> Option<CompleteAnalysis<'_>> {
        Some(CompleteAnalysis {
            resume_text: self.resume_text.as_deref()?,
            job_description_text: self.job_description_text.as_deref()?,
            feedback: self.feedback.as_ref()?,
            resume_name: self.resume_name.as_deref()?,
        })
    }
}
