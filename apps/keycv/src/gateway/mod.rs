//! Analysis gateway: the only way the client reaches the remote résumé analysis service.
//!
//! The service scores a résumé file against a job description. Transport and
//! status handling live here; payload shaping lives in `normalize`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::analysis::ResumeFile;

pub mod normalize;

pub use normalize::GatewayReply;
use normalize::{normalize_reply, rejection_message};

pub const ANALYZE_PATH: &str = "/api/ai/analyze-resume";
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("gateway rejected the submission (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

/// Remote analysis service seam. The controller only ever talks to this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(
        &self,
        job_description: &str,
        file: &ResumeFile,
    ) -> Result<GatewayReply, GatewayError>;
}

/// reqwest-backed gateway posting a multipart form to `<base>/api/ai/analyze-resume`.
#[derive(Clone)]
pub struct HttpAnalysisGateway {
    client: Client,
    endpoint: String,
}

impl HttpAnalysisGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{ANALYZE_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn analyze(
        &self,
        job_description: &str,
        file: &ResumeFile,
    ) -> Result<GatewayReply, GatewayError> {
        let mime = file.kind().map(|k| k.mime_type()).unwrap_or(FALLBACK_MIME);
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(mime)?;
        let form = Form::new()
            .text("job_description", job_description.to_string())
            .part("cv_file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = rejection_message(status.as_u16(), &body);
            warn!("Analysis gateway returned {}: {}", status, message);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Analysis gateway succeeded ({} bytes)", body.len());
        Ok(normalize_reply(&body))
    }
}
