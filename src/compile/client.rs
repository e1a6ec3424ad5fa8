//! LaTeX compile service client.

use super::{CompileJob, CompileRequest, CompileResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Remote compile service: job submission plus artifact download.
///
/// `project_base` is `{compile_url}/project/{project_hash}`.
#[async_trait]
pub trait CompileService: Send + Sync + fmt::Debug {
    /// Submit a job. Transport failures and non-2xx responses are errors; a
    /// delivered response is returned whatever its compile status.
    async fn submit(
        &self,
        project_base: &str,
        job: &CompileJob,
    ) -> Result<CompileResponse, CompileError>;

    /// Stream the compiled PDF into `sink`, returning the number of bytes
    /// written.
    async fn download(
        &self,
        project_base: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, CompileError>;
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected http status: {0}")]
    HttpStatus(u16),
    #[error("invalid compile response: {0}")]
    Parse(String),
    #[error("compilation failed with status {status:?}")]
    Failed { status: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// HTTP implementation against a CLSI-style compile server.
#[derive(Debug, Clone)]
pub struct LatexCompileClient {
    client: Client,
}

impl LatexCompileClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn compile_url(project_base: &str) -> String {
        format!("{}/compile", project_base)
    }

    pub fn output_url(project_base: &str) -> String {
        format!("{}/output/output.pdf", project_base)
    }
}

impl Default for LatexCompileClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl CompileService for LatexCompileClient {
    async fn submit(
        &self,
        project_base: &str,
        job: &CompileJob,
    ) -> Result<CompileResponse, CompileError> {
        let url = Self::compile_url(project_base);
        debug!("Submitting compile job to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&CompileRequest { compile: job })
            .send()
            .await
            .map_err(|e| CompileError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompileError::HttpStatus(status.as_u16()));
        }

        response
            .json::<CompileResponse>()
            .await
            .map_err(|e| CompileError::Parse(e.to_string()))
    }

    async fn download(
        &self,
        project_base: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, CompileError> {
        let url = Self::output_url(project_base);
        debug!("Downloading artifact from {}", url);

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CompileError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompileError::HttpStatus(status.as_u16()));
        }

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CompileError::Transport(e.to_string()))?
        {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let base = "http://latex:3013/project/abc";
        assert_eq!(
            LatexCompileClient::compile_url(base),
            "http://latex:3013/project/abc/compile"
        );
        assert_eq!(
            LatexCompileClient::output_url(base),
            "http://latex:3013/project/abc/output/output.pdf"
        );
    }

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::Failed {
            status: "failure".to_string(),
        };
        assert_eq!(err.to_string(), "compilation failed with status \"failure\"");
        assert_eq!(
            CompileError::HttpStatus(503).to_string(),
            "unexpected http status: 503"
        );
    }
}
