//! Compile-and-fetch pipeline for invoice letters.
//!
//! This module provides:
//! - The declarative compile job sent to the LaTeX compile service
//! - Job construction from a member id and template
//! - The compile service abstraction (HTTP client and in-memory mock)
//! - A bounded worker queue running submit + download per member

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod client;
pub mod mock;
pub mod queue;

pub use builder::{CompileJobBuilder, StaticAsset};
pub use client::{CompileError, CompileService, LatexCompileClient};
pub use mock::MockCompileService;
pub use queue::{
    CompileQueue, LoggingListener, QueueClosed, QueueListener, QueueOptions, QueueTask, TaskReport,
    TaskState,
};

/// Compile status reported by the service for a successful build.
pub const COMPILE_SUCCESS: &str = "success";

/// Compiler engine and time budget for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub compiler: String,
    pub timeout: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compiler: "xelatex".to_string(),
            timeout: 40,
        }
    }
}

/// One file the compiler fetches before building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    pub url: String,
}

/// Declarative description of one document build.
///
/// Built fresh per member and consumed once by the compile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileJob {
    pub options: CompileOptions,
    pub root_resource_path: String,
    pub resources: Vec<Resource>,
}

impl CompileJob {
    /// The root document resource, if present.
    pub fn root_resource(&self) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.path == self.root_resource_path)
    }
}

/// Request envelope: `{"compile": <job>}`.
#[derive(Debug, Serialize)]
pub struct CompileRequest<'a> {
    pub compile: &'a CompileJob,
}

/// Response envelope: `{"compile": {"status": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileResponse {
    #[serde(default)]
    pub compile: CompileOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileOutcome {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl CompileResponse {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            compile: CompileOutcome {
                status: status.into(),
                error: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.compile.status == COMPILE_SUCCESS
    }
}
