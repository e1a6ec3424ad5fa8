use crate::compile::CompileOptions;
use crate::engine::{RunMode, UsageError};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "letterman", version, about = "Generate invoice letter PDFs for members")]
pub struct CliArgs {
    /// Members to write to: new, pending, expired, pirate, notpirate or all.
    #[arg(value_name = "MODE")]
    pub mode: Option<String>,
}

impl CliArgs {
    /// Mode to run in; `new` when none was given.
    pub fn run_mode(&self) -> Result<RunMode, UsageError> {
        match &self.mode {
            Some(raw) => raw.parse(),
            None => Ok(RunMode::default()),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub civicrm_server: String,
    pub civicrm_path: String,
    pub civicrm_site_key: String,
    pub civicrm_api_key: String,
    pub membership_type: String,
    pub template_api_url: String,
    pub compile_url: String,
    pub static_asset_url: String,
    pub invoice_secret: String,
    pub session_secret: String,
    pub output_dir: PathBuf,
    pub compile_options: CompileOptions,
    pub queue_workers: usize,
    pub page_size: usize,
    pub download_timeout: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("civicrm_server", &self.civicrm_server)
            .field("civicrm_path", &self.civicrm_path)
            .field("membership_type", &self.membership_type)
            .field("template_api_url", &self.template_api_url)
            .field("compile_url", &self.compile_url)
            .field("static_asset_url", &self.static_asset_url)
            .field("output_dir", &self.output_dir)
            .field("compile_options", &self.compile_options)
            .field("queue_workers", &self.queue_workers)
            .field("page_size", &self.page_size)
            .field("download_timeout", &self.download_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional<'a>(env_map: &'a HashMap<String, String>, key: &str, default: &'a str) -> &'a str {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

fn positive(env_map: &HashMap<String, String>, key: &str, default: &str) -> Result<usize, ConfigError> {
    optional(env_map, key, default)
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            ConfigError::InvalidValue(key.to_string(), "must be a positive integer".to_string())
        })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let civicrm_server = required(&env_map, "CIVICRM_SERVER")?;
        let civicrm_path = required(&env_map, "CIVICRM_PATH")?;
        let civicrm_site_key = required(&env_map, "CIVICRM_SITE_KEY")?;
        let civicrm_api_key = required(&env_map, "CIVICRM_API_KEY")?;
        let template_api_url = required(&env_map, "PPSAPI_URL")?;
        let compile_url = required(&env_map, "LATEX_URL")?;
        let invoice_secret = required(&env_map, "PPSAPI_INVOICESECRET")?;
        let session_secret = required(&env_map, "PDFAPI_SESSIONSECRET")?;

        let membership_type = optional(&env_map, "MEMBERSHIP_TYPE", "PPS").to_string();
        let static_asset_url =
            optional(&env_map, "STATIC_ASSET_URL", "http://127.0.0.1:81/static/inv").to_string();
        let output_dir = PathBuf::from(optional(&env_map, "OUTPUT_DIR", "/data/pdf"));

        let timeout = optional(&env_map, "COMPILE_TIMEOUT", "40")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "COMPILE_TIMEOUT".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;
        let compile_options = CompileOptions {
            compiler: optional(&env_map, "COMPILER", "xelatex").to_string(),
            timeout,
        };

        let queue_workers = positive(&env_map, "QUEUE_WORKERS", "2")?;
        let page_size = positive(&env_map, "PAGE_SIZE", "100")?;

        let download_timeout = match env_map.get("DOWNLOAD_TIMEOUT_SECS").filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "DOWNLOAD_TIMEOUT_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?)),
        };

        Ok(Config {
            civicrm_server,
            civicrm_path,
            civicrm_site_key,
            civicrm_api_key,
            membership_type,
            template_api_url,
            compile_url,
            static_asset_url,
            invoice_secret,
            session_secret,
            output_dir,
            compile_options,
            queue_workers,
            page_size,
            download_timeout,
        })
    }
}
