use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";
const DEFAULT_PLANE_URL: &str = "http://localhost:80";
const DEFAULT_AZURE_URL: &str = "https://dev.azure.com";
const DEFAULT_TRANSCRIPT_DIR: &str = "agent_data/transcripts";
const DEFAULT_WORK_DIR: &str = "agent_data/work";

/// Configuration errors surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{tracker} configuration is missing {field}")]
    Missing {
        tracker: &'static str,
        field: &'static str,
    },

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Local language-model endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEndpoint {
    pub url: String,
    pub model: String,
}

/// Workspace + project pair a tracker creates items in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerTarget {
    pub workspace: String,
    pub project: String,
}

impl TrackerTarget {
    pub fn new(workspace: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            project: project.into(),
        }
    }

    /// Names the first empty identifier, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.workspace.trim().is_empty() {
            Some("workspace")
        } else if self.project.trim().is_empty() {
            Some("project")
        } else {
            None
        }
    }
}

/// Plane (Tracker-A) connection settings.
#[derive(Debug, Clone)]
pub struct PlaneConfig {
    pub host_url: String,
    pub api_token: String,
    pub target: TrackerTarget,
}

/// Azure DevOps (Tracker-B) connection settings. The workspace of the
/// target is the Azure organization.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub host_url: String,
    pub pat: String,
    pub target: TrackerTarget,
}

/// Local transcript/result directories.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_path: PathBuf,
    pub transcript_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl StorageConfig {
    pub fn transcript_path(&self) -> PathBuf {
        self.base_path.join(&self.transcript_dir)
    }

    pub fn work_path(&self) -> PathBuf {
        self.base_path.join(&self.work_dir)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct ClarityConfig {
    pub ollama: OllamaEndpoint,
    pub plane: PlaneConfig,
    pub azure: AzureConfig,
    pub storage: StorageConfig,
    /// Per-request HTTP timeout. `None` keeps the transport default.
    pub http_timeout: Option<Duration>,
}

impl ClarityConfig {
    /// Read configuration from the process environment.
    ///
    /// `.env` loading is the binary's job; this only reads variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_path = env::var("CLARITY_BASE_PATH")
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."));

        let http_timeout = match env::var("CLARITY_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "CLARITY_HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            ollama: OllamaEndpoint {
                url: trim_url(env_or("CLARITY_OLLAMA_URL", DEFAULT_OLLAMA_URL)),
                model: env_or("CLARITY_MODEL", DEFAULT_MODEL),
            },
            plane: PlaneConfig {
                host_url: trim_url(env_or("CLARITY_PLANE_URL", DEFAULT_PLANE_URL)),
                api_token: env_or("CLARITY_PLANE_API_TOKEN", ""),
                target: TrackerTarget::new(
                    env_or("CLARITY_PLANE_WORKSPACE", ""),
                    env_or("CLARITY_PLANE_PROJECT", ""),
                ),
            },
            azure: AzureConfig {
                host_url: trim_url(env_or("CLARITY_AZURE_URL", DEFAULT_AZURE_URL)),
                pat: env_or("CLARITY_AZURE_PAT", ""),
                target: TrackerTarget::new(
                    env_or("CLARITY_AZURE_ORGANIZATION", ""),
                    env_or("CLARITY_AZURE_PROJECT", ""),
                ),
            },
            storage: StorageConfig {
                base_path,
                transcript_dir: PathBuf::from(env_or(
                    "CLARITY_TRANSCRIPT_DIR",
                    DEFAULT_TRANSCRIPT_DIR,
                )),
                work_dir: PathBuf::from(env_or("CLARITY_WORK_DIR", DEFAULT_WORK_DIR)),
            },
            http_timeout,
        })
    }

    /// Build an HTTP client honouring the configured timeout.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Strip trailing slashes so paths can be appended with `format!`.
pub fn trim_url(url: impl AsRef<str>) -> String {
    url.as_ref().trim_end_matches('/').to_string()
}
