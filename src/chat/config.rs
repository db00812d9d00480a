//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved configuration the session runs with.
//! Values are layered: built-in defaults, then the `SHAPESHIFTER_API_URL`
//! environment variable, then the YAML file, then command-line flags.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{API_URL_ENV, DEFAULT_API_URL};
use crate::error::{Error, Result};
use crate::types::Settings;
use crate::upload::{DEFAULT_ACCEPTED_TYPES, DEFAULT_MAX_FILE_SIZE_MB, UploadPolicy};

/// Session id sent to the backend when none is configured.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the shapeshifter-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend URL (default: http://localhost:8001)", "URL")]
    pub api_url: Option<String>,

    /// Session id sent with chat messages and uploads.
    #[arrrg(optional, "Backend session id (default: default)", "ID")]
    pub session_id: Option<String>,

    /// Language model id.
    #[arrrg(optional, "Language model id (default: gemma-27b)", "LLM")]
    pub llm: Option<String>,

    /// Vector database id.
    #[arrrg(optional, "Vector database id (default: qdrant)", "DB")]
    pub vector_db: Option<String>,

    /// Upload size limit.
    #[arrrg(optional, "Largest accepted upload in MB (default: 10)", "MB")]
    pub max_file_size_mb: Option<u64>,

    /// Comma-separated accepted extensions.
    #[arrrg(optional, "Accepted extensions, comma separated (default: .pdf,.txt,.docx,.doc)", "TYPES")]
    pub accepted_types: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Contents of a YAML configuration file.  Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub session_id: Option<String>,
    pub llm: Option<String>,
    pub vector_db: Option<String>,
    pub max_file_size_mb: Option<u64>,
    pub accepted_types: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub no_color: Option<bool>,
}

impl ConfigFile {
    /// Load a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after layering the
/// environment, the configuration file, and command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Backend base URL.
    pub api_url: String,

    /// Session id sent to the backend.
    pub session_id: String,

    /// Model and vector database selection.
    pub settings: Settings,

    /// Which files may be uploaded.
    pub upload_policy: UploadPolicy,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Backend: `http://localhost:8001`
    /// - Session id: `default`
    /// - Settings: `gemma-27b` with `qdrant`
    /// - Uploads: 10MB, `.pdf .txt .docx .doc`
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            settings: Settings::default(),
            upload_policy: UploadPolicy::new(DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_ACCEPTED_TYPES),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
        }
    }

    /// Defaults with the backend URL taken from `SHAPESHIFTER_API_URL` when set.
    pub fn from_env() -> Self {
        let config = Self::new();
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_api_url(url.trim()),
            _ => config,
        }
    }

    /// Resolve the full configuration from command-line arguments.
    ///
    /// Reads the environment and, if `--config` was given, the YAML file.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Some(ConfigFile::from_file(path)?),
            None => None,
        };
        let mut config = Self::from_env();
        if let Some(file) = file {
            config = config.merge_file(file)?;
        }
        config.merge_args(args)
    }

    /// Overlay the values present in a configuration file.
    pub fn merge_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if let Some(id) = file.session_id {
            self.session_id = id;
        }
        if let Some(llm) = file.llm {
            self.settings.set_llm(llm)?;
        }
        if let Some(db) = file.vector_db {
            self.settings.set_vector_db(db)?;
        }
        self.upload_policy = merge_policy(
            &self.upload_policy,
            file.max_file_size_mb,
            file.accepted_types,
        )?;
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(no_color) = file.no_color {
            self.use_color = !no_color;
        }
        Ok(self)
    }

    /// Overlay the values given on the command line.
    pub fn merge_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(url) = args.api_url {
            self.api_url = url;
        }
        if let Some(id) = args.session_id {
            self.session_id = id;
        }
        if let Some(llm) = args.llm {
            self.settings.set_llm(llm)?;
        }
        if let Some(db) = args.vector_db {
            self.settings.set_vector_db(db)?;
        }
        let types = args
            .accepted_types
            .map(|t| t.split(',').map(str::to_string).collect::<Vec<_>>());
        self.upload_policy = merge_policy(&self.upload_policy, args.max_file_size_mb, types)?;
        if let Some(secs) = args.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if args.no_color {
            self.use_color = false;
        }
        Ok(self)
    }

    /// Sets the backend URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the backend session id.
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    /// Sets the model and vector database.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the upload policy.
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_policy(
    current: &UploadPolicy,
    max_file_size_mb: Option<u64>,
    accepted_types: Option<Vec<String>>,
) -> Result<UploadPolicy> {
    let max = max_file_size_mb.unwrap_or(current.max_file_size_mb);
    let policy = match accepted_types {
        Some(types) => UploadPolicy::new(max, &types),
        None => UploadPolicy::new(max, &current.accepted_types),
    };
    if policy.accepted_types.is_empty() {
        return Err(Error::validation(
            "at least one accepted file type is required",
            Some("accepted_types".to_string()),
        ));
    }
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.api_url, "http://localhost:8001");
        assert_eq!(config.session_id, "default");
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.upload_policy.max_file_size_mb, 10);
        assert_eq!(
            config.upload_policy.accepted_types,
            vec![".pdf", ".txt", ".docx", ".doc"]
        );
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::new().merge_args(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_url: Some("http://rag.internal:9000".to_string()),
            session_id: Some("team-a".to_string()),
            llm: Some("gpt-4".to_string()),
            vector_db: Some("milvus".to_string()),
            max_file_size_mb: Some(25),
            accepted_types: Some("pdf, .MD".to_string()),
            timeout_secs: Some(5),
            config: None,
            no_color: true,
        };
        let config = ChatConfig::new().merge_args(args).unwrap();
        assert_eq!(config.api_url, "http://rag.internal:9000");
        assert_eq!(config.session_id, "team-a");
        assert_eq!(config.settings.llm, "gpt-4");
        assert_eq!(config.settings.vector_db, "milvus");
        assert_eq!(config.upload_policy.max_file_size_mb, 25);
        assert_eq!(config.upload_policy.accepted_types, vec![".pdf", ".md"]);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn unknown_llm_is_rejected() {
        let args = ChatArgs {
            llm: Some("gpt-17".to_string()),
            ..Default::default()
        };
        let err = ChatConfig::new().merge_args(args).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn empty_accepted_types_are_rejected() {
        let args = ChatArgs {
            accepted_types: Some(",".to_string()),
            ..Default::default()
        };
        let err = ChatConfig::new().merge_args(args).unwrap_err();
        assert!(err.is_validation());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapeshifter.yaml");
        std::fs::write(&path, "accepted_types: []\n").unwrap();
        let args = ChatArgs {
            config: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(ChatConfig::resolve(args).unwrap_err().is_validation());
    }

    #[test]
    fn args_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapeshifter.yaml");
        std::fs::write(
            &path,
            "api_url: http://from-file:8001\nllm: llama-3-70b\nmax_file_size_mb: 2\nno_color: true\n",
        )
        .unwrap();
        let args = ChatArgs {
            api_url: Some("http://from-flag:8001".to_string()),
            config: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let config = ChatConfig::resolve(args).unwrap();
        assert_eq!(config.api_url, "http://from-flag:8001");
        assert_eq!(config.settings.llm, "llama-3-70b");
        assert_eq!(config.upload_policy.max_file_size_mb, 2);
        assert!(!config.use_color);
    }

    #[test]
    fn unknown_file_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "temperature: 0.5\n").unwrap();
        assert!(ConfigFile::from_file(&path).is_err());
        assert!(ConfigFile::from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_api_url("http://example.test")
            .with_session_id("s-1")
            .with_settings(Settings::new("mistral-large", "chroma").unwrap())
            .with_upload_policy(UploadPolicy::new(1, &[".txt"]))
            .with_timeout(Duration::from_secs(3))
            .without_color();
        assert_eq!(config.api_url, "http://example.test");
        assert_eq!(config.session_id, "s-1");
        assert_eq!(config.settings.vector_db, "chroma");
        assert_eq!(config.upload_policy.accepted_types, vec![".txt"]);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!config.use_color);
    }
}
