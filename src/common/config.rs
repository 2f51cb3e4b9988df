//! Configuration file handling
//!
//! Locates `aie2e.toml`, applies environment substitution to the
//! `transport` and `sensitive_data` sections, and merges the result over
//! built-in defaults. Resolution is all-or-nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::env;
use super::{Error, Result};

/// Recognized configuration file names, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["aie2e.toml", "aie2e.config.toml"];

/// Subdirectories of the working directory searched after the directory itself
pub const CONFIG_SEARCH_SUBDIRS: &[&str] = &["config", ".config"];

/// Default per-call timeout (5 minutes)
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

pub const DEFAULT_COMMAND: &str = "uvx";
pub const DEFAULT_ARGS: &[&str] = &["--from", "aie2e", "aie2e-server"];
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// LLM providers understood by the remote executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    Ollama,
    #[default]
    Openai,
    Anthropic,
    Google,
    AwsBedrock,
    AnthropicBedrock,
    AzureOpenai,
    Deepseek,
    Groq,
    Openrouter,
}

impl LlmProvider {
    pub const ALL: &'static [LlmProvider] = &[
        LlmProvider::Ollama,
        LlmProvider::Openai,
        LlmProvider::Anthropic,
        LlmProvider::Google,
        LlmProvider::AwsBedrock,
        LlmProvider::AnthropicBedrock,
        LlmProvider::AzureOpenai,
        LlmProvider::Deepseek,
        LlmProvider::Groq,
        LlmProvider::Openrouter,
    ];

    /// Name passed to the executor's `--llm-provider` flag
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Openai => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Google => "google",
            LlmProvider::AwsBedrock => "aws-bedrock",
            LlmProvider::AnthropicBedrock => "anthropic-bedrock",
            LlmProvider::AzureOpenai => "azure-openai",
            LlmProvider::Deepseek => "deepseek",
            LlmProvider::Groq => "groq",
            LlmProvider::Openrouter => "openrouter",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }
}

/// Settings for spawning the executor as a child process
#[derive(Debug, Clone, PartialEq)]
pub struct StdioTransportConfig {
    pub command: String,
    pub args: Vec<String>,
    pub model: String,
    pub llm_provider: LlmProvider,
    pub api_key: Option<String>,
    pub headless: bool,
}

impl Default for StdioTransportConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            model: DEFAULT_MODEL.to_string(),
            llm_provider: LlmProvider::default(),
            api_key: None,
            headless: false,
        }
    }
}

/// Settings for reaching an already running executor over HTTP
#[derive(Debug, Clone, PartialEq)]
pub struct HttpTransportConfig {
    pub url: String,
}

/// How to reach the remote executor
#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    Stdio(StdioTransportConfig),
    Http(HttpTransportConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Stdio(StdioTransportConfig::default())
    }
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio(_) => "stdio",
            TransportConfig::Http(_) => "http",
        }
    }
}

/// A secret value: either a flat string or a per-domain key/secret table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Plain(String),
    Scoped(BTreeMap<String, String>),
}

/// Sensitive data keyed by domain pattern (or flat key)
pub type SensitiveData = BTreeMap<String, SecretValue>;

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// URL patterns the executor may navigate to
    pub allowed_domains: Option<Vec<String>>,
    /// Secrets shared with every session of the run
    pub sensitive_data: Option<SensitiveData>,
    pub transport: TransportConfig,
    /// Per remote call timeout in milliseconds
    pub timeout: Option<u64>,
    /// File the configuration was read from
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_domains: None,
            sensitive_data: None,
            transport: TransportConfig::default(),
            timeout: Some(DEFAULT_TIMEOUT_MS),
            source: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    timeout: Option<u64>,
    allowed_domains: Option<Vec<String>>,
    sensitive_data: Option<SensitiveData>,
    #[serde(default)]
    transport: RawTransport,
}

#[derive(Debug, Deserialize, Default)]
struct RawTransport {
    #[serde(rename = "type")]
    kind: Option<String>,
    command: Option<String>,
    args: Option<Vec<String>>,
    model: Option<String>,
    llm_provider: Option<String>,
    api_key: Option<String>,
    headless: Option<bool>,
    url: Option<String>,
}

impl Config {
    /// Resolve configuration from an explicit path or by searching the working directory
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let base = std::env::current_dir()?;
        Self::resolve_in(&base, explicit)
    }

    /// Resolve configuration relative to `base` using the process environment
    pub fn resolve_in(base: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::ConfigNotFound {
                        path: path.display().to_string(),
                    });
                }
                path.to_path_buf()
            }
            None => find_config_file(base).ok_or_else(|| Error::NoConfigFound {
                searched: search_paths(base)
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut config = Self::resolve_str(&path.display().to_string(), &content, |name| {
            std::env::var(name).ok()
        })?;
        config.source = Some(path);
        Ok(config)
    }

    /// Resolve configuration from file contents with an injectable variable lookup
    pub fn resolve_str<F>(path: &str, content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table: toml::Value =
            toml::from_str(content).map_err(|e| Error::config_parse(path, e))?;

        for section in ["transport", "sensitive_data"] {
            if let Some(value) = table.get_mut(section) {
                env::substitute_toml(value, &lookup);
            }
        }

        let raw: RawConfig = table.try_into().map_err(|e| Error::config_parse(path, e))?;
        let defaults = Config::default();

        let transport = build_transport(path, raw.transport)?;

        Ok(Config {
            allowed_domains: raw.allowed_domains.or(defaults.allowed_domains),
            sensitive_data: raw.sensitive_data.or(defaults.sensitive_data),
            transport,
            timeout: raw.timeout.or(defaults.timeout),
            source: None,
        })
    }
}

fn build_transport(path: &str, raw: RawTransport) -> Result<TransportConfig> {
    let kind = raw.kind.as_deref().unwrap_or("stdio");
    match kind {
        "stdio" => {
            let defaults = StdioTransportConfig::default();
            let llm_provider = match raw.llm_provider.as_deref() {
                None => defaults.llm_provider,
                Some(name) => LlmProvider::parse(name).ok_or_else(|| Error::InvalidLlmProvider {
                    path: path.to_string(),
                    value: name.to_string(),
                    valid: LlmProvider::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })?,
            };
            Ok(TransportConfig::Stdio(StdioTransportConfig {
                command: raw.command.unwrap_or(defaults.command),
                args: raw.args.unwrap_or(defaults.args),
                model: raw.model.unwrap_or(defaults.model),
                llm_provider,
                api_key: raw.api_key.filter(|key| !key.is_empty()),
                headless: raw.headless.unwrap_or(defaults.headless),
            }))
        }
        "http" => Ok(TransportConfig::Http(HttpTransportConfig {
            url: raw.url.unwrap_or_default(),
        })),
        other => Err(Error::InvalidTransport {
            path: path.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Candidate directories in search order
pub fn search_paths(base: &Path) -> Vec<PathBuf> {
    std::iter::once(base.to_path_buf())
        .chain(CONFIG_SEARCH_SUBDIRS.iter().map(|dir| base.join(dir)))
        .collect()
}

/// Find the first existing configuration file under `base`
pub fn find_config_file(base: &Path) -> Option<PathBuf> {
    search_paths(base)
        .into_iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::resolve_str("aie2e.toml", "", no_env).unwrap();
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.transport, TransportConfig::Stdio(StdioTransportConfig::default()));
        assert!(config.allowed_domains.is_none());
        assert!(config.sensitive_data.is_none());
    }

    #[test]
    fn test_partial_stdio_section_merges_with_defaults() {
        let content = r#"
            timeout = 600000
            allowed_domains = ["https://*.example.com"]

            [transport]
            type = "stdio"
            model = "claude-sonnet"
            llm_provider = "anthropic"
            headless = true
        "#;
        let config = Config::resolve_str("aie2e.toml", content, no_env).unwrap();
        assert_eq!(config.timeout, Some(600_000));
        assert_eq!(
            config.allowed_domains,
            Some(vec!["https://*.example.com".to_string()])
        );
        let TransportConfig::Stdio(stdio) = config.transport else {
            panic!("expected stdio transport");
        };
        assert_eq!(stdio.command, DEFAULT_COMMAND);
        assert_eq!(stdio.args, vec!["--from", "aie2e", "aie2e-server"]);
        assert_eq!(stdio.model, "claude-sonnet");
        assert_eq!(stdio.llm_provider, LlmProvider::Anthropic);
        assert!(stdio.headless);
        assert!(stdio.api_key.is_none());
    }

    #[test]
    fn test_http_transport() {
        let content = r#"
            [transport]
            type = "http"
            url = "${EXECUTOR_URL:http://localhost:3001/mcp}"
        "#;
        let config = Config::resolve_str("aie2e.toml", content, no_env).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Http(HttpTransportConfig {
                url: "http://localhost:3001/mcp".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_transport_is_rejected() {
        let content = r#"
            [transport]
            type = "websocket"
        "#;
        let err = Config::resolve_str("cfg/aie2e.toml", content, no_env).unwrap_err();
        match err {
            Error::InvalidTransport { path, value } => {
                assert_eq!(path, "cfg/aie2e.toml");
                assert_eq!(value, "websocket");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_llm_provider_is_rejected() {
        let content = r#"
            [transport]
            llm_provider = "skynet"
        "#;
        let err = Config::resolve_str("aie2e.toml", content, no_env).unwrap_err();
        assert!(matches!(err, Error::InvalidLlmProvider { ref value, .. } if value == "skynet"));
    }

    #[test]
    fn test_substitution_in_transport_and_sensitive_data() {
        let content = r#"
            allowed_domains = ["${NOT_SUBSTITUTED}"]

            [transport]
            api_key = "${OPENAI_API_KEY}"
            args = ["--from", "${PKG:aie2e}"]

            [sensitive_data]
            flat = "${MISSING}"

            [sensitive_data."https://*.example.com"]
            user = "${TEST_USER:someone@example.com}"
            pass = "${TEST_PASS}"
        "#;
        let lookup = |name: &str| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "TEST_PASS" => Some("hunter2".to_string()),
            _ => None,
        };
        let config = Config::resolve_str("aie2e.toml", content, lookup).unwrap();

        // Only the transport and sensitive_data sections are substituted
        assert_eq!(
            config.allowed_domains,
            Some(vec!["${NOT_SUBSTITUTED}".to_string()])
        );

        let TransportConfig::Stdio(stdio) = &config.transport else {
            panic!("expected stdio transport");
        };
        assert_eq!(stdio.api_key.as_deref(), Some("sk-test"));
        assert_eq!(stdio.args, vec!["--from", "aie2e"]);

        let secrets = config.sensitive_data.unwrap();
        assert_eq!(secrets["flat"], SecretValue::Plain(String::new()));
        let SecretValue::Scoped(scoped) = &secrets["https://*.example.com"] else {
            panic!("expected scoped secrets");
        };
        assert_eq!(scoped["user"], "someone@example.com");
        assert_eq!(scoped["pass"], "hunter2");
    }

    #[test]
    fn test_empty_api_key_counts_as_absent() {
        let content = r#"
            [transport]
            api_key = "${UNSET_KEY}"
        "#;
        let config = Config::resolve_str("aie2e.toml", content, no_env).unwrap();
        let TransportConfig::Stdio(stdio) = config.transport else {
            panic!("expected stdio transport");
        };
        assert!(stdio.api_key.is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let content = r#"
            timeout = 1000
            [transport]
            model = "${MODEL:gpt-4o}"
        "#;
        let first = Config::resolve_str("aie2e.toml", content, no_env).unwrap();
        let second = Config::resolve_str("aie2e.toml", content, no_env).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Config::resolve_str("aie2e.toml", "timeout = [", no_env).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_explicit_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::resolve_in(dir.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_no_config_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::resolve_in(dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::NoConfigFound { .. }));
    }

    #[test]
    fn test_search_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::create_dir_all(dir.path().join(".config")).unwrap();
        std::fs::write(dir.path().join(".config/aie2e.toml"), "timeout = 3").unwrap();
        std::fs::write(dir.path().join("config/aie2e.config.toml"), "timeout = 2").unwrap();

        // config/ is searched before .config/
        let config = Config::resolve_in(dir.path(), None).unwrap();
        assert_eq!(config.timeout, Some(2));

        // The working directory beats both subdirectories
        std::fs::write(dir.path().join("aie2e.config.toml"), "timeout = 1").unwrap();
        let config = Config::resolve_in(dir.path(), None).unwrap();
        assert_eq!(config.timeout, Some(1));
        assert_eq!(config.source, Some(dir.path().join("aie2e.config.toml")));

        // Within a directory, aie2e.toml beats aie2e.config.toml
        std::fs::write(dir.path().join("aie2e.toml"), "timeout = 0").unwrap();
        let config = Config::resolve_in(dir.path(), None).unwrap();
        assert_eq!(config.timeout, Some(0));
    }
}
