//! JSON configuration file loading and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::constants::*;
use crate::error_handling::ConfigError;

/// Connection security of an IMAP account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Implicit TLS (usually port 993)
    Ssl,
    /// Plaintext connection upgraded with STARTTLS
    Starttls,
    /// Plaintext connection
    None,
}

/// A single mailbox account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Account name, used in artifact and cache file names
    pub name: String,
    /// IMAP server host
    pub host: String,
    /// IMAP server port
    pub port: u16,
    /// Login user name
    pub username: String,
    /// Login password
    pub password: String,
    /// Connection security
    pub security: Security,
    /// Folders to scan
    pub folders: Vec<String>,
}

/// Settings of the Ollama-compatible inference service.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Model name passed with every request
    pub model: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Attempts per record including the first one
    pub max_attempts: usize,
    /// Delay before the first retry
    pub retry_initial_delay: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            max_attempts: RETRY_MAX_ATTEMPTS,
            retry_initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
        }
    }
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Lookback window from the config file (overridden by `--days`)
    pub default_days: Option<u32>,
    /// Directory for JSON artifacts; the cache lives in its `cache` subdirectory
    pub log_dir: PathBuf,
    /// Directory for HTML reports
    pub report_dir: PathBuf,
    /// Maximum concurrent inference calls
    pub max_concurrency: usize,
    /// Maximum accounts processed at the same time
    pub max_accounts_in_parallel: usize,
    /// Timeout of a single mailbox operation
    pub mailbox_timeout: Duration,
    /// Inference service settings
    pub ollama: OllamaConfig,
    /// Accounts keyed by name
    pub accounts: BTreeMap<String, AccountConfig>,
}

impl AppConfig {
    /// Directory holding the per-account fingerprint caches.
    pub fn cache_dir(&self) -> PathBuf {
        self.log_dir.join(CACHE_SUBDIR)
    }

    /// Lookback window, preferring the CLI value over the config file.
    pub fn lookback_days(&self, cli_days: Option<u32>) -> u32 {
        cli_days
            .filter(|days| *days > 0)
            .or(self.default_days.filter(|days| *days > 0))
            .unwrap_or(DEFAULT_DAYS)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    default_days: Option<u32>,
    log_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    max_concurrency: Option<usize>,
    max_accounts_in_parallel: Option<usize>,
    mailbox_timeout_secs: Option<u64>,
    #[serde(default)]
    ollama: RawOllama,
    #[serde(default)]
    accounts: BTreeMap<String, RawAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOllama {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<usize>,
    retry_initial_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
    security: Option<Security>,
    check: Option<Vec<String>>,
}

/// Loads and validates the configuration file at `path`.
///
/// Relative `log_dir`/`report_dir` values are resolved against the directory
/// containing the configuration file.
///
/// # Errors
///
/// Returns a `ConfigError` if the file is missing, is not valid JSON, lacks a
/// required account field, or configures no accounts.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config_dir = path
        .canonicalize()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    parse_config(&content, &config_dir)
}

/// Parses configuration JSON, resolving relative directories against `config_dir`.
pub fn parse_config(content: &str, config_dir: &Path) -> Result<AppConfig, ConfigError> {
    let raw: RawConfig = serde_json::from_str(content)?;

    let mut accounts = BTreeMap::new();
    for (name, account) in raw.accounts {
        accounts.insert(name.clone(), build_account(name, account)?);
    }
    if accounts.is_empty() {
        return Err(ConfigError::NoAccounts);
    }

    let ollama = build_ollama(raw.ollama)?;
    let resolve = |dir: Option<PathBuf>, default: &str| {
        let dir = dir.unwrap_or_else(|| PathBuf::from(default));
        if dir.is_absolute() {
            dir
        } else {
            config_dir.join(dir)
        }
    };

    Ok(AppConfig {
        default_days: raw.default_days,
        log_dir: resolve(raw.log_dir, DEFAULT_LOG_DIR),
        report_dir: resolve(raw.report_dir, DEFAULT_REPORT_DIR),
        max_concurrency: raw
            .max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1),
        max_accounts_in_parallel: raw
            .max_accounts_in_parallel
            .unwrap_or(DEFAULT_MAX_ACCOUNTS_IN_PARALLEL)
            .max(1),
        mailbox_timeout: Duration::from_secs(
            raw.mailbox_timeout_secs
                .unwrap_or(DEFAULT_MAILBOX_TIMEOUT_SECS),
        ),
        ollama,
        accounts,
    })
}

fn build_ollama(raw: RawOllama) -> Result<OllamaConfig, ConfigError> {
    let defaults = OllamaConfig::default();
    let base_url = raw.base_url.unwrap_or(defaults.base_url);
    url::Url::parse(&base_url).map_err(|e| ConfigError::InvalidUrl {
        url: base_url.clone(),
        reason: e.to_string(),
    })?;

    Ok(OllamaConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        model: raw.model.unwrap_or(defaults.model),
        timeout: raw
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
        max_attempts: raw.max_attempts.unwrap_or(defaults.max_attempts).max(1),
        retry_initial_delay: raw
            .retry_initial_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_initial_delay),
    })
}

fn build_account(name: String, raw: RawAccount) -> Result<AccountConfig, ConfigError> {
    let missing = |field: &'static str| ConfigError::MissingField {
        account: name.clone(),
        field,
    };

    let host = raw.host.ok_or_else(|| missing("host"))?;
    let port = raw.port.ok_or_else(|| missing("port"))?;
    let username = raw.username.ok_or_else(|| missing("username"))?;
    let password = match (raw.password, raw.password_env) {
        (Some(password), _) => password,
        (None, Some(var)) => std::env::var(&var).map_err(|_| ConfigError::MissingEnv {
            account: name.clone(),
            var,
        })?,
        (None, None) => return Err(missing("password")),
    };

    let folders = raw
        .check
        .filter(|folders| !folders.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_FOLDER.to_string()]);

    Ok(AccountConfig {
        name,
        host,
        port,
        username,
        password,
        security: raw.security.unwrap_or(Security::Ssl),
        folders,
    })
}
