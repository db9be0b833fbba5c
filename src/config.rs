use crate::brand::{normalize_brands, parse_brand_list};
use crate::constants::*;
use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Contents of the optional `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub catalog: CatalogSection,
    pub upstream: UpstreamSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub brands: Option<Vec<String>>,
    pub max: Option<usize>,
    pub page_size: Option<u32>,
    pub catalog_path: Option<PathBuf>,
    pub performers_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub url_template: Option<String>,
    pub sort: Option<String>,
    pub delay_ms: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load the config file. A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(SyncError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                )))
            }
        };
        let config: FileConfig = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Load `KEY=value` pairs from an env file into the process environment.
///
/// Variables already present in the environment keep their value. Returns
/// whether a file was found.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SyncError::Config(format!(
            "Failed to load env file '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Upstream credentials and identity
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_token: String,
    pub user_agent: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let api_key = get(ENV_API_KEY).ok_or(SyncError::MissingCredential(ENV_API_KEY))?;
        let api_token = get(ENV_API_TOKEN).ok_or(SyncError::MissingCredential(ENV_API_TOKEN))?;
        let user_agent = get(ENV_USER_AGENT).unwrap_or_else(default_user_agent);
        Ok(Self {
            api_key,
            api_token,
            user_agent,
        })
    }
}

/// Values given on the command line; each overrides the config file
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub max: Option<usize>,
    pub page_size: Option<u32>,
    pub brands: Option<String>,
    pub reseed: bool,
    pub catalog_out: Option<PathBuf>,
    pub performers_out: Option<PathBuf>,
    pub url_template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub url_template: String,
    pub sort: String,
    pub connect_timeout: Duration,
}

/// Fully resolved settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub max: usize,
    pub page_size: u32,
    pub brands: Vec<String>,
    pub reseed: bool,
    pub catalog_path: PathBuf,
    pub performers_path: PathBuf,
    pub delay: Duration,
    pub upstream: UpstreamSettings,
}

impl SyncSettings {
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Result<Self> {
        let max = cli.max.or(file.catalog.max).unwrap_or(DEFAULT_MAX);
        if max == 0 {
            return Err(SyncError::Config("max must be at least 1".to_string()));
        }

        let requested_page_size = cli
            .page_size
            .or(file.catalog.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let page_size = requested_page_size.clamp(1, MAX_PAGE_SIZE);
        if page_size != requested_page_size {
            warn!(
                "Page size {} out of range, using {}",
                requested_page_size, page_size
            );
        }

        let brands = resolve_brands(cli.brands.as_deref(), file.catalog.brands.as_deref())?;

        let url_template = cli
            .url_template
            .or(file.upstream.url_template)
            .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());

        Ok(Self {
            max,
            page_size,
            brands,
            reseed: cli.reseed,
            catalog_path: cli
                .catalog_out
                .or(file.catalog.catalog_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH)),
            performers_path: cli
                .performers_out
                .or(file.catalog.performers_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PERFORMERS_PATH)),
            delay: Duration::from_millis(file.upstream.delay_ms.unwrap_or(INTER_PAGE_DELAY_MS)),
            upstream: UpstreamSettings {
                url_template,
                sort: file.upstream.sort.unwrap_or_else(|| DEFAULT_SORT.to_string()),
                connect_timeout: Duration::from_secs(
                    file.upstream
                        .connect_timeout_secs
                        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
                ),
            },
        })
    }
}

/// CLI list, else config list, else the built-in default brands.
pub fn resolve_brands(cli: Option<&str>, config: Option<&[String]>) -> Result<Vec<String>> {
    if let Some(csv) = cli {
        let brands = parse_brand_list(csv);
        if brands.is_empty() {
            return Err(SyncError::Config(format!(
                "--brands '{}' does not name any brand",
                csv
            )));
        }
        return Ok(brands);
    }
    if let Some(list) = config {
        let brands = normalize_brands(list);
        if !brands.is_empty() {
            return Ok(brands);
        }
        warn!("Config brand list is empty, falling back to defaults");
    }
    Ok(normalize_brands(DEFAULT_BRANDS))
}
