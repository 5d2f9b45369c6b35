use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";
const REDACTED: &str = "***";

/// Plain environment variables honoured for compatibility with existing deployments.
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("PORT", "server.port"),
    ("EXPRESS_SECRET", "auth.secret"),
];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
    #[serde(default)]
    pub books: BookSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// environment variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .with_context(|| "unable to resolve current directory")?,
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("uploads.allowed_mime_prefixes")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_OVERRIDES {
            builder = builder
                .set_override_option(*key, std::env::var(var).ok())
                .with_context(|| format!("failed to apply {var} override"))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parse_environment(&environment)?;

        Ok(settings)
    }

    /// Copy of the settings with credentials masked, suitable for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.database.url = redact_url(&copy.database.url);
        if copy.media.s3.access_key_id.is_some() {
            copy.media.s3.access_key_id = Some(REDACTED.to_string());
        }
        if copy.media.s3.secret_access_key.is_some() {
            copy.media.s3.secret_access_key = Some(REDACTED.to_string());
        }
        if copy.auth.secret.is_some() {
            copy.auth.secret = Some(REDACTED.to_string());
        }
        copy
    }
}

fn parse_environment(name: &str) -> anyhow::Result<Environment> {
    match name {
        "local" => Ok(Environment::Local),
        "staging" => Ok(Environment::Staging),
        "production" => Ok(Environment::Production),
        other => Err(anyhow!(
            "unsupported environment '{}'; expected local/staging/production",
            other
        )),
    }
}

/// Masks the `user:password@` part of a connection string.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://{REDACTED}@{host}"),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        2001
    }

    fn default_request_timeout_ms() -> u64 {
        30000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Which document store backs the book repository.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub driver: DatabaseDriver,
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_name() -> String {
        "bookshelf".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: Self::default_url(),
            name: Self::default_name(),
        }
    }
}

/// Where cover images are stored.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Memory,
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaSettings {
    #[serde(default)]
    pub backend: MediaBackend,
    /// Prefix prepended to every object key.
    #[serde(default = "MediaSettings::default_key_prefix")]
    pub key_prefix: String,
    /// Base URL under which stored objects are publicly reachable.
    #[serde(default = "MediaSettings::default_public_base_url")]
    pub public_base_url: String,
    /// Root directory for the `local` backend.
    #[serde(default = "MediaSettings::default_local_root")]
    pub local_root: PathBuf,
    #[serde(default)]
    pub s3: S3Settings,
}

impl MediaSettings {
    fn default_key_prefix() -> String {
        "covers".to_string()
    }

    fn default_public_base_url() -> String {
        "http://localhost:2001/media".to_string()
    }

    fn default_local_root() -> PathBuf {
        PathBuf::from("media")
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            backend: MediaBackend::default(),
            key_prefix: Self::default_key_prefix(),
            public_base_url: Self::default_public_base_url(),
            local_root: Self::default_local_root(),
            s3: S3Settings::default(),
        }
    }
}

/// S3 credentials. Unset fields fall back to the standard `AWS_*` variables.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct S3Settings {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadSettings {
    /// Directory where incoming files are staged before they reach the image store.
    #[serde(default = "UploadSettings::default_dir")]
    pub dir: PathBuf,
    #[serde(default = "UploadSettings::default_max_files")]
    pub max_files: usize,
    /// Per-file cap in bytes.
    #[serde(default = "UploadSettings::default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "UploadSettings::default_allowed_mime_prefixes")]
    pub allowed_mime_prefixes: Vec<String>,
}

impl UploadSettings {
    fn default_dir() -> PathBuf {
        PathBuf::from("uploads")
    }

    fn default_max_files() -> usize {
        5
    }

    fn default_max_file_size() -> u64 {
        2 * 1024 * 1024
    }

    fn default_allowed_mime_prefixes() -> Vec<String> {
        vec!["image/".to_string(), "application/".to_string()]
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            max_files: Self::default_max_files(),
            max_file_size: Self::default_max_file_size(),
            allowed_mime_prefixes: Self::default_allowed_mime_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BookSettings {
    /// Upper bound for `limit` on the search endpoint. Unbounded when unset.
    #[serde(default)]
    pub max_page_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,tower_http=debug".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthSettings {
    /// Shared secret reserved for future signed endpoints. No route reads it yet.
    #[serde(default)]
    pub secret: Option<String>,
}
