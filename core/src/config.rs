use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub account_id: u64,
    pub per_page: u32,
    pub request_timeout_secs: u64,
}

// Keeps the bearer credential out of logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("account_id", &self.account_id)
            .field("per_page", &self.per_page)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Total pages requested when `--pages` is not given
    pub pages: u32,
    /// Upper bound on concurrent page requests within one batch
    pub max_batch_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, the variables may already be exported
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        // Load default configuration
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // Layer on config file if it exists
        if Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        // Layer on environment variables (FETCHER_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("FETCHER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut settings: Config = config.try_deserialize()?;

        settings.apply_env_fallbacks(|key| std::env::var(key).ok());

        settings.validate()?;
        Ok(settings)
    }

    /// Fills the credentials from the unprefixed `BASE_URL` / `ACCESS_TOKEN`
    /// variables when the layered sources left them unset.
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api.base_url.is_none() {
            self.api.base_url = lookup("BASE_URL");
        }
        if self.api.access_token.is_none() {
            self.api.access_token = lookup("ACCESS_TOKEN");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.api.base_url) {
            return Err(ConfigError::Message(
                "api.base_url is required (set BASE_URL)".into(),
            ));
        }

        if is_blank(&self.api.access_token) {
            return Err(ConfigError::Message(
                "api.access_token is required (set ACCESS_TOKEN)".into(),
            ));
        }

        if self.api.per_page == 0 {
            return Err(ConfigError::Message(
                "api.per_page must be greater than 0".into(),
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "api.request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.fetch.pages == 0 {
            return Err(ConfigError::Message(
                "fetch.pages must be greater than 0".into(),
            ));
        }

        if self.fetch.max_batch_size == 0 {
            return Err(ConfigError::Message(
                "fetch.max_batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: None,
                access_token: None,
                account_id: 1,
                per_page: 100,
                request_timeout_secs: 30,
            },
            fetch: FetchConfig {
                pages: 20,
                max_batch_size: 20,
            },
            output: OutputConfig {
                path: PathBuf::from("logs.log"),
            },
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}
