use super::series::{Instrument, Lookback, Ticker};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_HEADER_ROWS: usize = 7;
pub const DEFAULT_PASSWORD_ENV: &str = "PENSIONGUARD_SMTP_PASSWORD";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct InstrumentsConfig {
    pub currency: Ticker,
    pub equity: Ticker,
    pub copper: Ticker,
    pub local_index: Ticker,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        InstrumentsConfig {
            currency: Instrument::UsdClp.into(),
            equity: Instrument::Sp500.into(),
            copper: Instrument::Copper.into(),
            local_index: Instrument::Ipsa.into(),
        }
    }
}

impl InstrumentsConfig {
    pub fn ticker(&self, instrument: Instrument) -> &Ticker {
        match instrument {
            Instrument::UsdClp => &self.currency,
            Instrument::Sp500 => &self.equity,
            Instrument::Copper => &self.copper,
            Instrument::Ipsa => &self.local_index,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub from: String,
    pub to: String,
    /// Environment variable holding the relay password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NotificationsConfig {
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub instruments: InstrumentsConfig,
    pub lookback: Lookback,
    /// Metadata rows preceding the table in a fund export.
    pub header_rows: usize,
    pub data_path: Option<String>,
    pub notifications: NotificationsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            instruments: InstrumentsConfig::default(),
            lookback: Lookback::default(),
            header_rows: DEFAULT_HEADER_ROWS,
            data_path: None,
            notifications: NotificationsConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("cl", "pensionguard", "pensionguard")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
