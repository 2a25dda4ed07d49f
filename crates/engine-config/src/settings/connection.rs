use crate::{error::ConfigError, settings::run::RunConfig};
use connectors::{
    adapter::Driver,
    destination::Credentials,
    file::csv::source::CsvSettings,
};
use serde::{Deserialize, Serialize};

/// Where one side of the transfer lives.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSettings {
    pub driver: Driver,

    /// Connection string. Unused by the memory and csv drivers.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub delimiter: Option<char>,

    #[serde(default)]
    pub has_header: Option<bool>,
}

impl ConnectionSettings {
    pub fn new(driver: Driver) -> Self {
        ConnectionSettings {
            driver,
            url: String::new(),
            delimiter: None,
            has_header: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.url.clone())
    }

    pub fn csv_settings(&self) -> Result<CsvSettings, ConfigError> {
        let mut settings = CsvSettings::default();
        if let Some(delimiter) = self.delimiter {
            settings = settings
                .with_delimiter(delimiter)
                .map_err(|_| ConfigError::InvalidDelimiter(delimiter))?;
        }
        if let Some(has_header) = self.has_header {
            settings.has_header = has_header;
        }
        Ok(settings)
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("driver", &self.driver)
            .field("url", &if self.url.is_empty() { "" } else { "<redacted>" })
            .field("delimiter", &self.delimiter)
            .field("has_header", &self.has_header)
            .finish()
    }
}

/// A complete transfer description: both endpoints plus the run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    pub source: ConnectionSettings,
    pub destination: ConnectionSettings,
    pub run: RunConfig,
}
