use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SERVICE_ACCOUNT: &str = "firebaseServiceKey.json";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:G";
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Front-end origins allowed to call the API when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5000",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
    "https://hospital-system-88ee9.web.app",
    "https://hospital-system-88ee9.firebaseapp.com",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub service_account_path: PathBuf,
    pub static_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    /// Set when `GOOGLE_SHEET_ID` is present.
    pub sheets: Option<SheetsConfig>,
    pub relay_webhook: Option<Url>,
    pub body_limit: usize,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let allowed_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let sheets = var("GOOGLE_SHEET_ID").map(|spreadsheet_id| SheetsConfig {
            spreadsheet_id,
            range: var("GOOGLE_SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
        });

        let relay_webhook = var("RELAY_WEBHOOK_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    key: "RELAY_WEBHOOK_URL",
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            service_account_path: var("FIREBASE_SERVICE_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_string())
                .into(),
            static_dir: var("STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
                .into(),
            allowed_origins,
            sheets,
            relay_webhook,
            body_limit: parse_or("BODY_LIMIT_BYTES", var("BODY_LIMIT_BYTES"), DEFAULT_BODY_LIMIT)?,
        })
    }

    /// Logs which optional integrations are enabled.
    pub fn log_summary(&self) {
        match &self.sheets {
            Some(sheets) => info!(
                sheet = %sheets.spreadsheet_id,
                range = %sheets.range,
                "Google Sheets sync: ready"
            ),
            None => warn!("Google Sheets sync: not configured"),
        }
        match &self.relay_webhook {
            Some(url) => info!(host = url.host_str().unwrap_or_default(), "Relay webhook: enabled"),
            None => info!("Relay webhook: disabled"),
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_env_file_values() {
        let path = std::env::temp_dir().join(format!("clinic-queue-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "# local overrides\nPORT=8080\nRELAY_WEBHOOK_URL=\"https://hooks.example/row\"\n",
        )
        .unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.relay_webhook.as_ref().map(Url::as_str),
            Some("https://hooks.example/row")
        );
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.service_account_path, PathBuf::from("firebaseServiceKey.json"));
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.allowed_origins.len(), 6);
        assert!(config
            .allowed_origins
            .contains(&"https://hospital-system-88ee9.web.app".to_string()));
        assert_eq!(config.sheets, None);
        assert_eq!(config.relay_webhook, None);
        assert_eq!(config.body_limit, 10 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("STATIC_DIR", "/srv/www"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
            ("GOOGLE_SHEET_ID", "sheet-123"),
            ("RELAY_WEBHOOK_URL", "https://hook.relay.app/api/v1/playbook/abc"),
            ("BODY_LIMIT_BYTES", "1024"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(
            config.sheets,
            Some(SheetsConfig {
                spreadsheet_id: "sheet-123".into(),
                range: "Sheet1!A:G".into(),
            })
        );
        assert_eq!(
            config.relay_webhook.as_ref().and_then(|u| u.host_str()),
            Some("hook.relay.app")
        );
        assert_eq!(config.body_limit, 1024);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "  "), ("GOOGLE_SHEET_ID", "")]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.sheets, None);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_invalid_webhook_url() {
        let err = config_from(&[("RELAY_WEBHOOK_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RELAY_WEBHOOK_URL", .. }));
    }
}
