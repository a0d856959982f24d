use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::OcrError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub limits: LimitsConfig,
    pub cooldown: CooldownConfig,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub max_request_body_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub binary: String,
    pub default_language: String,
    pub page_segmentation_mode: u8,
    pub engine_mode: Option<u8>,
    pub tessdata_dir: Option<String>,
    pub timeout_ms: u64,
    pub thread_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_concurrency: u32,
    pub max_image_dimension: u32,
    pub max_image_pixels: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CooldownConfig {
    pub seconds: u64,
    pub client_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 10000,
                max_request_body_size_mb: 20,
            },
            engine: EngineConfig {
                binary: "tesseract".to_string(),
                default_language: "eng".to_string(),
                page_segmentation_mode: 3, // fully automatic page segmentation
                engine_mode: None,
                tessdata_dir: None,
                timeout_ms: 15000,
                thread_limit: 1,
            },
            limits: LimitsConfig {
                max_concurrency: 3,
                max_image_dimension: 10000,
                max_image_pixels: 40_000_000,
            },
            cooldown: CooldownConfig {
                seconds: 0,
                client_header: "x-client-id".to_string(),
            },
            fetch: FetchConfig {
                enabled: true,
                timeout_ms: 10000,
            },
            logging: LoggingConfig {
                format: LogFormat::Text,
                filter: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Layers defaults, the optional TOML file, `OCR_*` variables and `PORT`.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("OCR_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        Self::figment(path)
            .extract()
            .map_err(|e| OcrError::ConfigError { reason: e.to_string() })
    }

    pub fn max_request_body_bytes(&self) -> usize {
        let bytes = self.server.max_request_body_size_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn shipped_config_file_matches_defaults() {
        let shipped: Config = Figment::from(Toml::string(include_str!(
            "../../../configs/default.toml"
        )))
        .extract()
        .unwrap();
        assert_eq!(shipped, Config::default());
    }

    #[test]
    fn defaults_listen_on_10000() {
        let config = Config::default();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.limits.max_concurrency, 3);
        assert_eq!(config.max_request_body_bytes(), 20 * 1024 * 1024);
    }

    #[test]
    fn absurd_body_limit_saturates() {
        let mut config = Config::default();
        config.server.max_request_body_size_mb = u64::MAX;
        assert_eq!(config.max_request_body_bytes(), usize::MAX);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config: Config = Config::figment("does-not-exist.toml").extract()?;
            let defaults = Config::default();
            assert_eq!(config.engine, defaults.engine);
            assert_eq!(config.limits, defaults.limits);
            assert_eq!(config.logging, defaults.logging);
            Ok(())
        });
    }

    #[test]
    fn file_then_env_then_port() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ocr.toml",
                r#"
                [engine]
                default_language = "deu"
                timeout_ms = 500

                [limits]
                max_concurrency = 2
                "#,
            )?;
            jail.set_env("OCR_LIMITS__MAX_CONCURRENCY", "8");
            jail.set_env("OCR_CONFIG", "ocr.toml");
            jail.set_env("PORT", "12345");

            let config: Config = Config::figment("ocr.toml").extract()?;
            assert_eq!(config.engine.default_language, "deu");
            assert_eq!(config.engine.timeout_ms, 500);
            assert_eq!(config.limits.max_concurrency, 8);
            assert_eq!(config.server.port, 12345);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("ocr.toml", "[server]\nhost = \"nope\"\n")?;
            assert!(Config::load("ocr.toml").is_err());
            Ok(())
        });
    }

    #[test]
    fn log_format_parses_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
