use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::screening::OcrSettings;

/// Application configuration loaded from environment variables.
/// Every value has a default; malformed values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Threshold applied when a request does not send one.
    pub match_threshold: f64,
    pub max_upload_bytes: usize,
    pub ocr_dpi: u32,
    pub ocr_language: String,
    pub ocr_timeout_secs: u64,
    pub ocr_max_parallel_pages: usize,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let config = Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            match_threshold: parse_env("MATCH_THRESHOLD", defaults.match_threshold)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            ocr_dpi: parse_env("OCR_DPI", defaults.ocr_dpi)?,
            ocr_language: std::env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            ocr_timeout_secs: parse_env("OCR_TIMEOUT_SECS", defaults.ocr_timeout_secs)?,
            ocr_max_parallel_pages: parse_env(
                "OCR_MAX_PARALLEL_PAGES",
                defaults.ocr_max_parallel_pages,
            )?,
            pdftoppm_bin: std::env::var("PDFTOPPM_BIN").unwrap_or(defaults.pdftoppm_bin),
            tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or(defaults.tesseract_bin),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=100.0).contains(&self.match_threshold),
            "MATCH_THRESHOLD must be between 0 and 100, got {}",
            self.match_threshold
        );
        ensure!(self.ocr_dpi > 0, "OCR_DPI must be positive");
        ensure!(self.ocr_timeout_secs > 0, "OCR_TIMEOUT_SECS must be positive");
        ensure!(
            self.ocr_max_parallel_pages > 0,
            "OCR_MAX_PARALLEL_PAGES must be at least 1"
        );
        Ok(())
    }

    pub fn ocr_settings(&self) -> OcrSettings {
        OcrSettings {
            dpi: self.ocr_dpi,
            language: self.ocr_language.clone(),
            timeout: Duration::from_secs(self.ocr_timeout_secs),
            max_parallel_pages: self.ocr_max_parallel_pages,
            pdftoppm_bin: self.pdftoppm_bin.clone(),
            tesseract_bin: self.tesseract_bin.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            match_threshold: 50.0,
            max_upload_bytes: 10 * 1024 * 1024,
            ocr_dpi: 300,
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 120,
            ocr_max_parallel_pages: 4,
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.match_threshold, 50.0);
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let config = Config {
            match_threshold: 120.0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MATCH_THRESHOLD"), "got: {err}");
    }

    #[test]
    fn test_zero_parallelism_is_rejected() {
        let config = Config {
            ocr_max_parallel_pages: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ocr_settings_carry_config_values() {
        let config = Config {
            ocr_dpi: 200,
            ocr_timeout_secs: 30,
            ..Config::default()
        };
        let settings = config.ocr_settings();
        assert_eq!(settings.dpi, 200);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.language, "eng");
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("SCREENER_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
