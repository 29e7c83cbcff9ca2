use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spendscore_client::{ApiConfig, PipelineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_spendscore_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub upload: UploadSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent with every upload as the `company_name` form field.
    pub context_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Delay before an auto-detected mapping is submitted.
    pub auto_submit_delay_ms: u64,
    /// Save each completed upload as a report.
    pub create_report: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            base_url: api.base_url,
            timeout_secs: api.timeout.as_secs(),
            context_label: api.context_label,
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            auto_submit_delay_ms: 1500,
            create_report: false,
        }
    }
}

impl Config {
    pub fn api_config(&self, auth_token: Option<String>) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs.max(1)),
            context_label: self.api.context_label.clone(),
            auth_token,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            auto_submit_delay: Duration::from_millis(self.upload.auto_submit_delay_ms),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_spendscore_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(p: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "http://localhost:5000/api");
        assert_eq!(cfg.api.timeout_secs, 10);
        assert_eq!(cfg.api.context_label, "FinDash Demo Company");
        assert_eq!(cfg.upload.auto_submit_delay_ms, 1500);
        assert!(!cfg.upload.create_report);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[api]\nbase_url = \"https://spend.example.com/api\"\n").unwrap();

        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.api.base_url, "https://spend.example.com/api");
        assert_eq!(cfg.api.timeout_secs, 10);
        assert_eq!(cfg.upload, UploadSection::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.upload.create_report = true;
        cfg.upload.auto_submit_delay_ms = 0;
        save_config_to(&p, &cfg).unwrap();
        assert_eq!(load_config_from(&p).unwrap(), cfg);
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[api\n").unwrap();
        let err = load_config_from(&p).unwrap_err();
        assert!(format!("{err}").contains("config.toml"));
    }

    #[test]
    fn test_client_configs() {
        let mut cfg = Config::default();
        cfg.api.timeout_secs = 0;
        let api = cfg.api_config(Some("tok".to_string()));
        assert_eq!(api.timeout, Duration::from_secs(1));
        assert_eq!(api.auth_token.as_deref(), Some("tok"));
        assert_eq!(cfg.pipeline_config().auto_submit_delay, Duration::from_millis(1500));
    }
}
