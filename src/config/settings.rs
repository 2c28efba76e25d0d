use crate::utils::error::{IngestError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV_VAR: &str = "AVA_INGEST_CONFIG";

/// Endpoints and knobs shared by every procedure. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grq: GrqSettings,
    pub mozart: MozartSettings,
    pub ava: AvaSettings,
    pub cmr: CmrSettings,
    pub localize: LocalizeSettings,
    pub lpdaac_jobs: LpdaacJobSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrqSettings {
    pub es_url: String,
    pub update_url: String,
    pub version: String,
    pub accept_invalid_certs: bool,
    pub dataset_processed_queue: String,
}

impl Default for GrqSettings {
    fn default() -> Self {
        Self {
            es_url: "http://localhost:9200".to_string(),
            update_url: "http://localhost:8878/api/v0.1/grq/dataset/index".to_string(),
            version: "v1.0".to_string(),
            accept_invalid_certs: true,
            dataset_processed_queue: "dataset_processed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MozartSettings {
    pub rest_url: String,
    pub jobs_es_url: String,
}

impl Default for MozartSettings {
    fn default() -> Self {
        Self {
            rest_url: "https://localhost/mozart/api/v0.1".to_string(),
            jobs_es_url: "http://localhost:9200".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvaSettings {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for AvaSettings {
    fn default() -> Self {
        Self {
            url: "https://ava.jpl.nasa.gov".to_string(),
            timeout_seconds: 450,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmrSettings {
    pub url: String,
    pub provider: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub page_size: u32,
}

impl Default for CmrSettings {
    fn default() -> Self {
        Self {
            url: "https://cmr.earthdata.nasa.gov".to_string(),
            provider: "LPDAAC_ECS".to_string(),
            timeout_seconds: 60,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            page_size: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizeSettings {
    pub wget: String,
    pub convert: String,
    pub timeout_seconds: u64,
    pub browse_size: String,
}

impl Default for LocalizeSettings {
    fn default() -> Self {
        Self {
            wget: "wget".to_string(),
            convert: "convert".to_string(),
            timeout_seconds: 3600,
            browse_size: "300x300".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LpdaacJobSettings {
    pub job_name: String,
    pub job_version: String,
    pub queue: String,
    pub priority: u8,
}

impl Default for LpdaacJobSettings {
    fn default() -> Self {
        Self {
            job_name: "job-ingest_lpdaac_prod".to_string(),
            job_version: "dev".to_string(),
            queue: "factotum-job_worker-small".to_string(),
            priority: 5,
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| IngestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit path first, then `AVA_INGEST_CONFIG`, then built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            tracing::debug!("Loading settings from {}", path.display());
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => {
                tracing::debug!("Loading settings from ${} = {}", CONFIG_ENV_VAR, path);
                Self::from_file(path)
            }
            _ => {
                tracing::debug!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 替換環境變數 (例如 ${GRQ_ES_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IngestError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("grq.es_url", &self.grq.es_url)?;
        validate_url("grq.update_url", &self.grq.update_url)?;
        validate_non_empty_string("grq.version", &self.grq.version)?;
        validate_url("mozart.rest_url", &self.mozart.rest_url)?;
        validate_url("mozart.jobs_es_url", &self.mozart.jobs_es_url)?;
        validate_url("ava.url", &self.ava.url)?;
        validate_url("cmr.url", &self.cmr.url)?;
        validate_positive_number("cmr.retry_attempts", self.cmr.retry_attempts as u64, 1)?;
        validate_positive_number("cmr.page_size", self.cmr.page_size as u64, 1)?;
        validate_positive_number("localize.timeout_seconds", self.localize.timeout_seconds, 1)?;
        validate_non_empty_string("localize.wget", &self.localize.wget)?;
        validate_non_empty_string("localize.convert", &self.localize.convert)?;
        validate_range("lpdaac_jobs.priority", self.lpdaac_jobs.priority, 0, 9)?;
        Ok(())
    }
}
