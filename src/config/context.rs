//! Typed views of the `_context.json` file the job system drops into each
//! work directory.

use crate::utils::error::{IngestError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;

pub const CONTEXT_FILE: &str = "_context.json";

pub fn load_context<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let context_error = |message: String| IngestError::ContextError {
        path: path.display().to_string(),
        message,
    };

    let bytes = std::fs::read(path).map_err(|e| context_error(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| context_error(e.to_string()))
}

fn missing(field: &str) -> IngestError {
    IngestError::MissingConfigError {
        field: field.to_string(),
    }
}

/// A single AVA product to localize.
#[derive(Debug, Clone, Deserialize)]
pub struct AvaIngestContext {
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub on_ava: bool,
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    #[serde(default)]
    pub location: Value,
}

impl AvaIngestContext {
    pub fn short_name(&self) -> Result<&str> {
        self.metadata
            .get("short_name")
            .and_then(Value::as_str)
            .ok_or_else(|| missing("metadata.short_name"))
    }

    pub fn ava_url(&self) -> Result<&str> {
        self.metadata
            .get("ava_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| missing("metadata.ava_url"))
    }

    pub fn starttime(&self) -> Result<&str> {
        self.starttime.as_deref().ok_or_else(|| missing("starttime"))
    }

    pub fn endtime(&self) -> Result<&str> {
        self.endtime.as_deref().ok_or_else(|| missing("endtime"))
    }
}

impl Validate for AvaIngestContext {
    fn validate(&self) -> Result<()> {
        if !self.on_ava {
            return Err(IngestError::processing(
                "Product is not on the AVA. Cannot localize.",
            ));
        }
        validate_non_empty_string("metadata.short_name", self.short_name()?)?;
        validate_url("metadata.ava_url", self.ava_url()?)?;
        self.starttime()?;
        self.endtime()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LpdaacContext {
    pub lpdaac_download_url: String,
}

impl LpdaacContext {
    /// Granule file names are appended to this URL, so it always ends in `/`.
    pub fn download_url(&self) -> String {
        if self.lpdaac_download_url.ends_with('/') {
            self.lpdaac_download_url.clone()
        } else {
            format!("{}/", self.lpdaac_download_url)
        }
    }
}

impl Validate for LpdaacContext {
    fn validate(&self) -> Result<()> {
        validate_url("lpdaac_download_url", &self.lpdaac_download_url)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailContext {
    pub lpdaac_email_directory: Option<String>,
    pub s3_lpdaac_email_bucket: Option<String>,
    pub s3_lpdaac_email_prefix: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(i64),
    Text(String),
}

fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let year = match YearValue::deserialize(deserializer)? {
        YearValue::Number(n) => n,
        YearValue::Text(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    i32::try_from(year).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeContext {
    #[serde(default)]
    pub short_name: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub start_year: i32,
    #[serde(deserialize_with = "deserialize_year")]
    pub end_year: i32,
}

impl Validate for ScrapeContext {
    fn validate(&self) -> Result<()> {
        if self.short_name.trim().is_empty() {
            return Err(missing("short_name"));
        }
        validate_range("start_year", self.start_year, 1970, 2100)?;
        validate_range("end_year", self.end_year, 1970, 2100)?;
        if self.end_year < self.start_year {
            return Err(IngestError::InvalidConfigValueError {
                field: "end_year".to_string(),
                value: self.end_year.to_string(),
                reason: "end_year must be greater than or equal to start_year".to_string(),
            });
        }
        Ok(())
    }
}
