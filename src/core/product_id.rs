//! Product identifiers, catalog index names and LPDAAC granule file names.
//!
//! Identifiers are a pure function of short name, start and end time, and
//! dataset version, e.g. `AST_L1T-20190514T034105_20190514T034114-v1.0`.

use crate::utils::error::{IngestError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const METADATA_PREFIX: &str = "MET";

/// Parses the timestamp formats seen in AVA contexts and CMR records.
///
/// Offsets are not normalized: `2019-05-14T03:41:05-07:00` yields 03:41:05.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }

    let naive = trimmed.trim_end_matches('Z').replacen(' ', "T", 1);
    if let Ok(dt) = naive.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    if let Ok(date) = naive.parse::<NaiveDate>() {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    Err(IngestError::processing(format!(
        "unrecognized timestamp: {:?}",
        value
    )))
}

pub fn compact_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

fn time_span(starttime: &str, endtime: &str) -> Result<String> {
    let start = parse_timestamp(starttime)?;
    let end = parse_timestamp(endtime)?;
    Ok(format!(
        "{}_{}",
        compact_timestamp(&start),
        compact_timestamp(&end)
    ))
}

pub fn product_id(short_name: &str, starttime: &str, endtime: &str, version: &str) -> Result<String> {
    Ok(format!(
        "{}-{}-{}",
        short_name,
        time_span(starttime, endtime)?,
        version
    ))
}

pub fn metadata_product_id(
    short_name: &str,
    starttime: &str,
    endtime: &str,
    version: &str,
) -> Result<String> {
    Ok(format!(
        "{}-{}",
        METADATA_PREFIX,
        product_id(short_name, starttime, endtime, version)?
    ))
}

/// `MET-AST_L1T-<span>-v1.0` -> `AST_L1T-<span>-<version>`.
pub fn product_id_from_metadata_id(metadata_id: &str, version: &str) -> Result<String> {
    let items: Vec<&str> = metadata_id.split('-').collect();
    if items.len() < 3 {
        return Err(IngestError::processing(format!(
            "metadata id {:?} does not look like MET-<short_name>-<span>-<version>",
            metadata_id
        )));
    }
    Ok(format!("{}-{}-{}", items[1], items[2], version))
}

pub fn product_index(version: &str, short_name: &str) -> String {
    format!("grq_{}_{}", version, short_name.to_lowercase())
}

pub fn metadata_index(version: &str, short_name: &str) -> String {
    format!("grq_{}_metadata-{}", version, short_name.to_lowercase())
}

/// An LPDAAC granule metadata file such as
/// `AST_L1T_00305142019034105_20190515092342_12345.hdf.met`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleFile {
    pub file_name: String,
    pub short_name: String,
    /// Version and acquisition date block, used as the catalog search key.
    pub acquisition_key: String,
    /// The HDF this `.met` describes.
    pub hdf_name: String,
}

impl GranuleFile {
    pub fn parse(file_name: &str) -> Result<Self> {
        let items: Vec<&str> = file_name.split('_').collect();
        let dotted: Vec<&str> = file_name.split('.').collect();
        if items.len() < 3 || dotted.len() < 2 {
            return Err(IngestError::processing(format!(
                "granule file name {:?} is not <platform>_<level>_<acquisition>_...hdf.met",
                file_name
            )));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            short_name: format!("{}_{}", items[0], items[1]),
            acquisition_key: items[2].to_string(),
            hdf_name: format!("{}.{}", dotted[0], dotted[1]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_from_iso_timestamps() {
        let id = product_id(
            "AST_L1T",
            "2019-05-14T03:41:05.000Z",
            "2019-05-14T03:41:14Z",
            "v1.0",
        )
        .unwrap();
        assert_eq!(id, "AST_L1T-20190514T034105_20190514T034114-v1.0");
    }

    #[test]
    fn test_metadata_product_id_prefix() {
        let id = metadata_product_id("AST_09T", "2001-01-02", "2001-01-02 10:00:00", "v1.0").unwrap();
        assert_eq!(id, "MET-AST_09T-20010102T000000_20010102T100000-v1.0");
    }

    #[test]
    fn test_parse_timestamp_keeps_wall_clock_of_offset() {
        let dt = parse_timestamp("2019-05-14T03:41:05-07:00").unwrap();
        assert_eq!(compact_timestamp(&dt), "20190514T034105");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(product_id("AST_L1T", "", "2019-05-14", "v1.0").is_err());
    }

    #[test]
    fn test_product_id_from_metadata_id() {
        let id = product_id_from_metadata_id(
            "MET-AST_L1T-20190514T034105_20190514T034114-v1.0",
            "v1.0",
        )
        .unwrap();
        assert_eq!(id, "AST_L1T-20190514T034105_20190514T034114-v1.0");
        assert!(product_id_from_metadata_id("AST_L1T", "v1.0").is_err());
    }

    #[test]
    fn test_index_names_are_lowercase() {
        assert_eq!(product_index("v1.0", "AST_09T"), "grq_v1.0_ast_09t");
        assert_eq!(metadata_index("v1.0", "AST_09T"), "grq_v1.0_metadata-ast_09t");
    }

    #[test]
    fn test_granule_file_parse() {
        let granule =
            GranuleFile::parse("AST_L1T_00305142019034105_20190515092342_12345.hdf.met").unwrap();
        assert_eq!(granule.short_name, "AST_L1T");
        assert_eq!(granule.acquisition_key, "00305142019034105");
        assert_eq!(
            granule.hdf_name,
            "AST_L1T_00305142019034105_20190515092342_12345.hdf"
        );
        assert!(GranuleFile::parse("README.hdf.met").is_err());
    }
}
