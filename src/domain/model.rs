use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of `<id>.dataset.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub label: String,
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    pub location: Value,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl GeoPolygon {
    pub fn new(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![ring],
        }
    }

    pub fn outer_ring(&self) -> Option<&[[f64; 2]]> {
        self.coordinates.first().map(Vec::as_slice)
    }
}

/// Where the primary product file comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductSource {
    /// Saved as `<id>.hdf`.
    Ava { url: String },
    /// Saved under the granule's own file name.
    Lpdaac { url: String, file_name: String },
    /// Metadata-only product, nothing to download.
    MetadataOnly,
}

/// A product that passed the existence check and is ready to be localized.
#[derive(Debug, Clone)]
pub struct StagedProduct {
    pub id: String,
    pub short_name: String,
    pub dataset: DatasetDescriptor,
    pub metadata: Value,
    pub source: ProductSource,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    pub job_name: String,
    pub job_version: String,
    pub queue: String,
    pub priority: u8,
    pub tags: Vec<String>,
    pub params: Value,
}

impl JobRequest {
    pub fn job_type(&self) -> String {
        format!("{}:{}", self.job_name, self.job_version)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub pipeline: String,
    pub discovered: usize,
    pub staged: usize,
    pub loaded: usize,
    pub output: String,
}

impl IngestReport {
    pub fn skipped(&self) -> usize {
        self.discovered.saturating_sub(self.staged)
    }
}

/// `href` of every entry in a metadata `links` array.
pub fn metadata_links(metadata: &Value) -> Vec<String> {
    metadata
        .get("links")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| link.get("href").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dataset_descriptor_key_order() {
        let ds = DatasetDescriptor {
            label: "AST_L1T-20190514T034105_20190514T034114-v1.0".to_string(),
            starttime: Some("2019-05-14T03:41:05Z".to_string()),
            endtime: Some("2019-05-14T03:41:14Z".to_string()),
            location: json!(null),
            version: "v1.0".to_string(),
        };
        let text = serde_json::to_string(&ds).unwrap();
        let label = text.find("\"label\"").unwrap();
        let start = text.find("\"starttime\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        assert!(label < start && start < version);
    }

    #[test]
    fn test_polygon_serializes_as_geojson() {
        let poly = GeoPolygon::new(vec![[10.0, 20.0], [11.0, 20.0], [11.0, 21.0], [10.0, 20.0]]);
        let value = serde_json::to_value(&poly).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"][0][1], json!([11.0, 20.0]));
    }

    #[test]
    fn test_metadata_links_skips_entries_without_href() {
        let met = json!({
            "links": [
                {"href": "https://e4ftl01.example/AST_L1T.tif"},
                {"rel": "metadata"},
                {"href": "https://e4ftl01.example/AST_L1T.jpg"}
            ]
        });
        let links = metadata_links(&met);
        assert_eq!(links.len(), 2);
        assert!(links[1].ends_with(".jpg"));
        assert!(metadata_links(&json!({})).is_empty());
    }
}
