use crate::adapters::{build_client, ensure_success};
use crate::config::settings::AvaSettings;
use crate::utils::error::Result;
use reqwest::Client;
use serde_json::{Map, Value};

/// One row of an AVA year listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvaGranule {
    pub year: i32,
    /// Empty when the AVA has no LPDAAC identifier for the product.
    pub granule_ur: String,
    pub product_url: String,
}

impl AvaGranule {
    pub fn has_granule_ur(&self) -> bool {
        !self.granule_ur.trim().is_empty()
    }

    pub fn product_file_name(&self) -> &str {
        self.product_url.rsplit('/').next().unwrap_or(&self.product_url)
    }
}

#[derive(Debug, Clone)]
pub struct AvaClient {
    client: Client,
    base_url: String,
}

impl AvaClient {
    pub fn new(settings: &AvaSettings, accept_invalid_certs: bool) -> Result<Self> {
        Ok(Self {
            client: build_client(Some(settings.timeout_seconds), accept_invalid_certs)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn listing_url(&self, short_name: &str, year: i32) -> String {
        format!("{}/retrieve/list_{}.php?year={}", self.base_url, short_name, year)
    }

    /// The AVA answers with a flat `{granule_ur: product_url}` object.
    pub async fn list_granules(&self, short_name: &str, year: i32) -> Result<Vec<AvaGranule>> {
        let url = self.listing_url(short_name, year);
        tracing::info!(
            "Querying AVA for year({}) and product({}) from: {}",
            year,
            short_name,
            url
        );

        let response = ensure_success(self.client.get(&url).send().await?, "AVA")?;
        let listing: Map<String, Value> = response.json().await?;

        let granules: Vec<AvaGranule> = listing
            .into_iter()
            .map(|(granule_ur, product_url)| AvaGranule {
                year,
                granule_ur,
                product_url: match product_url {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            })
            .collect();

        tracing::info!("AVA returned {} items.", granules.len());
        Ok(granules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_granules_for_year() {
        let server = MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(GET)
                .path("/retrieve/list_AST_L1B.php")
                .query_param("year", "2000");
            then.status(200).json_body(json!({
                "SC:AST_L1B.003:2000123": "https://ava.example/data/AST_L1B_2000123.hdf",
                "": "https://ava.example/data/AST_L1B_orphan.hdf"
            }));
        });

        let settings = AvaSettings {
            url: server.base_url(),
            ..AvaSettings::default()
        };
        let ava = AvaClient::new(&settings, true).unwrap();
        let granules = ava.list_granules("AST_L1B", 2000).await.unwrap();

        listing.assert();
        assert_eq!(granules.len(), 2);
        let orphan = granules.iter().find(|g| !g.has_granule_ur()).unwrap();
        assert_eq!(orphan.product_file_name(), "AST_L1B_orphan.hdf");
        assert!(granules.iter().all(|g| g.year == 2000));
    }

    #[tokio::test]
    async fn test_listing_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/retrieve/list_AST_L1B.php");
            then.status(502);
        });

        let settings = AvaSettings {
            url: server.base_url(),
            ..AvaSettings::default()
        };
        let ava = AvaClient::new(&settings, true).unwrap();
        assert!(ava.list_granules("AST_L1B", 2001).await.is_err());
    }
}
