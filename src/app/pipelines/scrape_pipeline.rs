use crate::adapters::ava::{AvaClient, AvaGranule};
use crate::adapters::cmr::CmrClient;
use crate::adapters::grq::GrqClient;
use crate::config::context::ScrapeContext;
use crate::config::Settings;
use crate::core::geo::parse_cmr_polygon;
use crate::core::localize::save_product_met;
use crate::core::product_id::{metadata_index, metadata_product_id};
use crate::core::{LoadSummary, Pipeline, StagedProduct, Storage};
use crate::domain::model::{DatasetDescriptor, ProductSource};
use crate::utils::error::{IngestError, Result};
use crate::utils::validation::Validate;
use serde_json::{json, Value};

pub const MISSING_PRODUCTS_CSV: &str = "missing_lp_daac_id_products.csv";

/// Walks the AVA year listings and publishes a metadata product per CMR granule.
pub struct ScrapePipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) context: ScrapeContext,
    pub(crate) ava: AvaClient,
    pub(crate) cmr: CmrClient,
    pub(crate) grq: GrqClient,
    pub(crate) version: String,
    pub(crate) processed_queue: String,
}

impl<S: Storage> ScrapePipeline<S> {
    pub fn new(storage: S, context: ScrapeContext, settings: &Settings) -> Result<Self> {
        Ok(Self {
            storage,
            context,
            ava: AvaClient::new(&settings.ava, settings.grq.accept_invalid_certs)?,
            cmr: CmrClient::new(&settings.cmr)?,
            grq: GrqClient::new(&settings.grq)?,
            version: settings.grq.version.clone(),
            processed_queue: settings.grq.dataset_processed_queue.clone(),
        })
    }

    fn short_name(&self) -> &str {
        &self.context.short_name
    }

    /// The CMR granule plus the AVA fields, wrapped as a `MET-` product.
    fn metadata_product(&self, granule: &AvaGranule, mut entry: Value) -> Result<StagedProduct> {
        let short_name = self.short_name();
        let time = |field: &str| -> Result<String> {
            entry
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| IngestError::processing(format!("CMR granule has no {}", field)))
        };
        let starttime = time("time_start")?;
        let endtime = time("time_end")?;
        let id = metadata_product_id(short_name, &starttime, &endtime, &self.version)?;
        let location = serde_json::to_value(parse_cmr_polygon(&entry)?)?;

        if let Value::Object(fields) = &mut entry {
            fields.insert("ava_url".to_string(), json!(granule.product_url));
            fields.insert("on_ava".to_string(), json!(true));
            fields.insert("short_name".to_string(), json!(short_name));
            fields.insert("shortname".to_string(), json!(short_name));
        }

        Ok(StagedProduct {
            dataset: DatasetDescriptor {
                label: id.clone(),
                starttime: Some(starttime),
                endtime: Some(endtime),
                location,
                version: self.version.clone(),
            },
            short_name: short_name.to_string(),
            metadata: entry,
            source: ProductSource::MetadataOnly,
            links: Vec::new(),
            id,
        })
    }

    /// The document handed to GRQ for indexing.
    pub fn dataset_info(&self, product: &StagedProduct) -> Value {
        json!({
            "id": product.id,
            "dataset": format!("metadata-{}", product.short_name),
            "version": product.dataset.version,
            "label": product.dataset.label,
            "starttime": product.dataset.starttime,
            "endtime": product.dataset.endtime,
            "location": product.dataset.location,
            "metadata": product.metadata,
            "processed_queue": self.processed_queue,
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ScrapePipeline<S> {
    type Record = AvaGranule;
    type Staged = StagedProduct;

    fn name(&self) -> &str {
        "scrape"
    }

    async fn extract(&self) -> Result<Vec<AvaGranule>> {
        self.context.validate()?;
        let mut granules = Vec::new();
        for year in self.context.start_year..=self.context.end_year {
            granules.extend(self.ava.list_granules(self.short_name(), year).await?);
        }
        Ok(granules)
    }

    async fn transform(&self, records: Vec<AvaGranule>) -> Result<Vec<StagedProduct>> {
        let mut missing = csv::Writer::from_path(self.storage.full_path(MISSING_PRODUCTS_CSV))?;
        missing.write_record(["missing_lp_daac_id_products", "ava_product_url"])?;

        let index = metadata_index(&self.version, self.short_name());
        let mut staged = Vec::new();
        let mut missing_count = 0;

        for granule in &records {
            if !granule.has_granule_ur() {
                tracing::error!("Missing LP DAAC ID for : {}", granule.product_url);
                missing.write_record([granule.product_file_name(), granule.product_url.as_str()])?;
                missing_count += 1;
                continue;
            }

            let Some(entry) = self.cmr.granule_by_ur(&granule.granule_ur).await? else {
                tracing::warn!("⚠️ CMR has no granule for {}", granule.granule_ur);
                continue;
            };

            let product = match self.metadata_product(granule, entry) {
                Ok(product) => product,
                Err(e) => {
                    tracing::warn!("⚠️ skipping {}: {}", granule.granule_ur, e);
                    continue;
                }
            };

            tracing::info!("ingesting: {}", product.id);
            if self.grq.exists(&index, &product.id).await? {
                tracing::info!("Product already exists with uid: {}. Passing on publish...", product.id);
                continue;
            }
            staged.push(product);
        }
        missing.flush()?;

        tracing::info!(
            "{} granules NOT ingested out of {} between the years {} to {}",
            missing_count,
            records.len(),
            self.context.start_year,
            self.context.end_year
        );
        Ok(staged)
    }

    async fn load(&self, staged: Vec<StagedProduct>) -> Result<LoadSummary> {
        let total = staged.len();
        let mut loaded = 0;

        for product in &staged {
            save_product_met(&self.storage, product).await?;
            tracing::info!("Product with uid: {} does not exist. Publishing...", product.id);
            self.grq
                .publish(&self.dataset_info(product))
                .await
                .map_err(|e| {
                    IngestError::processing(format!("failed on submission of {}: {}", product.id, e))
                })?;
            self.storage.remove_dir(&product.id).await?;

            loaded += 1;
            tracing::info!("{} of {} granules ingested", loaded, total);
        }

        Ok(LoadSummary {
            loaded,
            output: self.storage.full_path(MISSING_PRODUCTS_CSV).display().to_string(),
        })
    }
}
