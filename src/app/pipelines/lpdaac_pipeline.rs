use crate::adapters::command::{ConvertRenderer, WgetLocalizer};
use crate::adapters::grq::GrqClient;
use crate::config::context::LpdaacContext;
use crate::config::Settings;
use crate::core::localize::load_products;
use crate::core::product_id::{metadata_index, product_id_from_metadata_id, product_index, GranuleFile};
use crate::core::{BrowseRenderer, LoadSummary, Localizer, Pipeline, StagedProduct, Storage};
use crate::domain::model::{metadata_links, DatasetDescriptor, ProductSource};
use crate::utils::error::{ErrorCategory, IngestError, Result};
use crate::utils::validation::Validate;
use serde_json::Value;

pub const DOWNLOADS_DIR: &str = "Downloads";
const LISTING_SUFFIX: &str = ".met";
const GRANULE_SUFFIX: &str = ".hdf.met";

/// Ingests every granule of an LPDAAC order whose metadata product is already cataloged.
pub struct LpdaacPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) context: LpdaacContext,
    pub(crate) grq: GrqClient,
    pub(crate) version: String,
    pub(crate) localizer: Box<dyn Localizer>,
    pub(crate) renderer: Box<dyn BrowseRenderer>,
}

impl<S: Storage> LpdaacPipeline<S> {
    pub fn new(storage: S, context: LpdaacContext, settings: &Settings) -> Result<Self> {
        Ok(Self {
            storage,
            context,
            grq: GrqClient::new(&settings.grq)?,
            version: settings.grq.version.clone(),
            localizer: Box::new(WgetLocalizer::new(&settings.localize)),
            renderer: Box::new(ConvertRenderer::new(&settings.localize)),
        })
    }

    pub fn with_tools(
        mut self,
        localizer: Box<dyn Localizer>,
        renderer: Box<dyn BrowseRenderer>,
    ) -> Self {
        self.localizer = localizer;
        self.renderer = renderer;
        self
    }

    /// `.hdf.met` files mirrored into the downloads directory, sorted by name.
    fn list_granules(&self) -> Result<Vec<GranuleFile>> {
        let download_dir = self.storage.full_path(DOWNLOADS_DIR);
        let entries = std::fs::read_dir(&download_dir).map_err(|e| {
            IngestError::processing(format!(
                "Could not get list of granule_ids from {}: {}",
                download_dir.display(),
                e
            ))
        })?;

        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(GRANULE_SUFFIX) {
                names.push(name);
            }
        }
        names.sort();

        let mut granules = Vec::new();
        for name in names {
            match GranuleFile::parse(&name) {
                Ok(granule) => granules.push(granule),
                Err(e) => tracing::warn!("⚠️ skipping {}: {}", name, e),
            }
        }
        Ok(granules)
    }

    async fn stage_granule(&self, granule: &GranuleFile) -> Result<Option<StagedProduct>> {
        let short_name = &granule.short_name;
        let key = &granule.acquisition_key;

        let index = product_index(&self.version, short_name);
        if self.grq.count_matching(&index, key, short_name).await? > 0 {
            tracing::info!("granule ID {} already exists in AVA", granule.file_name);
            return Ok(None);
        }

        let index = metadata_index(&self.version, short_name);
        let Some(hit) = self.grq.first_match(&index, key, short_name).await? else {
            tracing::info!("no metadata product for granule {}", granule.file_name);
            return Ok(None);
        };

        let id = product_id_from_metadata_id(&hit.id, &self.version)?;
        let metadata = hit.source.get("metadata").cloned().unwrap_or(Value::Null);
        let text = |field: &str| hit.source.get(field).and_then(Value::as_str).map(str::to_string);

        let source = match metadata.get("ava_url").and_then(Value::as_str) {
            Some(url) => ProductSource::Ava {
                url: url.to_string(),
            },
            None => ProductSource::Lpdaac {
                url: format!("{}{}", self.context.download_url(), granule.hdf_name),
                file_name: granule.hdf_name.clone(),
            },
        };

        Ok(Some(StagedProduct {
            dataset: DatasetDescriptor {
                label: id.clone(),
                starttime: text("starttime"),
                endtime: text("endtime"),
                location: hit.source.get("location").cloned().unwrap_or(Value::Null),
                version: self.version.clone(),
            },
            short_name: short_name.clone(),
            source,
            links: metadata_links(&metadata),
            metadata,
            id,
        }))
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for LpdaacPipeline<S> {
    type Record = GranuleFile;
    type Staged = StagedProduct;

    fn name(&self) -> &str {
        "ingest_from_lpdaac"
    }

    async fn extract(&self) -> Result<Vec<GranuleFile>> {
        self.context.validate()?;
        let url = self.context.download_url();
        tracing::info!("lpdaac_download_url: {}", url);

        let download_dir = self.storage.full_path(DOWNLOADS_DIR);
        self.localizer
            .fetch_listing(&url, LISTING_SUFFIX, &download_dir)
            .await?;
        tracing::info!("granule_download_dir: {}", download_dir.display());

        let granules = self.list_granules()?;
        tracing::debug!(
            "granule_ids: {:?}",
            granules.iter().map(|g| g.file_name.as_str()).collect::<Vec<_>>()
        );
        Ok(granules)
    }

    async fn transform(&self, records: Vec<GranuleFile>) -> Result<Vec<StagedProduct>> {
        let mut staged = Vec::new();
        for granule in &records {
            match self.stage_granule(granule).await {
                Ok(Some(product)) => staged.push(product),
                Ok(None) => {}
                // 只有資料錯誤跳過；目錄連線失敗要讓整個工作失敗
                Err(e) if e.category() == ErrorCategory::Data => {
                    tracing::warn!("⚠️ skipping granule {}: {}", granule.file_name, e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(staged)
    }

    async fn load(&self, staged: Vec<StagedProduct>) -> Result<LoadSummary> {
        load_products(
            &self.storage,
            self.localizer.as_ref(),
            self.renderer.as_ref(),
            staged,
        )
        .await
    }
}
