use crate::adapters::command::{ConvertRenderer, WgetLocalizer};
use crate::adapters::grq::GrqClient;
use crate::config::context::AvaIngestContext;
use crate::config::Settings;
use crate::core::localize::load_products;
use crate::core::product_id::{product_id, product_index};
use crate::core::{BrowseRenderer, LoadSummary, Localizer, Pipeline, StagedProduct, Storage};
use crate::domain::model::{metadata_links, DatasetDescriptor, ProductSource};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// Localizes the single AVA product described by the job context.
pub struct AvaIngestPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) context: AvaIngestContext,
    pub(crate) grq: GrqClient,
    pub(crate) version: String,
    pub(crate) localizer: Box<dyn Localizer>,
    pub(crate) renderer: Box<dyn BrowseRenderer>,
}

impl<S: Storage> AvaIngestPipeline<S> {
    pub fn new(storage: S, context: AvaIngestContext, settings: &Settings) -> Result<Self> {
        Ok(Self {
            storage,
            context,
            grq: GrqClient::new(&settings.grq)?,
            version: settings.grq.version.clone(),
            localizer: Box::new(WgetLocalizer::new(&settings.localize)),
            renderer: Box::new(ConvertRenderer::new(&settings.localize)),
        })
    }

    /// Swaps the download and browse tools, mostly for tests.
    pub fn with_tools(
        mut self,
        localizer: Box<dyn Localizer>,
        renderer: Box<dyn BrowseRenderer>,
    ) -> Self {
        self.localizer = localizer;
        self.renderer = renderer;
        self
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for AvaIngestPipeline<S> {
    type Record = AvaIngestContext;
    type Staged = StagedProduct;

    fn name(&self) -> &str {
        "ava-ingest"
    }

    async fn extract(&self) -> Result<Vec<AvaIngestContext>> {
        self.context.validate()?;
        Ok(vec![self.context.clone()])
    }

    async fn transform(&self, records: Vec<AvaIngestContext>) -> Result<Vec<StagedProduct>> {
        let mut staged = Vec::new();

        for ctx in records {
            let short_name = ctx.short_name()?;
            let id = product_id(short_name, ctx.starttime()?, ctx.endtime()?, &self.version)?;

            let index = product_index(&self.version, short_name);
            if self.grq.exists(&index, &id).await? {
                tracing::info!("product with id: {} already exists. Exiting.", id);
                continue;
            }

            staged.push(StagedProduct {
                dataset: DatasetDescriptor {
                    label: id.clone(),
                    starttime: ctx.starttime.clone(),
                    endtime: ctx.endtime.clone(),
                    location: ctx.location.clone(),
                    version: self.version.clone(),
                },
                short_name: short_name.to_string(),
                source: ProductSource::Ava {
                    url: ctx.ava_url()?.to_string(),
                },
                links: metadata_links(&ctx.metadata),
                metadata: ctx.metadata.clone(),
                id,
            });
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
