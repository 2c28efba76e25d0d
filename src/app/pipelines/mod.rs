pub mod ava_pipeline;
pub mod email_pipeline;
pub mod lpdaac_pipeline;
pub mod scrape_pipeline;

pub use ava_pipeline::AvaIngestPipeline;
pub use email_pipeline::EmailPipeline;
pub use lpdaac_pipeline::LpdaacPipeline;
pub use scrape_pipeline::ScrapePipeline;
