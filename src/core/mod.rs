pub mod email;
pub mod etl;
pub mod geo;
pub mod localize;
pub mod product_id;

pub use crate::domain::model::{IngestReport, LoadSummary, StagedProduct};
pub use crate::domain::ports::{BrowseRenderer, Localizer, Pipeline, Storage};
pub use crate::utils::error::Result;
