use crate::domain::model::{LoadSummary, ProductSource, StagedProduct};
use crate::domain::ports::{BrowseRenderer, Localizer, Storage};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["tif", "jpg", "jpeg", "png"];
pub const BROWSE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extension of a link's path, ignoring any query string or fragment.
pub fn link_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
}

/// Renders `<id>.browse.png` and `<id>.browse_small.png` from an image link
/// and removes the source image. Returns false when a browse already exists
/// or rendering failed; a missing browse never fails the product.
pub async fn generate_browse(
    renderer: &dyn BrowseRenderer,
    source: &Path,
    product_dir: &Path,
    product_id: &str,
) -> Result<bool> {
    let browse = product_dir.join(format!("{}.browse.png", product_id));
    let browse_small = product_dir.join(format!("{}.browse_small.png", product_id));
    if browse.exists() {
        return Ok(false);
    }

    if let Err(e) = renderer.render(source, &browse, &browse_small).await {
        tracing::warn!("browse generation failed for {}: {}", product_id, e);
        return Ok(false);
    }
    if source.exists() {
        std::fs::remove_file(source)?;
    }
    Ok(true)
}

/// Downloads the primary file and any image links into `product_dir`.
pub async fn localize_product(
    localizer: &dyn Localizer,
    renderer: &dyn BrowseRenderer,
    product_dir: &Path,
    product: &StagedProduct,
) -> Result<()> {
    std::fs::create_dir_all(product_dir)?;

    match &product.source {
        ProductSource::Ava { url } => {
            let dest = product_dir.join(format!("{}.hdf", product.id));
            localizer.fetch_file(url, &dest).await?;
        }
        ProductSource::Lpdaac { url, file_name } => {
            localizer.fetch_file(url, &product_dir.join(file_name)).await?;
        }
        ProductSource::MetadataOnly => {}
    }

    for href in &product.links {
        let Some(extension) = link_extension(href) else {
            continue;
        };
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        let dest: PathBuf = product_dir.join(format!("{}.{}", product.id, extension));
        if !dest.exists() {
            localizer.fetch_file(href, &dest).await?;
        }
        if BROWSE_EXTENSIONS.contains(&extension.as_str()) {
            generate_browse(renderer, &dest, product_dir, &product.id).await?;
        }
    }
    Ok(())
}

/// Writes `<id>/<id>.dataset.json` and `<id>/<id>.met.json`.
pub async fn save_product_met<S: Storage>(storage: &S, product: &StagedProduct) -> Result<()> {
    let id = &product.id;
    storage
        .write_file(
            &format!("{}/{}.dataset.json", id, id),
            &serde_json::to_vec(&product.dataset)?,
        )
        .await?;
    storage
        .write_file(
            &format!("{}/{}.met.json", id, id),
            &serde_json::to_vec(&product.metadata)?,
        )
        .await?;
    Ok(())
}

/// Localizes and saves every staged product in order; the first failure aborts.
pub async fn load_products<S: Storage>(
    storage: &S,
    localizer: &dyn Localizer,
    renderer: &dyn BrowseRenderer,
    products: Vec<StagedProduct>,
) -> Result<LoadSummary> {
    let mut summary = LoadSummary {
        loaded: 0,
        output: storage.full_path("").display().to_string(),
    };

    for product in products {
        tracing::info!("attempting to localize product: {}", product.id);
        let product_dir = storage.full_path(&product.id);
        localize_product(localizer, renderer, &product_dir, &product).await?;
        save_product_met(storage, &product).await?;
        tracing::info!("📦 saved product {} to {}", product.id, product_dir.display());
        summary.loaded += 1;
    }
    Ok(summary)
}
