mod common;

use ava_ingest::app::pipelines::lpdaac_pipeline::DOWNLOADS_DIR;
use ava_ingest::app::pipelines::LpdaacPipeline;
use ava_ingest::config::context::LpdaacContext;
use ava_ingest::{IngestEngine, LocalStorage};
use common::{settings_for, CopyRenderer, RecordingLocalizer};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

const NEW_GRANULE: &str = "AST_L1T_00305142019034105_20190515092342_12345.hdf.met";
const OLD_GRANULE: &str = "AST_L1T_00305152019034105_20190516092342_12346.hdf.met";
const PRODUCT_ID: &str = "AST_L1T-20190514T034105_20190514T034114-v1.0";

#[tokio::test]
async fn test_order_granules_are_localized_from_lpdaac() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();

    // 已入庫的 granule
    let ingested = server.mock(|when, then| {
        when.method(POST)
            .path("/grq_v1.0_ast_l1t/_search")
            .body_contains("00305152019034105");
        then.status(200).json_body(json!({"hits": {"total": 1, "hits": []}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/grq_v1.0_ast_l1t/_search");
        then.status(200).json_body(json!({"hits": {"total": 0, "hits": []}}));
    });
    let metadata = server.mock(|when, then| {
        when.method(POST)
            .path("/grq_v1.0_metadata-ast_l1t/_search")
            .body_contains("00305142019034105");
        then.status(200).json_body(json!({"hits": {"total": 1, "hits": [{
            "_id": format!("MET-{}", PRODUCT_ID),
            "_source": {
                "starttime": "2019-05-14T03:41:05Z",
                "endtime": "2019-05-14T03:41:14Z",
                "location": {"type": "Polygon", "coordinates": [[[1.0, 2.0], [2.0, 2.0], [1.0, 2.0]]]},
                "metadata": {
                    "short_name": "AST_L1T",
                    "links": [{"href": "https://lp.example/AST_L1T_003.png"}]
                }
            }
        }]}}));
    });

    let localizer = RecordingLocalizer {
        listing_files: vec![
            NEW_GRANULE.to_string(),
            OLD_GRANULE.to_string(),
            "AST_L1T_003.jpg.met".to_string(),
        ],
        ..RecordingLocalizer::default()
    };
    let fetched = localizer.fetched.clone();
    let context = LpdaacContext {
        lpdaac_download_url: "https://e4ftl01.example/PullDir/0600123456".to_string(),
    };
    let pipeline = LpdaacPipeline::new(LocalStorage::new(dir.path()), context, &settings_for(&server))?
        .with_tools(Box::new(localizer), Box::new(CopyRenderer));

    let report = IngestEngine::new(pipeline).run().await?;

    ingested.assert();
    metadata.assert();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.staged, 1);
    assert_eq!(report.loaded, 1);
    assert!(dir.path().join(DOWNLOADS_DIR).join(NEW_GRANULE).exists());

    let product_dir = dir.path().join(PRODUCT_ID);
    assert!(product_dir
        .join("AST_L1T_00305142019034105_20190515092342_12345.hdf")
        .exists());
    assert!(product_dir.join(format!("{}.browse.png", PRODUCT_ID)).exists());

    let fetched = fetched.lock().unwrap();
    assert_eq!(fetched[0], "https://e4ftl01.example/PullDir/0600123456/");
    assert_eq!(
        fetched[1],
        "https://e4ftl01.example/PullDir/0600123456/AST_L1T_00305142019034105_20190515092342_12345.hdf"
    );

    let met: serde_json::Value = serde_json::from_slice(&std::fs::read(
        product_dir.join(format!("{}.met.json", PRODUCT_ID)),
    )?)?;
    assert_eq!(met["short_name"], "AST_L1T");
    Ok(())
}

#[tokio::test]
async fn test_invalid_order_url_fails_before_download() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let localizer = RecordingLocalizer::default();
    let fetched = localizer.fetched.clone();
    let context = LpdaacContext {
        lpdaac_download_url: "not a url".to_string(),
    };
    let pipeline = LpdaacPipeline::new(LocalStorage::new(dir.path()), context, &settings_for(&server))
        .unwrap()
        .with_tools(Box::new(localizer), Box::new(CopyRenderer));

    assert!(IngestEngine::new(pipeline).run().await.is_err());
    assert!(fetched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_granule_with_ava_url_is_localized_from_ava() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/grq_v1.0_ast_l1t/_search");
        then.status(200).json_body(json!({"hits": {"total": 0, "hits": []}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/grq_v1.0_metadata-ast_l1t/_search");
        then.status(200).json_body(json!({"hits": {"total": 1, "hits": [{
            "_id": format!("MET-{}", PRODUCT_ID),
            "_source": {
                "starttime": "2019-05-14T03:41:05Z",
                "endtime": "2019-05-14T03:41:14Z",
                "metadata": {
                    "short_name": "AST_L1T",
                    "ava_url": "https://ava.example/AST_L1T/2019/granule.hdf"
                }
            }
        }]}}));
    });

    let localizer = RecordingLocalizer {
        listing_files: vec![NEW_GRANULE.to_string()],
        ..RecordingLocalizer::default()
    };
    let fetched = localizer.fetched.clone();
    let context = LpdaacContext {
        lpdaac_download_url: "https://e4ftl01.example/PullDir/0600123456".to_string(),
    };
    let pipeline = LpdaacPipeline::new(LocalStorage::new(dir.path()), context, &settings_for(&server))?
        .with_tools(Box::new(localizer), Box::new(CopyRenderer));

    let report = IngestEngine::new(pipeline).run().await?;

    assert_eq!(report.loaded, 1);
    let primary = dir.path().join(PRODUCT_ID).join(format!("{}.hdf", PRODUCT_ID));
    assert_eq!(
        std::fs::read_to_string(primary)?,
        "https://ava.example/AST_L1T/2019/granule.hdf"
    );
    let fetched = fetched.lock().unwrap();
    assert!(!fetched.iter().any(|url| url.ends_with("_12345.hdf")));
    Ok(())
}

#[tokio::test]
async fn test_malformed_metadata_id_does_not_abort_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/grq_v1.0_ast_l1t/_search");
        then.status(200).json_body(json!({"hits": {"total": 0, "hits": []}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/grq_v1.0_metadata-ast_l1t/_search");
        then.status(200).json_body(json!({"hits": {"total": 1, "hits": [{
            "_id": "garbage",
            "_source": {"metadata": {"short_name": "AST_L1T"}}
        }]}}));
    });

    let localizer = RecordingLocalizer {
        listing_files: vec![NEW_GRANULE.to_string()],
        ..RecordingLocalizer::default()
    };
    let context = LpdaacContext {
        lpdaac_download_url: "https://e4ftl01.example/PullDir/0600123456".to_string(),
    };
    let pipeline = LpdaacPipeline::new(LocalStorage::new(dir.path()), context, &settings_for(&server))?
        .with_tools(Box::new(localizer), Box::new(CopyRenderer));

    let report = IngestEngine::new(pipeline).run().await?;

    assert_eq!(report.discovered, 1);
    assert_eq!(report.staged, 0);
    assert_eq!(report.loaded, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_catalog_fails_the_order() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let mut settings = settings_for(&server);
    settings.grq.es_url = "http://127.0.0.1:1".to_string();

    let localizer = RecordingLocalizer {
        listing_files: vec![NEW_GRANULE.to_string()],
        ..RecordingLocalizer::default()
    };
    let context = LpdaacContext {
        lpdaac_download_url: "https://e4ftl01.example/PullDir/0600123456".to_string(),
    };
    let pipeline = LpdaacPipeline::new(LocalStorage::new(dir.path()), context, &settings)
        .unwrap()
        .with_tools(Box::new(localizer), Box::new(CopyRenderer));

    let result = IngestEngine::new(pipeline).run().await;

    assert!(matches!(result, Err(ava_ingest::IngestError::HttpError(_))));
    assert!(!dir.path().join(PRODUCT_ID).exists());
}
