use ava_ingest::app::pipelines::AvaIngestPipeline;
use ava_ingest::app::runner;
use ava_ingest::config::context::{load_context, AvaIngestContext};
use ava_ingest::core::IngestReport;
use ava_ingest::utils::validation::Validate;
use ava_ingest::{CommonArgs, IngestEngine, LocalStorage, Result};
use clap::Parser;

/// Ingests a single product from the on-prem AVA described by `_context.json`.
#[derive(Debug, Parser)]
#[command(name = "ava-ingest", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

async fn run(args: &Args) -> Result<IngestReport> {
    let settings = args.common.settings()?;
    settings.validate()?;

    let context: AvaIngestContext = load_context(&args.common.context_path())?;
    let storage = LocalStorage::new(args.common.work_dir.clone());
    let pipeline = AvaIngestPipeline::new(storage, context, &settings)?;

    let engine = IngestEngine::new_with_monitoring(pipeline, args.common.monitor);
    engine.run().await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // 初始化日誌
    if let Err(e) = args.common.init_logging(None) {
        std::process::exit(runner::report_failure(&e));
    }
    tracing::info!("Starting ava-ingest");
    if args.common.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }
    if args.common.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    std::process::exit(runner::report_outcome(run(&args).await));
}
