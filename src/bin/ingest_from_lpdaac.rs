use ava_ingest::app::pipelines::LpdaacPipeline;
use ava_ingest::app::runner;
use ava_ingest::config::context::{load_context, LpdaacContext};
use ava_ingest::core::IngestReport;
use ava_ingest::utils::validation::Validate;
use ava_ingest::{CommonArgs, IngestEngine, LocalStorage, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "ingest_from_lpdaac")]
#[command(about = "Ingests the granules of an LPDAAC order whose metadata is already cataloged")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

async fn run(args: &Args) -> Result<IngestReport> {
    let settings = args.common.settings()?;
    settings.validate()?;

    let context: LpdaacContext = load_context(&args.common.context_path())?;
    let storage = LocalStorage::new(args.common.work_dir.clone());
    let pipeline = LpdaacPipeline::new(storage, context, &settings)?;

    IngestEngine::new_with_monitoring(pipeline, args.common.monitor)
        .run()
        .await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = args.common.init_logging(None) {
        std::process::exit(runner::report_failure(&e));
    }
    tracing::info!("🚀 Starting ingest_from_lpdaac");

    std::process::exit(runner::report_outcome(run(&args).await));
}
