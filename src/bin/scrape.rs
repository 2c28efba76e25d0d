use ava_ingest::app::pipelines::ScrapePipeline;
use ava_ingest::app::runner;
use ava_ingest::config::context::{load_context, ScrapeContext};
use ava_ingest::core::IngestReport;
use ava_ingest::utils::validation::Validate;
use ava_ingest::{CommonArgs, IngestEngine, LocalStorage, Result};
use clap::Parser;

const LOG_FILE_NAME: &str = "ava_ingest_met.log";

#[derive(Debug, Parser)]
#[command(name = "scrape")]
#[command(about = "Scrapes the AVA listings and publishes CMR metadata products for future ingest")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

async fn run(args: &Args) -> Result<IngestReport> {
    let settings = args.common.settings()?;
    settings.validate()?;

    let context: ScrapeContext = load_context(&args.common.context_path())?;
    context.validate()?;
    tracing::info!(
        "📋 short_name={} years {}..={}",
        context.short_name,
        context.start_year,
        context.end_year
    );

    let storage = LocalStorage::new(args.common.work_dir.clone());
    let pipeline = ScrapePipeline::new(storage, context, &settings)?;
    IngestEngine::new_with_monitoring(pipeline, args.common.monitor)
        .run()
        .await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = args.common.init_logging(Some(LOG_FILE_NAME)) {
        std::process::exit(runner::report_failure(&e));
    }
    tracing::info!("🚀 Starting AVA metadata scrape");

    std::process::exit(runner::report_outcome(run(&args).await));
}
