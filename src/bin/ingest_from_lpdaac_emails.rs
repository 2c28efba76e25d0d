use ava_ingest::app::pipelines::EmailPipeline;
use ava_ingest::app::runner;
use ava_ingest::config::context::{load_context, EmailContext};
use ava_ingest::core::IngestReport;
use ava_ingest::utils::validation::Validate;
use ava_ingest::{CommonArgs, IngestEngine, IngestError, Result};
use clap::Parser;
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "ingest_from_lpdaac_emails.log";

#[derive(Debug, Parser)]
#[command(name = "ingest_from_lpdaac_emails")]
#[command(about = "Submits an LPDAAC ingest job for every order found in fulfillment emails")]
struct Args {
    /// Directory containing LPDAAC emails (defaults to lpdaac_email_directory in the context)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

/// `--dir` wins; the context is only required when it is absent.
fn email_source(args: &Args) -> Result<(PathBuf, EmailContext)> {
    let context_path = args.common.context_path();
    let context: EmailContext = if args.dir.is_none() || context_path.exists() {
        load_context(&context_path)?
    } else {
        EmailContext::default()
    };

    let directory = match &args.dir {
        Some(dir) => dir.clone(),
        None => context
            .lpdaac_email_directory
            .clone()
            .map(PathBuf::from)
            .ok_or_else(|| IngestError::MissingConfigError {
                field: "lpdaac_email_directory".to_string(),
            })?,
    };
    Ok((directory, context))
}

#[cfg(feature = "s3")]
async fn sync_from_s3(context: &EmailContext, directory: &std::path::Path) -> Result<()> {
    use ava_ingest::config::s3::S3EmailFetcher;

    if let Some(bucket) = &context.s3_lpdaac_email_bucket {
        let fetcher =
            S3EmailFetcher::from_env(bucket.clone(), context.s3_lpdaac_email_prefix.clone()).await?;
        fetcher.fetch_all(directory).await?;
    }
    Ok(())
}

#[cfg(not(feature = "s3"))]
async fn sync_from_s3(context: &EmailContext, _directory: &std::path::Path) -> Result<()> {
    if let Some(bucket) = &context.s3_lpdaac_email_bucket {
        tracing::warn!(
            "⚠️ s3_lpdaac_email_bucket={} ignored, built without the s3 feature",
            bucket
        );
    }
    Ok(())
}

async fn run(args: &Args) -> Result<IngestReport> {
    let settings = args.common.settings()?;
    settings.validate()?;

    let (directory, context) = email_source(args)?;
    sync_from_s3(&context, &directory).await?;

    let pipeline = EmailPipeline::new(directory, &settings)?;
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
    tracing::info!("🚀 Starting ingest_from_lpdaac_emails");

    std::process::exit(runner::report_outcome(run(&args).await));
}
