use ava_ingest::adapters::mozart::MozartClient;
use ava_ingest::app::runner;
use ava_ingest::domain::model::JobRequest;
use ava_ingest::utils::logger;
use ava_ingest::utils::validation::Validate;
use ava_ingest::{IngestError, Result, Settings};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// Submits a standard job to Mozart via its REST API.
#[derive(Debug, Parser)]
#[command(name = "submit_job")]
struct Args {
    /// Job name
    #[arg(short, long, default_value = "job-ingest_lpdaac_prods")]
    job_name: String,

    /// Input params as a JSON object
    #[arg(short, long, default_value = r#"{"s3_lpdaac_email_bucket": "ava-ses-emails"}"#)]
    params: String,

    /// Release version, eg "master" or "release-20180615"
    #[arg(short, long, default_value = "dev")]
    version: String,

    /// Job queue
    #[arg(short, long, default_value = "factotum-job_worker-small")]
    queue: String,

    /// Job priority
    #[arg(long, default_value_t = 5)]
    priority: u8,

    /// Job tags. Use a comma separated list for more than one
    #[arg(short = 'g', long, default_value = "automated-granule-ingest")]
    tags: String,

    /// Settings file (TOML)
    #[arg(short, long, env = ava_ingest::config::settings::CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn job(&self) -> Result<JobRequest> {
        let params: Value =
            serde_json::from_str(&self.params).map_err(|e| IngestError::InvalidConfigValueError {
                field: "params".to_string(),
                value: self.params.clone(),
                reason: e.to_string(),
            })?;

        Ok(JobRequest {
            job_name: self.job_name.clone(),
            job_version: self.version.clone(),
            queue: self.queue.clone(),
            priority: self.priority,
            tags: self
                .tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            params,
        })
    }
}

async fn run(args: &Args) -> Result<String> {
    let settings = Settings::load(args.config.as_deref())?;
    settings.validate()?;

    let job = args.job()?;
    let mozart = MozartClient::new(&settings.mozart, settings.grq.accept_invalid_certs)?;
    mozart.submit(&job).await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = logger::init_cli_logger(args.verbose, None) {
        std::process::exit(runner::report_failure(&e));
    }

    match run(&args).await {
        Ok(job_id) => {
            tracing::info!("✅ submitted {}:{} job_id: {}", args.job_name, args.version, job_id);
            println!("{}", job_id);
        }
        Err(e) => std::process::exit(runner::report_failure(&e)),
    }
}
