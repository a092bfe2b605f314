use clap::Parser;
use s3_rds_glue_ingest::ingestion::{
    ConsoleSink, GlueRegistrar, IngestionOrchestrator, ObjectStoreSource, PostgresWriter, RunReport,
};
use s3_rds_glue_ingest::{IngestConfig, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "s3-rds-glue-ingest", version)]
#[command(about = "Load one CSV object from S3 into RDS, registering it in Glue if the load fails")]
#[command(long_about = "All settings come from the environment (S3_BUCKET, S3_KEY, AWS_REGION, \
RDS_HOST, RDS_PORT, RDS_USER, RDS_PASSWORD, RDS_DB_NAME, RDS_TABLE, GLUE_DATABASE, GLUE_TABLE, \
GLUE_S3_LOCATION). A .env file in the working directory is loaded first.")]
struct Args {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            if let Err(e) = dotenv::from_path(path) {
                eprintln!("Error: could not load {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(report) => {
            info!(run_id = %report.run_id, fallback = report.used_fallback(), "ingestion complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "ingestion failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<RunReport> {
    let config = IngestConfig::from_env()?;
    debug!(config = %serde_json::to_string(&config)?, "effective configuration");

    let source = ObjectStoreSource::s3(&config.source)?;
    let writer = PostgresWriter::new(config.database.clone());
    let registrar = GlueRegistrar::from_config(config.catalog.clone()).await;

    let orchestrator = IngestionOrchestrator::new(
        Arc::new(source),
        Arc::new(writer),
        Arc::new(registrar),
        Arc::new(ConsoleSink),
    );
    let report = orchestrator.run().await?;
    debug!(report = %serde_json::to_string(&report)?, "run report");
    Ok(report)
}
