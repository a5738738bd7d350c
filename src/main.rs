use clap::{Parser, Subcommand};
use exn::ResultExt;
use futures::{StreamExt, stream};
use hoard::error::{ErrorKind, Result};
use hoard::{Ingestor, RequestId, identify};
use hoard_cache::Database;
use hoard_config::Config;
use hoard_storage::ContentStore;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Uploads ingested at once; SQLite serialises the writes anyway.
const CONCURRENCY: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "hoard", version, about = "Content-addressed upload ingestion")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store files whose type is allowed and record each upload.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print each file's content-addressed name and detected type.
    Identify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    let outcome = match cli.command {
        Command::Ingest { files } => ingest(&config, files).await,
        Command::Identify { files } => Ok(identify_all(&config, &files)),
    };
    match outcome {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            tracing::warn!(failed, "some files could not be processed");
            ExitCode::FAILURE
        },
        Err(err) => {
            tracing::error!(error = ?err, "hoard failed");
            ExitCode::FAILURE
        },
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).or_raise(|| ErrorKind::Stream)
}

/// Returns how many files could not be ingested.
async fn ingest(config: &Config, files: Vec<PathBuf>) -> Result<usize> {
    let store = ContentStore::new(&config.storage_dir).or_raise(|| ErrorKind::Storage)?;
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Database)?;
    let ingestor = Ingestor::new(store, db.clone(), config.allowed_types.iter().cloned());

    let results: Vec<(PathBuf, Result<()>)> = stream::iter(files)
        .map(|path| {
            let ingestor = &ingestor;
            async move {
                let result = ingest_one(ingestor, &path).await;
                (path, result)
            }
        })
        .buffer_unordered(CONCURRENCY)
        .collect()
        .await;

    let mut failed = 0usize;
    for (path, result) in results {
        if let Err(err) = result {
            failed += 1;
            if err.is_client_error() {
                println!("{}\trejected\t{}", path.display(), *err);
            } else {
                tracing::error!(path = %path.display(), error = ?err, "ingest failed");
            }
        }
    }
    db.close().await;
    Ok(failed)
}

async fn ingest_one(ingestor: &Ingestor, path: &Path) -> Result<()> {
    let name = path.file_name().and_then(|name| name.to_str());
    let (upload, _) = ingestor.ingest(RequestId::generate(), name, open(path)?).await?;
    println!(
        "{}\t{}\t{}\t{}",
        path.display(),
        upload.stored.name(),
        upload.mime,
        if upload.stored.created { "stored" } else { "duplicate" }
    );
    Ok(())
}

/// Returns how many files could not be identified.
fn identify_all(config: &Config, files: &[PathBuf]) -> usize {
    let mut failed = 0usize;
    for path in files {
        match open(path).and_then(|mut file| identify(&mut file, &config.allowed_types)) {
            Ok(found) => {
                let verdict = if found.classification.accepted { "allowed" } else { "not allowed" };
                println!("{}\t{}\t{}\t{}", path.display(), found.name, found.classification.detected, verdict);
            },
            Err(err) => {
                failed += 1;
                tracing::error!(path = %path.display(), error = ?err, "identify failed");
            },
        }
    }
    failed
}
