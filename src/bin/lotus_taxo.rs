use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lotus_taxonomy::dataset::{Dataset, HttpDownloader};
use lotus_taxonomy::error::TaxonomyError;
use lotus_taxonomy::manifest::{EmbeddedRegistry, FsRegistry, VersionRegistry};
use lotus_taxonomy::settings::DatasetSettings;

#[derive(Parser)]
#[command(name = "lotus-taxo")]
#[command(about = "Build a version of the LOTUS reference taxonomy dataset")]
#[command(version, author)]
struct Cli {
    /// Version to build, or `all` for every available version.
    version: String,

    /// Capability keys to include (default: every key the manifest declares).
    #[arg(long = "include")]
    include: Vec<String>,

    /// Directory of version manifest documents; bundled releases are used
    /// when omitted.
    #[arg(long)]
    versions_dir: Option<String>,

    #[arg(long, default_value = "downloads")]
    downloads_dir: String,

    #[arg(long, default_value_t = 1)]
    process_number: usize,

    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<TaxonomyError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TaxonomyError) -> u8 {
    match error {
        TaxonomyError::VersionNotFound { .. }
        | TaxonomyError::UnknownCapability { .. }
        | TaxonomyError::InvalidManifest { .. } => 2,
        TaxonomyError::RemoteQueryFailed(_)
        | TaxonomyError::QueryStatus { .. }
        | TaxonomyError::DownloadFailed(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry: Box<dyn VersionRegistry> = match &cli.versions_dir {
        Some(dir) => Box::new(FsRegistry::new(dir.as_str())),
        None => Box::new(EmbeddedRegistry),
    };

    let versions = if cli.version == "all" {
        registry.available_versions()
    } else {
        vec![cli.version.clone()]
    };

    for version in versions {
        let mut settings = DatasetSettings::new(registry.as_ref(), &version)
            .into_diagnostic()?
            .set_downloads_directory(cli.downloads_dir.as_str());
        if cli.verbose {
            settings = settings.set_verbose();
        }
        settings = if cli.include.is_empty() {
            settings.include_all()
        } else {
            let mut current = settings;
            for key in &cli.include {
                current = current.include(key).into_diagnostic()?;
            }
            current
        };

        let downloader =
            HttpDownloader::new(cli.process_number, settings.verbose()).into_diagnostic()?;
        let dataset = Dataset::build(&settings, &downloader).into_diagnostic()?;
        let summary = serde_json::to_string_pretty(dataset.metadata()).into_diagnostic()?;
        println!("{summary}");
    }

    Ok(())
}
