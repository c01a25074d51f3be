use std::path::PathBuf;

use clap::Parser;
use lab_datasets::catalog;
use lab_datasets::kaggle::{DatasetSource, KaggleClient, KaggleCredentials};
use lab_datasets::pipeline::{self, PipelineOptions, SUMMARY_FILE};
use lab_datasets::profile::{ProfileOptions, DEFAULT_ROW_LIMIT, GRAPH_SAMPLE_ROWS};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "datasets",
    about = "Download fraud-detection datasets from Kaggle and score their fit for graph analysis"
)]
struct Cli {
    #[arg(long, env = "LAB_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// Rows read per file
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    row_limit: usize,
    /// Leading rows used to build the transaction graph
    #[arg(long, default_value_t = GRAPH_SAMPLE_ROWS)]
    graph_rows: usize,
    /// Restrict the run to these dataset slugs (repeatable)
    #[arg(long = "only")]
    only: Vec<String>,
    /// Path to a kaggle.json instead of the env/default lookup
    #[arg(long)]
    kaggle_config: Option<PathBuf>,
    /// Profile files already in the data directory without downloading
    #[arg(long)]
    skip_download: bool,
    #[arg(long)]
    no_progress: bool,
    /// Where to write the JSON summary; defaults to `<data-dir>/dataset_summary.json`
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let entries = catalog::select(&cli.only)?;

    let client = if cli.skip_download {
        None
    } else {
        let credentials = KaggleCredentials::resolve(
            |name| std::env::var(name).ok(),
            cli.kaggle_config.as_deref(),
        )?;
        Some(KaggleClient::new(credentials)?)
    };

    let options = PipelineOptions {
        data_dir: cli.data_dir.clone(),
        profile: ProfileOptions {
            row_limit: cli.row_limit,
            graph_sample_rows: cli.graph_rows,
        },
        show_progress: !cli.no_progress,
    };
    let summary = pipeline::run(
        &entries,
        client.as_ref().map(|client| client as &dyn DatasetSource),
        &options,
    )?;

    for report in summary.reports() {
        println!("\n{report}");
    }

    let summary_path = cli
        .summary
        .unwrap_or_else(|| cli.data_dir.join(SUMMARY_FILE));
    pipeline::write_summary(&summary, &summary_path)?;

    println!(
        "\nAll done! {} profiled, {} failed. Files are in {}; summary at {}.",
        summary.reports().count(),
        summary.failed_count(),
        cli.data_dir.display(),
        summary_path.display()
    );
    Ok(())
}
