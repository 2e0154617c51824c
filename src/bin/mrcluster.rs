use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use mrcluster::codec::{read_records, write_records, write_records_to, RecordCodec};
use mrcluster::{
    run_kmeans, run_mcl, ClusterId, ClusterStore, EngineOptions, KMeansOptions, LocalEngine,
    MatrixCodec, MatrixEntry, MclOptions, PointCodec, RunReport,
};

#[derive(Debug, Parser)]
#[command(name = "mrcluster")]
#[command(about = "K-means and Markov clustering as map/reduce stages", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct EngineArgs {
    /// Map partitions (defaults to the number of worker threads).
    #[arg(long)]
    partitions: Option<usize>,
    /// Skip map-side combiners.
    #[arg(long)]
    no_combine: bool,
}

impl EngineArgs {
    fn engine(&self) -> LocalEngine {
        let defaults = EngineOptions::default();
        LocalEngine::new(EngineOptions {
            partitions: self.partitions.unwrap_or(defaults.partitions),
            combine: !self.no_combine,
        })
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    Kmeans {
        /// Point records: `clusterId<TAB>coords...`.
        #[arg(long)]
        points: PathBuf,
        /// Seed centroids in the point-record format.
        #[arg(long)]
        centroids: PathBuf,
        #[arg(long, default_value_t = KMeansOptions::default().iterations)]
        iterations: usize,
        /// Final point assignments (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Final centroids of non-empty clusters.
        #[arg(long)]
        centroids_out: Option<PathBuf>,
        /// JSON run report.
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },
    Mcl {
        /// Matrix entries: `row<TAB>col<TAB>value`.
        #[arg(long)]
        matrix: PathBuf,
        #[arg(long, default_value_t = MclOptions::default().iterations)]
        iterations: usize,
        #[arg(long, default_value_t = MclOptions::default().matrix_size)]
        matrix_size: u32,
        #[arg(long, default_value_t = MclOptions::default().inflation_parameter)]
        inflation_parameter: u32,
        /// Final matrix (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// JSON run report.
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Kmeans {
            points,
            centroids,
            iterations,
            output,
            centroids_out,
            report,
            engine,
        } => kmeans(
            &points,
            &centroids,
            KMeansOptions { iterations },
            output.as_deref(),
            centroids_out.as_deref(),
            report.as_deref(),
            &engine.engine(),
        ),
        Command::Mcl {
            matrix,
            iterations,
            matrix_size,
            inflation_parameter,
            output,
            report,
            engine,
        } => mcl(
            &matrix,
            MclOptions {
                iterations,
                matrix_size,
                inflation_parameter,
            },
            output.as_deref(),
            report.as_deref(),
            &engine.engine(),
        ),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn kmeans(
    points_path: &Path,
    seed_path: &Path,
    options: KMeansOptions,
    output: Option<&Path>,
    centroids_out: Option<&Path>,
    report: Option<&Path>,
    engine: &LocalEngine,
) -> anyhow::Result<()> {
    options.validate().context("invalid kmeans options")?;
    let seed = read_records(seed_path, &PointCodec).context("load seed centroids")?;
    let store = ClusterStore::from_seed(&seed)
        .with_context(|| format!("build clusters from {}", seed_path.display()))?;
    let points = read_records(points_path, &PointCodec).context("load points")?;

    let outcome = run_kmeans(engine, store, points, &options)?;

    emit(output, &PointCodec, &outcome.points)?;
    if let Some(path) = centroids_out {
        let centroids: Vec<(ClusterId, Vec<f64>)> = outcome
            .store
            .iter()
            .filter_map(|cluster| cluster.centroid().map(|c| (cluster.id, c)))
            .collect();
        write_records(path, &PointCodec, &centroids)?;
    }
    write_report(report, &outcome.report)
}

fn mcl(
    matrix_path: &Path,
    options: MclOptions,
    output: Option<&Path>,
    report: Option<&Path>,
    engine: &LocalEngine,
) -> anyhow::Result<()> {
    options.validate().context("invalid mcl options")?;
    let entries: Vec<MatrixEntry> = read_records(matrix_path, &MatrixCodec)
        .context("load matrix")?
        .into_iter()
        .map(MatrixEntry::from)
        .collect();

    let outcome = run_mcl(engine, entries, &options)
        .with_context(|| format!("run mcl on {}", matrix_path.display()))?;

    let records: Vec<((u32, u32), f64)> = outcome.entries.into_iter().map(Into::into).collect();
    emit(output, &MatrixCodec, &records)?;
    write_report(report, &outcome.report)
}

fn emit<C: RecordCodec>(
    output: Option<&Path>,
    codec: &C,
    records: &[(C::Key, C::Value)],
) -> anyhow::Result<()> {
    match output {
        Some(path) => write_records(path, codec, records),
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_records_to(&mut out, codec, records).context("write stdout")?;
            out.flush().context("flush stdout")?;
            Ok(())
        }
    }
}

fn write_report(path: Option<&Path>, report: &RunReport) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    std::fs::write(path, report.to_json()?)
        .with_context(|| format!("write report {}", path.display()))
}
