use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use qanda::app::{App, RunOptions, RunSummary};
use qanda::assembler;
use qanda::domain::Database;
use qanda::error::QandaError;
use qanda::process::SystemInvoker;
use qanda::workspace::Workspace;

#[derive(Parser)]
#[command(name = "qanda")]
#[command(about = "Query NCBI, download sequencing reads, and assemble genomes")]
#[command(version, author)]
struct Cli {
    /// NCBI queries resolving to sequencing runs
    #[arg(required = true)]
    queries: Vec<String>,

    /// Assembler backend, named after a configuration file in the
    /// assembler directory
    #[arg(short, long)]
    assembler: String,

    /// NCBI database the queries are run against
    #[arg(short, long, default_value = "sra")]
    database: Database,

    /// Results directory receiving runinfo.csv, fastqs/, assemblies/ and
    /// biosamples/
    #[arg(short, long, default_value = ".")]
    outdir: Utf8PathBuf,

    /// Core count handed to the assembler templates
    #[arg(short, long, default_value_t = 1)]
    cores: u32,

    /// Override the assembler configuration directory
    #[arg(long)]
    config_dir: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<QandaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &QandaError) -> u8 {
    match error {
        QandaError::NoQueries
        | QandaError::InvalidDatabase(_)
        | QandaError::InvalidRunAccession(_)
        | QandaError::InvalidAssemblerName(_)
        | QandaError::UnknownAssembler { .. }
        | QandaError::ConfigRead(_)
        | QandaError::ConfigParse(_)
        | QandaError::UnsupportedStage { .. }
        | QandaError::UnknownPlaceholder { .. }
        | QandaError::MalformedTemplate { .. }
        | QandaError::EmptyCommand { .. }
        | QandaError::UnterminatedQuote { .. }
        | QandaError::ConfigDir => 2,
        QandaError::ExternalTool { .. } | QandaError::ToolSpawn { .. } => 3,
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

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => assembler::default_config_dir().into_diagnostic()?,
    };

    let workspace = Workspace::new(cli.outdir);
    let app = App::new(workspace, SystemInvoker);
    let options = RunOptions {
        queries: cli.queries,
        database: cli.database,
        assembler: cli.assembler,
        config_dir,
        cores: cli.cores,
    };

    let summary = app.run(&options).into_diagnostic()?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("run info: {}", summary.runinfo);
    println!("assembled {} run(s)", summary.assemblies.len());
    for outcome in &summary.assemblies {
        println!("  {} -> {}", outcome.accession, outcome.output_dir);
    }
}
