use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sra_retriever::app::{RunOptions, Retriever};
use sra_retriever::config::{ConfigLoader, ResolvedConfig};
use sra_retriever::domain::{MaxSize, SplitMode};
use sra_retriever::error::RetrieverError;
use sra_retriever::history::{NoHistory, RetrievalHistory, SqliteHistory};
use sra_retriever::identifiers::{
    IdentifierRecord, IdentifierTable, SubmissionTags, partition_accessions,
};
use sra_retriever::output::{ConsoleProgress, JsonOutput, OutputMode, print_summary};
use sra_retriever::spreadsheet::{DEFAULT_ACCESSION_COLUMN, read_accession_column};
use sra_retriever::toolkit::{SystemToolkit, ToolStatus, ToolkitRunner};
use sra_retriever::workspace::Workspace;

#[derive(Parser)]
#[command(name = "sra-retriever")]
#[command(about = "Retrieve SRA runs with the SRA Toolkit and log every failure")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write the identifier log from a metadata spreadsheet")]
    Import(ImportArgs),
    #[command(about = "Download, validate and clean up every accession in the identifier log")]
    Run(RunArgs),
    #[command(about = "Import a spreadsheet and run the retrieval in one go")]
    Retrieve(RetrieveArgs),
    #[command(about = "Check accession formatting without downloading")]
    Check(CheckArgs),
    #[command(about = "Show detected SRA Toolkit binaries")]
    Tools,
}

#[derive(Args, Clone)]
struct ImportArgs {
    spreadsheet: PathBuf,
    project_id: String,
    user_id: String,

    #[arg(long)]
    sheet: Option<String>,

    #[arg(long, default_value = DEFAULT_ACCESSION_COLUMN)]
    column: String,
}

#[derive(Args, Clone)]
struct RunArgs {
    #[arg(long)]
    no_verify: bool,

    #[arg(long)]
    no_validate: bool,

    #[arg(long)]
    max_size: Option<MaxSize>,

    #[arg(long)]
    split: Option<SplitMode>,
}

#[derive(Args, Clone)]
struct RetrieveArgs {
    #[command(flatten)]
    import: ImportArgs,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(required = true)]
    accessions: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<RetrieverError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RetrieverError) -> u8 {
    match error {
        RetrieverError::MissingIdentifierLog(_)
        | RetrieverError::MissingColumn { .. }
        | RetrieverError::MissingSheet(_) => 2,
        RetrieverError::MissingTool(_)
        | RetrieverError::Toolkit { .. }
        | RetrieverError::History(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => run_import(&args, &config),
        Commands::Run(args) => run_retrieval(&args, config, output_mode),
        Commands::Retrieve(args) => {
            run_import(&args.import, &config)?;
            run_retrieval(&args.run, config, output_mode)
        }
        Commands::Check(args) => run_check(&args, output_mode),
        Commands::Tools => run_tools(&config, output_mode),
    }
}

fn run_import(args: &ImportArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let accessions =
        read_accession_column(&args.spreadsheet, args.sheet.as_deref(), &args.column)?;
    let records = accessions
        .into_iter()
        .map(|accession| IdentifierRecord {
            accession,
            tags: SubmissionTags::new(args.project_id.clone(), args.user_id.clone()),
        })
        .collect::<Vec<_>>();

    let log_path = config.identifier_log_path();
    IdentifierTable::write(log_path.as_std_path(), &records)?;
    info!(
        "{} SRA accession number(s) written to {log_path}",
        records.len()
    );
    Ok(())
}

fn run_retrieval(
    args: &RunArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let options = RunOptions {
        verify_input: config.verify_input && !args.no_verify,
        validate_data: config.validate_data && !args.no_validate,
        max_size: args
            .max_size
            .clone()
            .unwrap_or_else(|| config.max_prefetch_size.clone()),
        split: args.split.unwrap_or(config.split),
    };

    let toolkit = SystemToolkit::new(config.toolkit_dir.as_deref().map(|dir| dir.as_std_path()));
    if let ToolStatus::Missing { message } = toolkit.tool_status() {
        return Err(RetrieverError::MissingTool(message).into());
    }

    let history: Box<dyn RetrievalHistory> = match &config.history {
        Some(settings) => Box::new(SqliteHistory::open(
            settings.database.as_std_path(),
            settings.query.clone(),
        )?),
        None => Box::new(NoHistory),
    };

    let table = IdentifierTable::read(config.identifier_log_path().as_std_path())?;
    let retriever = Retriever::new(
        Workspace::from_config(&config),
        toolkit,
        history,
        &config.error_log,
    );

    match output_mode {
        OutputMode::NonInteractive => {
            let report = retriever.run(&table, &options, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let progress = ConsoleProgress::new();
            let report = retriever.run(&table, &options, &progress)?;
            progress.finish();
            print_summary(&report);
        }
    }
    Ok(())
}

fn run_check(args: &CheckArgs, output_mode: OutputMode) -> miette::Result<()> {
    let partition = partition_accessions(args.accessions.as_slice());
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_check(&partition).into_diagnostic(),
        OutputMode::Interactive => {
            for accession in &partition.accepted {
                println!("ok\t{accession}");
            }
            for rejected in &partition.rejected {
                println!("invalid\t{rejected}");
            }
            Ok(())
        }
    }
}

fn run_tools(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let toolkit = SystemToolkit::new(config.toolkit_dir.as_deref().map(|dir| dir.as_std_path()));
    let info = toolkit.tool_info();
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_tools(&info).into_diagnostic(),
        OutputMode::Interactive => {
            let rows = [
                ("vdb-dump", &info.vdb_dump),
                ("prefetch", &info.prefetch),
                ("fasterq-dump", &info.fasterq_dump),
                ("vdb-validate", &info.vdb_validate),
            ];
            for (name, version) in rows {
                let version = version
                    .as_deref()
                    .and_then(|text| text.lines().find(|line| !line.trim().is_empty()))
                    .unwrap_or("not found");
                println!("{name}\t{}", version.trim());
            }
            if let ToolStatus::Missing { message } = toolkit.tool_status() {
                println!("{message}");
            }
            Ok(())
        }
    }
}
