use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use rebatch::unix::{ExitCode, SignalHandler};
use rebatch::{
    AbortSignal, FileRecordReader, FlatFileRecordReader, FlatFileRecordWriter, JobBuilder,
    JobStatus, RecordReader, RecordWriter, StandardOutputRecordWriter,
};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Thin launcher around the engine: read a file (or a directory listing)
/// in fixed-size batches and write the records back out.
#[derive(Parser)]
#[command(name = "rebatch")]
#[command(about = "A record-batch processing engine with pluggable pipeline stages")]
#[command(version)]
struct Cli {
    /// Input file to process (or a directory with --directory)
    input: PathBuf,

    /// Number of records per batch
    record_size: usize,

    /// Read the input as a directory, one record per contained file
    #[arg(long = "directory")]
    directory: bool,

    /// Recurse into subdirectories (with --directory)
    #[arg(long = "recursive", requires = "directory")]
    recursive: bool,

    /// Record-level stage errors tolerated before the job fails
    #[arg(long = "error-threshold", default_value_t = 0)]
    error_threshold: usize,

    /// Write records to this file instead of stdout
    #[arg(short = 'o', long = "output-file")]
    output_file: Option<PathBuf>,

    /// Report output format
    #[arg(long = "report-format", value_enum, default_value = "text")]
    report_format: ReportFormat,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code.exit(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::GeneralError.exit()
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let abort = AbortSignal::new();
    let signals = SignalHandler::install(abort.clone())?;

    let reader: Box<dyn RecordReader> = if cli.directory {
        Box::new(FileRecordReader::new(&cli.input).recursive(cli.recursive))
    } else {
        Box::new(FlatFileRecordReader::new(&cli.input))
    };
    let writer: Box<dyn RecordWriter> = match &cli.output_file {
        Some(path) => Box::new(FlatFileRecordWriter::new(path)),
        None => Box::new(StandardOutputRecordWriter::new()),
    };

    let job = match JobBuilder::new(cli.input.display().to_string())
        .reader(reader)
        .writer(writer)
        .chunk_size(cli.record_size)
        .error_threshold(cli.error_threshold)
        .abort_signal(abort)
        .build()
    {
        Ok(job) => job,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::InvalidUsage);
        }
    };

    let report = job.execute();
    match cli.report_format {
        ReportFormat::Text => eprintln!("{}", report),
        ReportFormat::Json => eprintln!("{}", report.to_json()?),
    }

    Ok(match report.status() {
        JobStatus::Completed => ExitCode::Success,
        JobStatus::Aborted => signals.abort_exit_code(),
        _ => ExitCode::GeneralError,
    })
}
