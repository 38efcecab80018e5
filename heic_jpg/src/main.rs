use anyhow::{Context, Result};
use clap::Parser;
use heic_jpg::config::is_confirmed;
use heic_jpg::errors::ResolveError;
use heic_jpg::{
    discover_sources, normalize_all, plan_jobs, BatchScheduler, CancelFlag, ConversionPipeline,
    ConvertConfig, ExifToolMetadata, JpegQuality, LibheifCodec, SourceFile,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::metadata::is_exiftool_available;
use shared_utils::print_summary_report;
use shared_utils::unified_progress::with_suspended_progress;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "heic-to-jpg")]
#[command(
    version,
    about = "Converts HEIF/HEIC files to JPEG while preserving EXIF metadata and ICC Profile.",
    long_about = None
)]
struct Cli {
    /// The directory containing HEIF/HEIC files to convert. Default is the current working directory.
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// The directory to save the converted JPEG files. Default is the current working directory.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Convert files in subdirectories recursively.
    #[arg(short, long)]
    recursive: bool,

    /// The quality of the converted JPEG files (1-100).
    #[arg(short, long, default_value_t = 95, allow_negative_numbers = true)]
    quality: i64,

    /// Suppress the confirmation prompt if no input directory is specified.
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Save log output to the specified file.
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Automatically delete original HEIF/HEIC files after conversion.
    #[arg(long)]
    delete: bool,

    /// Mirror input subdirectories in the output folder. Only works with -r/--recursive.
    #[arg(short, long)]
    preserve_structure: bool,

    /// Number of threads to process images concurrently.
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Show a progress bar for the conversion process.
    #[arg(long)]
    progress: bool,

    /// Normalize filenames by removing special characters before converting.
    ///
    /// Files are renamed only if normalization alters their name. If the normalized name
    /// already exists, a '_renamed_1', '_renamed_2', ... suffix is added.
    #[arg(short = 'c', long)]
    character_normalization: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_logging(
        LogConfig::new()
            .with_verbose(cli.verbose)
            .with_log_file(cli.log.as_ref()),
    )?;

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let input_dir = cli.dir.clone().unwrap_or_else(|| cwd.clone());
    let output_dir = cli.output.clone().unwrap_or_else(|| cwd.clone());

    let config = ConvertConfig {
        input_dir,
        output_dir,
        recursive: cli.recursive,
        quality: cli.quality,
        delete_original: cli.delete,
        preserve_structure: cli.preserve_structure,
        workers: cli.workers,
        show_progress: cli.progress,
        normalize_names: cli.character_normalization,
    };
    let config = match config.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Err(e) = config.check_metadata_writer(is_exiftool_available()) {
        error!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    if cli.dir.is_none() && !cli.yes && !confirm_current_directory(&config.input_dir)? {
        info!("Operation cancelled by the user.");
        return Ok(ExitCode::SUCCESS);
    }

    if config.quality.is_default() {
        info!(
            "No argument for quality specified, using default ({}%)",
            JpegQuality::DEFAULT
        );
    } else {
        info!("Using specified quality={}%", config.quality);
    }
    info!(
        "HEIC to JPG started with input directory: {}, output directory: {}, recursive={}, and workers={}",
        config.input_dir.display(),
        config.output_dir.display(),
        config.recursive,
        config.workers.get()
    );

    info!(
        "Starting conversion in directory: {} with recursive={}",
        config.input_dir.display(),
        config.recursive
    );
    let sources = match discover_sources(&config.input_dir, config.recursive) {
        Ok(sources) => sources,
        Err(e @ ResolveError::NotADirectory(_)) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    if sources.is_empty() {
        info!(
            "No HEIF/HEIC files found in directory: {}",
            config.input_dir.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let sources = if config.normalize_names {
        let paths: Vec<PathBuf> = sources.into_iter().map(SourceFile::into_path).collect();
        normalize_all(&paths).into_iter().map(SourceFile::new).collect()
    } else {
        sources
    };

    let jobs = plan_jobs(sources, &config.layout());

    if !is_exiftool_available() {
        warn!("exiftool not found in PATH; EXIF metadata will not be copied to the JPEG files");
    }

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        with_suspended_progress(|| {
            eprintln!("\nInterrupted: finishing files in progress, skipping the rest...")
        });
        handler_flag.cancel();
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let codec = LibheifCodec;
    let metadata = ExifToolMetadata;
    let pipeline = ConversionPipeline::new(&codec, &metadata, config.pipeline_options());
    let report = BatchScheduler::new(pipeline, config.workers)
        .with_progress(config.show_progress)
        .with_cancel_flag(cancel)
        .run(&jobs)?;

    info!("Conversion process complete.");
    print_summary_report(
        &report.result,
        report.duration,
        report.input_bytes,
        report.output_bytes,
        "HEIC → JPEG",
    );

    Ok(ExitCode::SUCCESS)
}

fn confirm_current_directory(dir: &Path) -> Result<bool> {
    print!(
        "No argument for input directory specified.\nContinue in the current directory ({})? [y/N]: ",
        dir.display()
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_confirmed(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["heic-to-jpg"]).unwrap();
        assert!(cli.dir.is_none());
        assert!(cli.output.is_none());
        assert_eq!(cli.quality, 95);
        assert_eq!(cli.workers, 4);
        assert!(!cli.recursive && !cli.yes && !cli.delete && !cli.progress);
        assert!(!cli.preserve_structure && !cli.character_normalization);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::try_parse_from([
            "heic-to-jpg", "-d", "in", "-o", "out", "-r", "-q", "80", "-y", "-v", "-l",
            "run.log", "-p", "-w", "8", "-c", "--delete", "--progress",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("in")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.recursive && cli.yes && cli.verbose && cli.delete && cli.progress);
        assert!(cli.preserve_structure && cli.character_normalization);
        assert_eq!(cli.quality, 80);
        assert_eq!(cli.workers, 8);
        assert_eq!(cli.log, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_out_of_range_quality_parses_then_fails_validation() {
        let cli = Cli::try_parse_from(["heic-to-jpg", "-q", "-3"]).unwrap();
        assert_eq!(cli.quality, -3);
        let config = ConvertConfig {
            quality: cli.quality,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
