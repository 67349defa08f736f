mod emit;
mod error;
mod format;
mod import;

use chrono::Local;
use clap::builder::TypedValueParser;
use clap::Parser;
use colored::*;
use error::Error;
use log::{error, info, warn};
use log::{Level, LevelFilter, Metadata, Record};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::NamedTempFile;

/// https://docs.rs/log/latest/log/#implementing-a-logger
struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        // this is configured by calling log::set_max_level, and so this logging implementation logs all kinds of levels
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Info => format!("{}", record.level()).bold().blue(),
                Level::Warn => format!("{}", record.level()).bold().yellow(),
                Level::Error => format!("{}", record.level()).bold().red(),
                Level::Debug => format!("{}", record.level()).bold().green(),
                Level::Trace => format!("{}", record.level()).bold().cyan(),
            };
            // stderr, the generator shouldn't print anything else
            eprintln!(
                "({})[{}] {}",
                Local::now().to_rfc2822(),
                level,
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Generate a rust table of CPU records from a directory of CPUID dumps
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Source directory containing a mirror of InstLatx64
    #[arg(long = "src", default_value = "./source")]
    src: PathBuf,
    /// Output file
    #[arg(long = "out", default_value = "db.rs")]
    out: PathBuf,
    /// Level of logging verbosity
    #[arg(short = 'v',
        long = "verbosity",
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "OFF"])
            .map(|s| s.to_lowercase().parse::<LevelFilter>().unwrap_or(LevelFilter::Info))
        )]
    logging_level: LevelFilter,
}

static LOGGER: SimpleLogger = SimpleLogger;

fn main() -> ExitCode {
    let cli_args = Args::parse();
    // initialize logging
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(cli_args.logging_level);
    }

    match run(&cli_args.src, &cli_args.out) {
        Ok(count) => {
            info!("Wrote {} cpus to {}", count, cli_args.out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Locate and parse every dump in `src`, then write the generated table to `out`.
/// Returns the number of records written. Dumps that fail to parse are logged and left out.
fn run(src: &Path, out: &Path) -> Result<usize, Error> {
    info!("Reading CPUID dumps from {}", src.display());
    let files = import::cpuid_files(src)?;
    let import = import::import_files(&files);
    for failure in &import.failures {
        warn!(
            "failed to parse {}: {}",
            failure.path.display(),
            failure.error
        );
    }
    info!("Parsed {} of {} files", import.cpus.len(), files.len());

    let code = format::format_source(&emit::build(&import.cpus))?;
    write_output(out, code.as_bytes())?;
    Ok(import.cpus.len())
}

/// Write `contents` to a temporary file next to `path`, then move it into place,
/// so a failed run never leaves a half written table behind
fn write_output(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    // temporary files are created private, keep whatever the table had before
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    } else {
        set_default_permissions(file.as_file()).map_err(write_error)?;
    }
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_: &fs::File) -> std::io::Result<()> {
    Ok(())
}
