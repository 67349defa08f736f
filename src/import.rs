use crate::error::Error;
use glob::Pattern;
use log::debug;
use parsing::cpuid::{parse_cpu_file, Cpu, ParseError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every file in the InstLatx64 mirror with register dumps in it matches this
pub const CPUID_PATTERN: &str = "*CPUID*.txt";

/// A dump that could not be parsed
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: ParseError,
}

/// The outcome of parsing a batch of dumps
#[derive(Debug, Default)]
pub struct Import {
    /// Successfully parsed records, in the same order as the files they came from
    pub cpus: Vec<Cpu>,
    pub failures: Vec<Failure>,
}

/// List every CPUID dump in a directory
pub fn cpuid_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    find_files(dir, CPUID_PATTERN)
}

/// List the regular files in `dir` whose names match `pattern`, sorted by name.
/// Matching is case sensitive.
pub fn find_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let pattern = Pattern::new(pattern)?;
    let locate_error = |source: io::Error| Error::Locate {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(locate_error)? {
        let path = entry.map_err(locate_error)?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| pattern.matches(n));
        if matches && path.is_file() {
            debug!("found {}", path.display());
            files.push(path);
        }
    }
    // read_dir makes no promises about ordering, and the generated table should be stable
    files.sort();
    Ok(files)
}

/// Parse every file, keeping the ones that succeed. A bad file never stops the batch.
pub fn import_files(files: &[PathBuf]) -> Import {
    let mut import = Import {
        cpus: Vec::with_capacity(files.len()),
        failures: Vec::new(),
    };
    for path in files {
        match parse_cpu_file(path) {
            Ok(cpu) => import.cpus.push(cpu),
            Err(error) => import.failures.push(Failure {
                path: path.clone(),
                error,
            }),
        }
    }
    import
}
