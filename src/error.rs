use std::io;
use std::path::PathBuf;

/// Anything that stops a run. Dumps that fail to parse are not errors, see [crate::import::Import].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("unable to read source directory {}: {source}", path.display())]
    Locate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("generated code is not valid rust: {0}")]
    Format(#[from] syn::Error),
    #[error("unable to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
